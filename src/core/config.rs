//! 内核配置管理
//!
//! 支持从 YAML / JSON 文件加载配置，并提供默认值和配置合并能力。

use crate::utils::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// 默认值函数
// ============================================================================

fn default_core_version() -> String {
    crate::CORE_VERSION.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_health_interval_secs() -> u64 {
    30
}

fn default_health_timeout_ms() -> u64 {
    5_000
}

fn default_event_log_capacity() -> usize {
    1_000
}

// ============================================================================
// 配置结构
// ============================================================================

/// 内核配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// 内核版本号（模块兼容性检查的基准）
    #[serde(default = "default_core_version")]
    pub core_version: String,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// 模块管理配置
    #[serde(default)]
    pub modules: ModuleConfig,

    /// 开发模式（输出更详细的日志）
    #[serde(default)]
    pub dev_mode: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否使用 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 轮转策略（never / hourly / daily）
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

/// 模块管理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// 模块描述文件扫描目录
    #[serde(default)]
    pub module_dirs: Vec<PathBuf>,

    /// 是否启用热重载
    #[serde(default = "default_true")]
    pub hot_reload: bool,

    /// 热重载防抖窗口（毫秒）
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// 是否启用健康监控
    #[serde(default = "default_true")]
    pub health_enabled: bool,

    /// 健康检查默认间隔（秒）
    #[serde(default = "default_health_interval_secs")]
    pub health_check_interval_secs: u64,

    /// 健康检查超时（毫秒）
    #[serde(default = "default_health_timeout_ms")]
    pub health_check_timeout_ms: u64,

    /// 生命周期事件日志容量
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// 启动时是否自动注册扫描到的模块
    #[serde(default = "default_true")]
    pub auto_register: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            core_version: default_core_version(),
            logging: LogConfig::default(),
            modules: ModuleConfig::default(),
            dev_mode: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_output: false,
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            module_dirs: Vec::new(),
            hot_reload: true,
            debounce_ms: default_debounce_ms(),
            health_enabled: true,
            health_check_interval_secs: default_health_interval_secs(),
            health_check_timeout_ms: default_health_timeout_ms(),
            event_log_capacity: default_event_log_capacity(),
            auto_register: true,
        }
    }
}

impl CoreConfig {
    /// 从文件加载配置
    ///
    /// 根据扩展名自动选择解析器（.yaml/.yml 或 .json）
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigLoadFailed(format!("读取配置文件 {} 失败: {}", path.display(), e))
        })?;

        let config: CoreConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(CoreError::ConfigLoadFailed(format!(
                    "不支持的配置文件格式: {}",
                    path.display()
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// 创建配置构建器
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        semver::Version::parse(&self.core_version).map_err(|e| {
            CoreError::ConfigLoadFailed(format!(
                "core_version '{}' 不是合法的语义化版本: {}",
                self.core_version, e
            ))
        })?;

        if self.modules.event_log_capacity == 0 {
            return Err(CoreError::ConfigLoadFailed(
                "event_log_capacity 必须大于 0".to_string(),
            ));
        }

        if self.modules.health_check_interval_secs == 0 {
            return Err(CoreError::ConfigLoadFailed(
                "health_check_interval_secs 必须大于 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 合并另一份配置（other 的非默认字段覆盖当前值）
    pub fn merge(mut self, other: CoreConfig) -> Self {
        if other.core_version != default_core_version() {
            self.core_version = other.core_version;
        }
        if other.dev_mode {
            self.dev_mode = true;
        }
        self.logging = other.logging;
        self.modules = other.modules;
        self
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
        }
    }

    /// 设置内核版本
    pub fn core_version(mut self, version: impl Into<String>) -> Self {
        self.config.core_version = version.into();
        self
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 添加模块扫描目录
    pub fn module_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.modules.module_dirs.push(dir.into());
        self
    }

    /// 设置热重载开关
    pub fn hot_reload(mut self, enable: bool) -> Self {
        self.config.modules.hot_reload = enable;
        self
    }

    /// 设置防抖窗口（毫秒）
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.modules.debounce_ms = ms;
        self
    }

    /// 设置健康检查间隔（秒）
    pub fn health_check_interval_secs(mut self, secs: u64) -> Self {
        self.config.modules.health_check_interval_secs = secs;
        self
    }

    /// 设置事件日志容量
    pub fn event_log_capacity(mut self, capacity: usize) -> Self {
        self.config.modules.event_log_capacity = capacity;
        self
    }

    /// 设置开发模式
    pub fn dev_mode(mut self, enable: bool) -> Self {
        self.config.dev_mode = enable;
        self
    }

    /// 构建配置
    pub fn build(self) -> Result<CoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
