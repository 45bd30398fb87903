//! 模块描述符定义
//!
//! 描述符是模块向内核声明自身的载体：标识、版本、依赖、
//! 健康检查配置以及生命周期钩子。

use crate::utils::{CoreError, Result};
use futures::future::BoxFuture;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// 钩子类型
// ============================================================================

/// 生命周期钩子（返回 Result 的异步回调）
pub type LifecycleHook = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// 错误回调（接收错误消息，不返回值）
pub type ErrorHook = Arc<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

/// 健康探针（返回 Ok(true)=健康, Ok(false)=警告, Err=故障）
pub type HealthProbe = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

/// 模块生命周期钩子集合
///
/// 所有钩子均为可选。钩子以异步闭包形式注册：
///
/// ```rust
/// use coach_core::module::descriptor::ModuleHooks;
///
/// let hooks = ModuleHooks::new()
///     .on_before_load(|| async { Ok(()) })
///     .on_health_check(|| async { Ok(true) });
/// ```
#[derive(Clone, Default)]
pub struct ModuleHooks {
    /// 加载前钩子（失败则中止注册）
    pub before_load: Option<LifecycleHook>,
    /// 加载后钩子
    pub after_load: Option<LifecycleHook>,
    /// 卸载前钩子
    pub before_unload: Option<LifecycleHook>,
    /// 卸载后钩子
    pub after_unload: Option<LifecycleHook>,
    /// 错误回调（钩子失败或健康探针故障时触发）
    pub on_error: Option<ErrorHook>,
    /// 健康探针
    pub on_health_check: Option<HealthProbe>,
}

impl ModuleHooks {
    /// 创建空钩子集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置加载前钩子
    pub fn on_before_load<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.before_load = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// 设置加载后钩子
    pub fn on_after_load<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after_load = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// 设置卸载前钩子
    pub fn on_before_unload<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.before_unload = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// 设置卸载后钩子
    pub fn on_after_unload<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after_unload = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// 设置错误回调
    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |msg| Box::pin(f(msg))));
        self
    }

    /// 设置健康探针
    pub fn on_health_check<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.on_health_check = Some(Arc::new(move || Box::pin(f())));
        self
    }
}

impl std::fmt::Debug for ModuleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHooks")
            .field("before_load", &self.before_load.is_some())
            .field("after_load", &self.after_load.is_some())
            .field("before_unload", &self.before_unload.is_some())
            .field("after_unload", &self.after_unload.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_health_check", &self.on_health_check.is_some())
            .finish()
    }
}

// ============================================================================
// 依赖声明
// ============================================================================

/// 模块依赖声明
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencySpec {
    /// 被依赖模块的键
    pub module_key: String,

    /// 版本要求（semver 范围表达式，None 表示任意版本）
    #[serde(default)]
    pub version_req: Option<VersionReq>,

    /// 是否为必需依赖（可选依赖缺失时仅告警）
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl DependencySpec {
    /// 创建必需依赖
    pub fn required(module_key: impl Into<String>) -> Self {
        Self {
            module_key: module_key.into(),
            version_req: None,
            required: true,
        }
    }

    /// 创建可选依赖
    pub fn optional(module_key: impl Into<String>) -> Self {
        Self {
            module_key: module_key.into(),
            version_req: None,
            required: false,
        }
    }

    /// 设置版本要求
    pub fn with_version_req(mut self, req: VersionReq) -> Self {
        self.version_req = Some(req);
        self
    }
}

// ============================================================================
// 健康检查配置
// ============================================================================

/// 模块健康检查配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckConfig {
    /// 是否启用定时探测
    #[serde(default = "default_required")]
    pub enabled: bool,

    /// 探测间隔（秒，None 使用内核默认值）
    #[serde(default)]
    pub interval_secs: Option<u64>,

    /// 探测超时（毫秒，None 使用内核默认值）
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: None,
            timeout_ms: None,
        }
    }
}

// ============================================================================
// 模块状态
// ============================================================================

/// 模块生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    /// 加载中（注册流程执行期间）
    Loading,
    /// 活跃（已完成注册，正常提供能力）
    Active,
    /// 已禁用（保留注册信息但不参与健康监控调度以外的行为）
    Disabled,
    /// 故障（加载钩子失败或依赖回滚后保留的终态）
    Failed,
    /// 卸载中
    Unloading,
}

impl ModuleState {
    /// 是否可以被禁用
    pub fn can_disable(&self) -> bool {
        matches!(self, ModuleState::Active)
    }

    /// 是否可以被启用
    pub fn can_enable(&self) -> bool {
        matches!(self, ModuleState::Disabled)
    }

    /// 是否可以被卸载
    pub fn can_unload(&self) -> bool {
        matches!(
            self,
            ModuleState::Active | ModuleState::Disabled | ModuleState::Failed
        )
    }

    /// 是否处于活跃状态
    pub fn is_active(&self) -> bool {
        matches!(self, ModuleState::Active)
    }
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleState::Loading => write!(f, "loading"),
            ModuleState::Active => write!(f, "active"),
            ModuleState::Disabled => write!(f, "disabled"),
            ModuleState::Failed => write!(f, "failed"),
            ModuleState::Unloading => write!(f, "unloading"),
        }
    }
}

// ============================================================================
// 模块描述符
// ============================================================================

/// 模块描述符
///
/// 模块注册时向内核提交的完整声明。钩子不参与序列化，
/// 从文件加载的描述符钩子集合为空。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// 模块唯一键（小写字母、数字、连字符、下划线）
    pub key: String,

    /// 模块显示名称
    pub name: String,

    /// 模块版本（未声明时为 None，注册时产生非致命告警）
    #[serde(default)]
    pub version: Option<Version>,

    /// 兼容的内核版本范围（semver 范围表达式，None 表示不限制）
    #[serde(default)]
    pub compatible_range: Option<String>,

    /// 依赖声明
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,

    /// 模块提供的挂件标识（None 表示不提供挂件）
    #[serde(default)]
    pub provides_widget: Option<String>,

    /// 健康检查配置
    #[serde(default)]
    pub health_check: HealthCheckConfig,

    /// 是否允许热重载（内核全局开关可进一步限制）
    #[serde(default = "default_required")]
    pub hot_reload: bool,

    /// 生命周期钩子（不序列化）
    #[serde(skip)]
    pub hooks: ModuleHooks,
}

impl ModuleDescriptor {
    /// 创建新的模块描述符
    pub fn new(key: impl Into<String>, name: impl Into<String>, version: Version) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            version: Some(version),
            compatible_range: None,
            dependencies: Vec::new(),
            provides_widget: None,
            health_check: HealthCheckConfig::default(),
            hot_reload: true,
            hooks: ModuleHooks::new(),
        }
    }

    /// 设置兼容范围
    pub fn with_compatible_range(mut self, range: impl Into<String>) -> Self {
        self.compatible_range = Some(range.into());
        self
    }

    /// 添加依赖
    pub fn with_dependency(mut self, dep: DependencySpec) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// 声明提供的挂件
    pub fn with_widget(mut self, widget: impl Into<String>) -> Self {
        self.provides_widget = Some(widget.into());
        self
    }

    /// 设置健康检查配置
    pub fn with_health_check(mut self, config: HealthCheckConfig) -> Self {
        self.health_check = config;
        self
    }

    /// 设置热重载开关
    pub fn with_hot_reload(mut self, enable: bool) -> Self {
        self.hot_reload = enable;
        self
    }

    /// 设置生命周期钩子
    pub fn with_hooks(mut self, hooks: ModuleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// 校验描述符的结构合法性
    ///
    /// 检查：键格式、名称非空、无自依赖、无重复依赖声明。
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(CoreError::InvalidDescriptor("模块键不能为空".to_string()));
        }

        if !self
            .key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidDescriptor(format!(
                "模块键 '{}' 含有非法字符（仅允许小写字母、数字、'-'、'_'）",
                self.key
            )));
        }

        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidDescriptor(format!(
                "模块 '{}' 的名称不能为空",
                self.key
            )));
        }

        let mut seen = HashSet::new();
        for dep in &self.dependencies {
            if dep.module_key == self.key {
                return Err(CoreError::InvalidDescriptor(format!(
                    "模块 '{}' 不能依赖自身",
                    self.key
                )));
            }
            if !seen.insert(dep.module_key.as_str()) {
                return Err(CoreError::InvalidDescriptor(format!(
                    "模块 '{}' 重复声明了对 '{}' 的依赖",
                    self.key, dep.module_key
                )));
            }
        }

        Ok(())
    }
}
