//! 教练平台模块内核错误类型定义
//!
//! 本模块定义模块生命周期编排中使用的所有错误类型。
//! 错误分类对应注册准入的各个关卡：描述符校验、依赖校验、
//! 循环依赖、内核版本兼容性、钩子执行与健康探针。

use thiserror::Error;

/// 模块内核核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 描述符校验错误 ====================

    /// 模块描述符无效（缺少必填字段、键格式错误等）
    #[error("模块描述符无效: {0}")]
    InvalidDescriptor(String),

    // ==================== 注册表错误 ====================

    /// 模块已注册（重复注册只能通过 reload 协议完成）
    #[error("模块已注册: '{0}'")]
    ModuleAlreadyRegistered(String),

    /// 模块未找到
    #[error("模块未找到: '{0}'")]
    ModuleNotFound(String),

    // ==================== 依赖错误 ====================

    /// 必需依赖未注册
    #[error("模块 '{module}' 的必需依赖 '{dependency}' 未注册")]
    DependencyNotFound {
        module: String,
        dependency: String,
    },

    /// 依赖版本不满足要求
    #[error("模块 '{module}' 要求依赖 '{dependency}' 版本 {required}, 实际为 {found}")]
    DependencyVersionMismatch {
        module: String,
        dependency: String,
        required: String,
        found: String,
    },

    /// 检测到循环依赖
    #[error("检测到循环依赖: {0}")]
    CircularDependency(String),

    // ==================== 兼容性错误 ====================

    /// 模块声明的内核兼容范围不满足当前内核版本
    #[error("模块 '{module}' 与内核版本 {core_version} 不兼容 (要求: {required})")]
    Incompatible {
        module: String,
        core_version: String,
        required: String,
    },

    // ==================== 钩子与探针错误 ====================

    /// 模块钩子执行失败
    #[error("模块 '{module}' 的 {hook} 钩子执行失败: {reason}")]
    HookFailed {
        module: String,
        hook: String,
        reason: String,
    },

    /// 健康探针执行失败
    #[error("模块 '{module}' 健康探针失败: {reason}")]
    ProbeFailed {
        module: String,
        reason: String,
    },

    // ==================== 热重载错误 ====================

    /// 热重载不可用（全局关闭或模块未开启）
    #[error("模块 '{0}' 热重载不可用")]
    HotReloadDisabled(String),

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// 版本解析错误
    #[error("版本解析错误: {0}")]
    VersionParse(#[from] semver::Error),

    // ==================== 通用错误 ====================

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 内核操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 状态码常量
///
/// 供外围 CRUD/API 层将内核错误翻译为 HTTP 风格响应。
pub mod status_code {
    /// 成功
    pub const OK: u16 = 200;

    /// 请求格式错误
    pub const BAD_REQUEST: u16 = 400;

    /// 未找到
    pub const NOT_FOUND: u16 = 404;

    /// 冲突
    pub const CONFLICT: u16 = 409;

    /// 先决条件失败
    pub const PRECONDITION_FAILED: u16 = 412;

    /// 语义无效
    pub const UNPROCESSABLE: u16 = 422;

    /// 内部错误
    pub const INTERNAL_ERROR: u16 = 500;
}

/// 错误码常量
pub mod error_code {
    // 模块错误 (MODULE-xxx)
    pub const MODULE_NOT_FOUND: &str = "MODULE-001";
    pub const MODULE_ALREADY_REGISTERED: &str = "MODULE-002";
    pub const MODULE_INVALID_DESCRIPTOR: &str = "MODULE-003";
    pub const MODULE_CIRCULAR_DEPENDENCY: &str = "MODULE-004";
    pub const MODULE_DEPENDENCY_MISSING: &str = "MODULE-005";
    pub const MODULE_DEPENDENCY_VERSION: &str = "MODULE-006";
    pub const MODULE_INCOMPATIBLE: &str = "MODULE-007";
    pub const MODULE_HOOK_FAILED: &str = "MODULE-008";
    pub const MODULE_PROBE_FAILED: &str = "MODULE-009";
    pub const MODULE_HOT_RELOAD_DISABLED: &str = "MODULE-010";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidDescriptor(_) => error_code::MODULE_INVALID_DESCRIPTOR,
            CoreError::ModuleAlreadyRegistered(_) => error_code::MODULE_ALREADY_REGISTERED,
            CoreError::ModuleNotFound(_) => error_code::MODULE_NOT_FOUND,
            CoreError::DependencyNotFound { .. } => error_code::MODULE_DEPENDENCY_MISSING,
            CoreError::DependencyVersionMismatch { .. } => error_code::MODULE_DEPENDENCY_VERSION,
            CoreError::CircularDependency(_) => error_code::MODULE_CIRCULAR_DEPENDENCY,
            CoreError::Incompatible { .. } => error_code::MODULE_INCOMPATIBLE,
            CoreError::HookFailed { .. } => error_code::MODULE_HOOK_FAILED,
            CoreError::ProbeFailed { .. } => error_code::MODULE_PROBE_FAILED,
            CoreError::HotReloadDisabled(_) => error_code::MODULE_HOT_RELOAD_DISABLED,
            CoreError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            _ => "UNKNOWN",
        }
    }

    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::ModuleNotFound(_) => status_code::NOT_FOUND,
            CoreError::DependencyNotFound { .. } => status_code::NOT_FOUND,
            CoreError::ModuleAlreadyRegistered(_) => status_code::CONFLICT,
            CoreError::InvalidDescriptor(_) => status_code::BAD_REQUEST,
            CoreError::CircularDependency(_) => status_code::UNPROCESSABLE,
            CoreError::DependencyVersionMismatch { .. } => status_code::UNPROCESSABLE,
            CoreError::Incompatible { .. } => status_code::PRECONDITION_FAILED,
            CoreError::HotReloadDisabled(_) => status_code::PRECONDITION_FAILED,
            _ => status_code::INTERNAL_ERROR,
        }
    }
}
