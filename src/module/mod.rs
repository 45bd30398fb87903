//! 模块生命周期子系统
//!
//! 内核的主体功能：模块描述符、版本门禁、依赖图、注册表、
//! 健康监控、生命周期事件日志和热重载协调。

pub mod dependency;
pub mod descriptor;
pub mod events;
pub mod health;
pub mod hot_reload;
pub mod registry;
pub mod source;
pub mod version;

pub use dependency::DependencyGraph;
pub use descriptor::{
    DependencySpec, HealthCheckConfig, ModuleDescriptor, ModuleHooks, ModuleState,
};
pub use events::{EventKind, EventQuery, LifecycleEvent, LifecycleEventLog};
pub use health::{HealthDetails, HealthMetric, HealthMonitor, HealthState};
pub use hot_reload::HotReloadCoordinator;
pub use registry::{
    DescriptorLoader, ModuleEntry, ModuleRegistry, RegistryOptions, SystemHealthSummary,
};
pub use source::{FileModuleSource, ModuleSource, StaticModuleSource};
pub use version::{check_compatibility, CompatReport, VersionGate};
