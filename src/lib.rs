//! # 教练平台模块内核
//!
//! 教练平台的模块生命周期与依赖编排内核，提供：
//!
//! - **模块注册表**: 注册、卸载、重载、启停的完整生命周期管理
//! - **依赖图**: 环检测与确定性的拓扑加载顺序
//! - **版本门禁**: 模块与内核版本的 semver 兼容性检查
//! - **健康监控**: 按模块独立调度的可取消定时探测
//! - **事件日志**: 固定容量环形缓冲的生命周期审计记录
//! - **热重载**: 按模块键防抖合并的变更通知协调
//!
//! ## 快速开始
//!
//! ```rust
//! use coach_core::module::{ModuleDescriptor, ModuleRegistry, RegistryOptions};
//! use semver::Version;
//!
//! #[tokio::main]
//! async fn main() -> coach_core::Result<()> {
//!     let registry = ModuleRegistry::new(RegistryOptions::default());
//!
//!     let descriptor = ModuleDescriptor::new("goals", "目标管理", Version::new(1, 0, 0))
//!         .with_compatible_range("^1.0.0");
//!     registry.register(descriptor).await?;
//!
//!     assert_eq!(registry.load_order().await, vec!["goals"]);
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod module;
pub mod utils;

pub use crate::core::config::CoreConfig;
pub use crate::module::{
    HotReloadCoordinator, LifecycleEventLog, ModuleDescriptor, ModuleRegistry, RegistryOptions,
};
pub use crate::utils::{CoreError, Result};

/// 内核版本号
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 内核名称
pub const CORE_NAME: &str = env!("CARGO_PKG_NAME");
