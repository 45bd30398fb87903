//! 内核核心模块
//!
//! 提供内核配置管理。

pub mod config;

pub use config::{CoreConfig, CoreConfigBuilder, LogConfig, ModuleConfig};
