//! 工具模块
//!
//! 提供内核各处共用的基础工具：
//!
//! - `error`: 统一错误类型与错误码
//! - `id`: 事件 ID 生成
//! - `logger`: 基于 tracing 的结构化日志系统

pub mod error;
pub mod id;
pub mod logger;

pub use error::{CoreError, Result};
pub use id::{generate_id, is_valid_id};
pub use logger::{LogGuard, Logger, LoggerConfig, RotationStrategy};
