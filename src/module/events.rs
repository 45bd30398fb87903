//! 生命周期事件日志
//!
//! 以固定容量的环形缓冲记录模块生命周期事件，
//! 容量到达上限时淘汰最旧的事件。事件不可修改，仅支持追加和查询。

use crate::utils::id::generate_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 生命周期事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 模块加载（注册）
    Load,
    /// 模块卸载
    Unload,
    /// 模块重载
    Reload,
    /// 模块错误（钩子失败等）
    Error,
    /// 健康检查执行
    HealthCheck,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Load => "load",
            EventKind::Unload => "unload",
            EventKind::Reload => "reload",
            EventKind::Error => "error",
            EventKind::HealthCheck => "health_check",
        };
        write!(f, "{}", s)
    }
}

/// 生命周期事件（不可变记录）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// 事件 ID
    pub id: String,

    /// 事件类型
    pub kind: EventKind,

    /// 相关模块键
    pub module_key: String,

    /// 事件时间戳
    pub timestamp: DateTime<Utc>,

    /// 操作是否成功
    pub success: bool,

    /// 操作耗时（毫秒）
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// 附加数据
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl LifecycleEvent {
    /// 创建新事件（默认成功）
    pub fn new(kind: EventKind, module_key: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            kind,
            module_key: module_key.into(),
            timestamp: Utc::now(),
            success: true,
            duration_ms: None,
            payload: serde_json::Value::Null,
        }
    }

    /// 标记为失败
    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    /// 设置耗时
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// 附加数据
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// 事件查询条件
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// 按模块键过滤
    pub module_key: Option<String>,
    /// 按事件类型过滤
    pub kind: Option<EventKind>,
    /// 返回条数上限（None 表示不限制）
    pub limit: Option<usize>,
}

impl EventQuery {
    /// 创建空查询（返回全部事件）
    pub fn all() -> Self {
        Self::default()
    }

    /// 按模块键过滤
    pub fn module(mut self, key: impl Into<String>) -> Self {
        self.module_key = Some(key.into());
        self
    }

    /// 按事件类型过滤
    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// 限制返回条数
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// 生命周期事件日志（环形缓冲）
#[derive(Debug, Clone)]
pub struct LifecycleEventLog {
    capacity: usize,
    events: Arc<RwLock<VecDeque<LifecycleEvent>>>,
}

impl LifecycleEventLog {
    /// 创建指定容量的事件日志
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.max(1)))),
        }
    }

    /// 日志容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 追加事件，容量满时淘汰最旧的一条
    pub async fn append(&self, event: LifecycleEvent) {
        let mut events = self.events.write().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// 当前事件数量
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// 日志是否为空
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// 查询事件，按时间从新到旧返回
    pub async fn query(&self, query: EventQuery) -> Vec<LifecycleEvent> {
        let events = self.events.read().await;
        let iter = events
            .iter()
            .rev()
            .filter(|e| {
                query
                    .module_key
                    .as_ref()
                    .map_or(true, |k| &e.module_key == k)
                    && query.kind.map_or(true, |k| e.kind == k)
            })
            .cloned();

        match query.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}
