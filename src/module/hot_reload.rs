//! 热重载协调器
//!
//! 接收外部变更通知（通常来自文件监视），对同一模块的密集通知
//! 做防抖合并：窗口内的多次通知只触发一次重载。
//! 防抖定时器按模块键独立，互不影响。

use crate::module::registry::ModuleRegistry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 待触发的重载任务
struct PendingReload {
    /// 通知代次，用于识别任务是否已被新通知取代
    generation: u64,
    handle: JoinHandle<()>,
}

/// 热重载协调器
///
/// Clone 共享内部状态。
#[derive(Clone)]
pub struct HotReloadCoordinator {
    registry: ModuleRegistry,
    debounce: Duration,
    enabled: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    pending: Arc<Mutex<HashMap<String, PendingReload>>>,
}

impl HotReloadCoordinator {
    /// 创建协调器
    pub fn new(registry: ModuleRegistry, debounce: Duration) -> Self {
        Self {
            registry,
            debounce,
            enabled: Arc::new(AtomicBool::new(true)),
            generation: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 防抖窗口
    pub fn debounce_window(&self) -> Duration {
        self.debounce
    }

    /// 启用协调器
    ///
    /// 重新启用不会补发禁用期间收到的通知。
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        info!("热重载协调器已启用");
    }

    /// 禁用协调器，取消所有待触发的重载
    pub async fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        let mut pending = self.pending.lock().await;
        for (key, task) in pending.drain() {
            task.handle.abort();
            debug!(module_key = %key, "待触发的重载已取消");
        }
        info!("热重载协调器已禁用");
    }

    /// 是否启用
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// 当前待触发的重载数量
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// 接收模块变更通知
    ///
    /// 同一模块在防抖窗口内的重复通知取代前一个定时器，
    /// 窗口结束后无新通知时触发一次重载。
    pub async fn notify_changed(&self, module_key: &str) {
        if !self.enabled.load(Ordering::SeqCst) {
            debug!(module_key = %module_key, "协调器已禁用，忽略变更通知");
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let key = module_key.to_string();
        let coordinator = self.clone();

        let handle = tokio::spawn({
            let key = key.clone();
            async move {
                tokio::time::sleep(coordinator.debounce).await;
                coordinator.fire(&key, generation).await;
            }
        });

        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.insert(
            key.clone(),
            PendingReload { generation, handle },
        ) {
            previous.handle.abort();
            debug!(module_key = %key, "防抖窗口内的重复通知，重置定时器");
        }
    }

    /// 防抖窗口结束后的触发逻辑
    async fn fire(&self, module_key: &str, generation: u64) {
        {
            let mut pending = self.pending.lock().await;
            match pending.get(module_key) {
                // 仍是当前代次，移除登记后触发
                Some(p) if p.generation == generation => {
                    pending.remove(module_key);
                }
                // 已被更新的通知取代或已取消
                _ => return,
            }
        }

        // 窗口期间可能被禁用
        if !self.enabled.load(Ordering::SeqCst) {
            return;
        }

        match self.registry.reload(module_key).await {
            Ok(()) => {
                info!(module_key = %module_key, "变更通知触发重载成功");
            }
            Err(e) => {
                warn!(module_key = %module_key, error_msg = %e, "变更通知触发重载失败");
            }
        }
    }
}
