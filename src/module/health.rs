//! 模块健康监控
//!
//! 为每个注册了健康探针的模块维护一个独立的定时探测任务，
//! 支持超时控制、指标累计和优雅停止。
//! 探测在任务循环内串行执行，同一模块不会出现并发探测。

use crate::module::descriptor::{ErrorHook, HealthProbe};
use crate::module::events::{EventKind, LifecycleEvent, LifecycleEventLog};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

// ============================================================================
// 健康状态与指标
// ============================================================================

/// 模块健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// 健康
    Healthy,
    /// 警告（探针返回 false）
    Warning,
    /// 故障（探针报错或超时）
    Error,
    /// 未知（尚未执行过探测）
    Unknown,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Warning => write!(f, "warning"),
            HealthState::Error => write!(f, "error"),
            HealthState::Unknown => write!(f, "unknown"),
        }
    }
}

/// 健康指标附加信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthDetails {
    /// 模块加载耗时（毫秒）
    pub load_duration_ms: u64,
    /// 模块是否声明了挂件
    pub widget_declared: bool,
    /// 挂件是否解析成功
    pub widget_resolved: bool,
}

/// 模块健康指标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetric {
    /// 当前健康状态
    pub status: HealthState,
    /// 最近一次探测时间
    pub last_checked: Option<DateTime<Utc>>,
    /// 最近一次探测耗时（毫秒）
    pub last_duration_ms: u64,
    /// 累计故障次数
    pub error_count: u64,
    /// 累计警告次数
    pub warning_count: u64,
    /// 附加信息
    pub details: HealthDetails,
}

impl HealthMetric {
    /// 创建初始指标（状态未知）
    pub fn new(details: HealthDetails) -> Self {
        Self {
            status: HealthState::Unknown,
            last_checked: None,
            last_duration_ms: 0,
            error_count: 0,
            warning_count: 0,
            details,
        }
    }
}

/// 单次探测结果
#[derive(Debug, Clone)]
pub(crate) enum ProbeOutcome {
    Healthy,
    Warning,
    Error(String),
}

// ============================================================================
// 健康监控器
// ============================================================================

/// 健康监控器
///
/// 每个被监控模块对应一个独立的 tokio 任务，
/// 通过 watch 通道发送停止信号。Clone 共享内部状态。
#[derive(Clone)]
pub struct HealthMonitor {
    metrics: Arc<RwLock<HashMap<String, HealthMetric>>>,
    event_log: LifecycleEventLog,
    tasks: Arc<RwLock<HashMap<String, watch::Sender<bool>>>>,
}

impl HealthMonitor {
    /// 创建健康监控器
    ///
    /// `metrics` 与注册表共享，探测结果直接写入其中。
    pub fn new(
        metrics: Arc<RwLock<HashMap<String, HealthMetric>>>,
        event_log: LifecycleEventLog,
    ) -> Self {
        Self {
            metrics,
            event_log,
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 启动模块的定时探测任务
    ///
    /// 若该模块已有探测任务，先停止旧任务再启动新任务。
    /// 首次定时探测在一个完整间隔之后执行，指标在此之前保持初始的
    /// 未知状态；需要立刻探测时使用 [`HealthMonitor::probe_now`]。
    pub async fn start(
        &self,
        module_key: &str,
        probe: HealthProbe,
        on_error: Option<ErrorHook>,
        interval: Duration,
        timeout: Duration,
    ) {
        self.stop(module_key).await;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let key = module_key.to_string();
        let metrics = Arc::clone(&self.metrics);
        let event_log = self.event_log.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        debug!(module_key = %key, "健康探测任务收到停止信号");
                        break;
                    }
                    _ = ticker.tick() => {
                        // 探测在循环体内等待完成，天然避免同模块并发探测
                        run_probe(&key, &probe, on_error.as_ref(), timeout, &metrics, &event_log)
                            .await;
                    }
                }
            }
        });

        self.tasks
            .write()
            .await
            .insert(module_key.to_string(), shutdown_tx);

        info!(
            module_key = %module_key,
            interval_secs = interval.as_secs(),
            timeout_ms = timeout.as_millis() as u64,
            "健康探测任务已启动"
        );
    }

    /// 停止模块的探测任务
    ///
    /// 仅发送停止信号，不强行中断任务：进行中的探测会执行完毕、
    /// 写回指标并记录事件，任务循环随后退出，不再调度下一次探测。
    pub async fn stop(&self, module_key: &str) -> bool {
        if let Some(shutdown) = self.tasks.write().await.remove(module_key) {
            let _ = shutdown.send(true);
            debug!(module_key = %module_key, "健康探测任务已停止");
            true
        } else {
            false
        }
    }

    /// 停止所有探测任务
    pub async fn stop_all(&self) {
        let mut tasks = self.tasks.write().await;
        for (key, shutdown) in tasks.drain() {
            let _ = shutdown.send(true);
            debug!(module_key = %key, "健康探测任务已停止");
        }
    }

    /// 是否正在监控指定模块
    pub async fn is_monitoring(&self, module_key: &str) -> bool {
        self.tasks.read().await.contains_key(module_key)
    }

    /// 当前监控的模块数量
    pub async fn monitored_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// 立即执行一次探测（独立于定时任务）
    pub async fn probe_now(
        &self,
        module_key: &str,
        probe: HealthProbe,
        on_error: Option<ErrorHook>,
        timeout: Duration,
    ) -> HealthState {
        run_probe(
            module_key,
            &probe,
            on_error.as_ref(),
            timeout,
            &self.metrics,
            &self.event_log,
        )
        .await
    }
}

/// 执行单次探测并写回指标、记录事件
async fn run_probe(
    module_key: &str,
    probe: &HealthProbe,
    on_error: Option<&ErrorHook>,
    timeout: Duration,
    metrics: &Arc<RwLock<HashMap<String, HealthMetric>>>,
    event_log: &LifecycleEventLog,
) -> HealthState {
    let start = std::time::Instant::now();
    let outcome = match tokio::time::timeout(timeout, probe()).await {
        Ok(Ok(true)) => ProbeOutcome::Healthy,
        Ok(Ok(false)) => ProbeOutcome::Warning,
        Ok(Err(e)) => ProbeOutcome::Error(e.to_string()),
        Err(_) => ProbeOutcome::Error(format!("健康探针超时（{}ms）", timeout.as_millis())),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    let status = match &outcome {
        ProbeOutcome::Healthy => HealthState::Healthy,
        ProbeOutcome::Warning => HealthState::Warning,
        ProbeOutcome::Error(_) => HealthState::Error,
    };

    {
        let mut metrics = metrics.write().await;
        if let Some(metric) = metrics.get_mut(module_key) {
            metric.status = status;
            metric.last_checked = Some(Utc::now());
            metric.last_duration_ms = duration_ms;
            match status {
                HealthState::Warning => metric.warning_count += 1,
                HealthState::Error => metric.error_count += 1,
                _ => {}
            }
        }
    }

    match &outcome {
        ProbeOutcome::Healthy => {
            debug!(module_key = %module_key, duration_ms, "健康探测通过");
        }
        ProbeOutcome::Warning => {
            warn!(module_key = %module_key, duration_ms, "健康探测返回警告");
        }
        ProbeOutcome::Error(msg) => {
            warn!(module_key = %module_key, duration_ms, error_msg = %msg, "健康探测故障");
            if let Some(hook) = on_error {
                hook(msg.clone()).await;
            }
        }
    }

    let mut event = LifecycleEvent::new(EventKind::HealthCheck, module_key)
        .with_duration_ms(duration_ms)
        .with_payload(serde_json::json!({ "status": status.to_string() }));
    if matches!(status, HealthState::Error) {
        event = event.failed();
    }
    event_log.append(event).await;

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::events::EventQuery;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn setup() -> (Arc<RwLock<HashMap<String, HealthMetric>>>, LifecycleEventLog) {
        let metrics = Arc::new(RwLock::new(HashMap::new()));
        let log = LifecycleEventLog::new(100);
        (metrics, log)
    }

    async fn insert_metric(metrics: &Arc<RwLock<HashMap<String, HealthMetric>>>, key: &str) {
        metrics
            .write()
            .await
            .insert(key.to_string(), HealthMetric::new(HealthDetails::default()));
    }

    #[tokio::test]
    async fn test_probe_now_healthy() {
        let (metrics, log) = setup();
        insert_metric(&metrics, "goals").await;
        let monitor = HealthMonitor::new(Arc::clone(&metrics), log.clone());

        let probe: HealthProbe = Arc::new(|| Box::pin(async { Ok(true) }));
        let status = monitor
            .probe_now("goals", probe, None, Duration::from_secs(1))
            .await;

        assert_eq!(status, HealthState::Healthy);
        let m = metrics.read().await;
        let metric = m.get("goals").unwrap();
        assert_eq!(metric.status, HealthState::Healthy);
        assert!(metric.last_checked.is_some());
        assert_eq!(metric.error_count, 0);
    }

    #[tokio::test]
    async fn test_probe_warning_increments_counter() {
        let (metrics, log) = setup();
        insert_metric(&metrics, "goals").await;
        let monitor = HealthMonitor::new(Arc::clone(&metrics), log.clone());

        let probe: HealthProbe = Arc::new(|| Box::pin(async { Ok(false) }));
        monitor
            .probe_now("goals", probe.clone(), None, Duration::from_secs(1))
            .await;
        monitor
            .probe_now("goals", probe, None, Duration::from_secs(1))
            .await;

        let m = metrics.read().await;
        let metric = m.get("goals").unwrap();
        assert_eq!(metric.status, HealthState::Warning);
        assert_eq!(metric.warning_count, 2);
    }

    #[tokio::test]
    async fn test_probe_error_invokes_on_error() {
        let (metrics, log) = setup();
        insert_metric(&metrics, "goals").await;
        let monitor = HealthMonitor::new(Arc::clone(&metrics), log.clone());

        let calls = Arc::new(AtomicU64::new(0));
        let calls_clone = Arc::clone(&calls);
        let on_error: ErrorHook = Arc::new(move |_msg| {
            let calls = Arc::clone(&calls_clone);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        });

        let probe: HealthProbe =
            Arc::new(|| Box::pin(async { Err(anyhow::anyhow!("数据库连接失败")) }));
        let status = monitor
            .probe_now("goals", probe, Some(on_error), Duration::from_secs(1))
            .await;

        assert_eq!(status, HealthState::Error);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.read().await.get("goals").unwrap().error_count, 1);

        // 每次探测记录一条 health_check 事件
        let events = log.query(EventQuery::all().kind(EventKind::HealthCheck)).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["status"], "error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_counts_as_error() {
        let (metrics, log) = setup();
        insert_metric(&metrics, "slow").await;
        let monitor = HealthMonitor::new(Arc::clone(&metrics), log);

        let probe: HealthProbe = Arc::new(|| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(true)
            })
        });
        let status = monitor
            .probe_now("slow", probe, None, Duration::from_millis(100))
            .await;

        assert_eq!(status, HealthState::Error);
        assert_eq!(metrics.read().await.get("slow").unwrap().error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_probe_ticks() {
        let (metrics, log) = setup();
        insert_metric(&metrics, "goals").await;
        let monitor = HealthMonitor::new(Arc::clone(&metrics), log);

        let count = Arc::new(AtomicU64::new(0));
        let count_clone = Arc::clone(&count);
        let probe: HealthProbe = Arc::new(move || {
            let count = Arc::clone(&count_clone);
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            })
        });

        monitor
            .start(
                "goals",
                probe,
                None,
                Duration::from_secs(10),
                Duration::from_secs(1),
            )
            .await;
        assert!(monitor.is_monitoring("goals").await);

        // 推进 3 个完整间隔
        tokio::time::sleep(Duration::from_secs(31)).await;
        // 让任务获得调度机会
        tokio::task::yield_now().await;
        assert!(count.load(Ordering::SeqCst) >= 3);

        assert!(monitor.stop("goals").await);
        assert!(!monitor.is_monitoring("goals").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_inflight_probe_finish() {
        let (metrics, log) = setup();
        insert_metric(&metrics, "goals").await;
        let monitor = HealthMonitor::new(Arc::clone(&metrics), log);

        let count = Arc::new(AtomicU64::new(0));
        let count_clone = Arc::clone(&count);
        let probe: HealthProbe = Arc::new(move || {
            let count = Arc::clone(&count_clone);
            Box::pin(async move {
                // 模拟耗时探测
                tokio::time::sleep(Duration::from_secs(5)).await;
                count.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            })
        });

        monitor
            .start(
                "goals",
                probe,
                None,
                Duration::from_secs(10),
                Duration::from_secs(30),
            )
            .await;

        // t=10 触发首次探测，t=12 时探测仍在进行中
        tokio::time::sleep(Duration::from_secs(12)).await;
        tokio::task::yield_now().await;
        assert!(monitor.stop("goals").await);

        // 进行中的探测照常完成并写回指标
        tokio::time::sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        {
            let m = metrics.read().await;
            let metric = m.get("goals").unwrap();
            assert_eq!(metric.status, HealthState::Healthy);
            assert!(metric.last_checked.is_some());
        }

        // 停止后不再调度新的探测
        tokio::time::sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_unknown_module() {
        let (metrics, log) = setup();
        let monitor = HealthMonitor::new(metrics, log);
        assert!(!monitor.stop("missing").await);
    }

    #[tokio::test]
    async fn test_stop_all() {
        let (metrics, log) = setup();
        insert_metric(&metrics, "a").await;
        insert_metric(&metrics, "b").await;
        let monitor = HealthMonitor::new(metrics, log);

        let probe: HealthProbe = Arc::new(|| Box::pin(async { Ok(true) }));
        monitor
            .start(
                "a",
                probe.clone(),
                None,
                Duration::from_secs(30),
                Duration::from_secs(1),
            )
            .await;
        monitor
            .start(
                "b",
                probe,
                None,
                Duration::from_secs(30),
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(monitor.monitored_count().await, 2);

        monitor.stop_all().await;
        assert_eq!(monitor.monitored_count().await, 0);
    }
}
