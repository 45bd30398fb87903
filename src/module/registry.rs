//! 模块注册表
//!
//! 内核的编排中枢：维护注册条目、依赖图、加载顺序和健康指标，
//! 对外提供注册、卸载、重载、启停等命令接口以及只读查询接口。
//!
//! 并发模型：结构性变更（注册、卸载、重载）通过全局互斥锁串行化；
//! 健康探测任务只写共享的指标表，不持有该互斥锁。

use crate::core::config::CoreConfig;
use crate::module::dependency::DependencyGraph;
use crate::module::descriptor::{HealthProbe, LifecycleHook, ModuleDescriptor, ModuleState};
use crate::module::events::{EventKind, EventQuery, LifecycleEvent, LifecycleEventLog};
use crate::module::health::{HealthDetails, HealthMetric, HealthMonitor, HealthState};
use crate::module::version::VersionGate;
use crate::utils::{CoreError, Result};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use semver::Version;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// 外部描述符加载器（重载时重新获取模块声明）
pub type DescriptorLoader =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<ModuleDescriptor>> + Send + Sync>;

// ============================================================================
// 注册表配置与条目
// ============================================================================

/// 注册表运行参数
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// 内核版本（兼容性检查基准）
    pub core_version: Version,
    /// 事件日志容量
    pub event_log_capacity: usize,
    /// 是否启用热重载
    pub hot_reload_enabled: bool,
    /// 是否启用健康监控
    pub health_enabled: bool,
    /// 健康检查默认间隔
    pub health_interval: Duration,
    /// 健康检查默认超时
    pub health_timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            core_version: Version::new(1, 0, 0),
            event_log_capacity: 1_000,
            hot_reload_enabled: true,
            health_enabled: true,
            health_interval: Duration::from_secs(30),
            health_timeout: Duration::from_millis(5_000),
        }
    }
}

impl RegistryOptions {
    /// 从内核配置构造
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        Ok(Self {
            core_version: Version::parse(&config.core_version)?,
            event_log_capacity: config.modules.event_log_capacity,
            hot_reload_enabled: config.modules.hot_reload,
            health_enabled: config.modules.health_enabled,
            health_interval: Duration::from_secs(config.modules.health_check_interval_secs),
            health_timeout: Duration::from_millis(config.modules.health_check_timeout_ms),
        })
    }
}

/// 注册条目：模块在注册表中的存活记录
#[derive(Debug, Clone, Serialize)]
pub struct ModuleEntry {
    /// 模块描述符
    pub descriptor: ModuleDescriptor,
    /// 当前状态
    pub state: ModuleState,
    /// 注册时间
    pub registered_at: DateTime<Utc>,
    /// 最近一次错误信息
    pub last_error: Option<String>,
}

/// 系统健康摘要
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthSummary {
    /// 注册模块总数
    pub total: usize,
    /// 活跃模块数
    pub active: usize,
    /// 禁用模块数
    pub disabled: usize,
    /// 故障模块数
    pub failed: usize,
    /// 各健康状态的模块数
    pub healthy: usize,
    /// 警告状态数
    pub warning: usize,
    /// 故障状态数
    pub error: usize,
    /// 未知状态数
    pub unknown: usize,
    /// 整体健康状态（取最差）
    pub overall: HealthState,
}

// ============================================================================
// 模块注册表
// ============================================================================

/// 模块注册表
///
/// Clone 共享内部状态，可安全地分发给多个协作方。
/// 依赖图、注册条目和健康指标仅通过本类型的操作变更。
#[derive(Clone)]
pub struct ModuleRegistry {
    gate: VersionGate,
    entries: Arc<RwLock<HashMap<String, ModuleEntry>>>,
    graph: Arc<RwLock<DependencyGraph>>,
    load_order: Arc<RwLock<Vec<String>>>,
    metrics: Arc<RwLock<HashMap<String, HealthMetric>>>,
    event_log: LifecycleEventLog,
    monitor: HealthMonitor,
    loader: Arc<RwLock<Option<DescriptorLoader>>>,
    /// 结构性变更互斥锁
    mutation_lock: Arc<Mutex<()>>,
    hot_reload_enabled: Arc<AtomicBool>,
    health_enabled: Arc<AtomicBool>,
    health_interval: Duration,
    health_timeout: Duration,
}

impl ModuleRegistry {
    /// 创建注册表
    pub fn new(options: RegistryOptions) -> Self {
        let metrics = Arc::new(RwLock::new(HashMap::new()));
        let event_log = LifecycleEventLog::new(options.event_log_capacity);
        let monitor = HealthMonitor::new(Arc::clone(&metrics), event_log.clone());

        Self {
            gate: VersionGate::new(options.core_version),
            entries: Arc::new(RwLock::new(HashMap::new())),
            graph: Arc::new(RwLock::new(DependencyGraph::new())),
            load_order: Arc::new(RwLock::new(Vec::new())),
            metrics,
            event_log,
            monitor,
            loader: Arc::new(RwLock::new(None)),
            mutation_lock: Arc::new(Mutex::new(())),
            hot_reload_enabled: Arc::new(AtomicBool::new(options.hot_reload_enabled)),
            health_enabled: Arc::new(AtomicBool::new(options.health_enabled)),
            health_interval: options.health_interval,
            health_timeout: options.health_timeout,
        }
    }

    /// 从内核配置创建注册表
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        Ok(Self::new(RegistryOptions::from_config(config)?))
    }

    /// 设置外部描述符加载器（重载时调用）
    pub async fn set_loader(&self, loader: DescriptorLoader) {
        *self.loader.write().await = Some(loader);
    }

    /// 内核版本
    pub fn core_version(&self) -> &Version {
        self.gate.core_version()
    }

    // ------------------------------------------------------------------
    // 命令接口
    // ------------------------------------------------------------------

    /// 注册模块
    ///
    /// 完整流程：描述符校验 → 重复检查 → 版本门禁 → 依赖检查 →
    /// `before_load` 钩子 → 依赖图提交与排序 → 指标创建 →
    /// 健康监控启动 → `after_load` 钩子 → 记录 load 事件。
    /// 任一前置检查拒绝时以失败的 load 事件留痕后返回错误。
    #[instrument(skip(self, descriptor), fields(module_key = %descriptor.key))]
    pub async fn register(&self, descriptor: ModuleDescriptor) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;
        self.register_locked(descriptor).await
    }

    /// 卸载模块
    ///
    /// 对称的拆除流程：`before_unload` 钩子 → 停止健康监控 →
    /// 移除依赖图节点并重算顺序 → 删除指标和条目 →
    /// `after_unload` 钩子 → 记录 unload 事件。
    /// 卸载不会级联：依赖该模块的其它模块保持注册状态。
    #[instrument(skip(self))]
    pub async fn unregister(&self, key: &str) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;
        self.unregister_locked(key).await
    }

    /// 重载模块
    ///
    /// 等价于卸载后重新注册（两段式提交，整个序列持有同一把锁）。
    /// 通过外部加载器重新获取描述符；未设置加载器时复用旧描述符。
    /// 重新注册失败时模块保持未注册状态，不回退到旧描述符。
    #[instrument(skip(self))]
    pub async fn reload(&self, key: &str) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;

        if !self.hot_reload_enabled.load(Ordering::SeqCst) {
            return Err(CoreError::HotReloadDisabled(key.to_string()));
        }

        let old = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .cloned()
                .ok_or_else(|| CoreError::ModuleNotFound(key.to_string()))?
        };
        if !old.descriptor.hot_reload {
            return Err(CoreError::HotReloadDisabled(key.to_string()));
        }

        let start = std::time::Instant::now();
        self.unregister_locked(key).await?;

        let loader = self.loader.read().await.clone();
        let descriptor = match loader {
            Some(load) => load(key.to_string()).await,
            None => Ok(old.descriptor),
        };

        let result = match descriptor {
            Ok(descriptor) => self.register_locked(descriptor).await,
            Err(e) => Err(e),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let event = match &result {
            Ok(()) => {
                info!(module_key = %key, duration_ms, "模块重载完成");
                LifecycleEvent::new(EventKind::Reload, key).with_duration_ms(duration_ms)
            }
            Err(e) => {
                // 重新注册失败：清理残留，模块保持未注册
                self.purge_locked(key).await;
                warn!(module_key = %key, error_msg = %e, "模块重载失败");
                LifecycleEvent::new(EventKind::Reload, key)
                    .failed()
                    .with_duration_ms(duration_ms)
                    .with_payload(serde_json::json!({ "reason": e.to_string() }))
            }
        };
        self.event_log.append(event).await;

        result
    }

    /// 启停模块（活跃 ⇄ 禁用）
    ///
    /// 不影响依赖图成员关系，也不中断健康监控，
    /// 依赖本模块的其它模块不会因此失效。
    pub async fn toggle(&self, key: &str) -> Result<ModuleState> {
        let _guard = self.mutation_lock.lock().await;
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| CoreError::ModuleNotFound(key.to_string()))?;

        let next = if entry.state.can_disable() {
            ModuleState::Disabled
        } else if entry.state.can_enable() {
            ModuleState::Active
        } else {
            return Err(CoreError::Internal(format!(
                "模块 '{}' 当前状态为 {}，不支持启停",
                key, entry.state
            )));
        };

        entry.state = next;
        info!(module_key = %key, state = %next, "模块状态已切换");
        Ok(next)
    }

    /// 批量注册（引导场景）
    ///
    /// 按依赖关系排序后依次注册，返回每个模块的注册结果。
    /// 批次内存在循环依赖时退回提交顺序，让环上的模块逐个失败。
    pub async fn register_many(
        &self,
        descriptors: Vec<ModuleDescriptor>,
    ) -> Vec<(String, Result<()>)> {
        let mut batch = DependencyGraph::new();
        for d in &descriptors {
            batch.upsert(
                d.key.clone(),
                d.dependencies.iter().map(|x| x.module_key.clone()).collect(),
            );
        }

        let mut by_key: HashMap<String, ModuleDescriptor> =
            descriptors.iter().map(|d| (d.key.clone(), d.clone())).collect();

        let ordered: Vec<ModuleDescriptor> = match batch.compute_order() {
            Ok(order) => order.into_iter().filter_map(|k| by_key.remove(&k)).collect(),
            Err(e) => {
                warn!(error_msg = %e, "批量注册存在循环依赖，按提交顺序注册");
                descriptors
            }
        };

        let mut results = Vec::with_capacity(ordered.len());
        for descriptor in ordered {
            let key = descriptor.key.clone();
            let result = self.register(descriptor).await;
            results.push((key, result));
        }
        results
    }

    /// 启用热重载
    pub fn enable_hot_reload(&self) {
        self.hot_reload_enabled.store(true, Ordering::SeqCst);
        info!("热重载已启用");
    }

    /// 禁用热重载
    pub fn disable_hot_reload(&self) {
        self.hot_reload_enabled.store(false, Ordering::SeqCst);
        info!("热重载已禁用");
    }

    /// 热重载是否启用
    pub fn is_hot_reload_enabled(&self) -> bool {
        self.hot_reload_enabled.load(Ordering::SeqCst)
    }

    /// 启用健康监控，并为所有已注册模块启动探测任务
    pub async fn enable_health_monitoring(&self) {
        self.health_enabled.store(true, Ordering::SeqCst);
        let entries: Vec<ModuleEntry> =
            self.entries.read().await.values().cloned().collect();
        for entry in entries {
            if entry.descriptor.health_check.enabled && entry.state != ModuleState::Failed {
                self.start_monitoring(&entry.descriptor).await;
            }
        }
        info!("健康监控已启用");
    }

    /// 禁用健康监控，停止所有探测任务
    pub async fn disable_health_monitoring(&self) {
        self.health_enabled.store(false, Ordering::SeqCst);
        self.monitor.stop_all().await;
        info!("健康监控已禁用");
    }

    /// 健康监控是否启用
    pub fn is_health_monitoring_enabled(&self) -> bool {
        self.health_enabled.load(Ordering::SeqCst)
    }

    /// 立即对指定模块执行一次健康探测
    pub async fn check_health_now(&self, key: &str) -> Result<HealthState> {
        let descriptor = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .map(|e| e.descriptor.clone())
                .ok_or_else(|| CoreError::ModuleNotFound(key.to_string()))?
        };

        let timeout = descriptor
            .health_check
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.health_timeout);
        Ok(self
            .monitor
            .probe_now(
                key,
                Self::probe_of(&descriptor),
                descriptor.hooks.on_error.clone(),
                timeout,
            )
            .await)
    }

    // ------------------------------------------------------------------
    // 查询接口
    // ------------------------------------------------------------------

    /// 列出所有注册条目（按模块键排序）
    pub async fn list_modules(&self) -> Vec<ModuleEntry> {
        let entries = self.entries.read().await;
        let mut list: Vec<ModuleEntry> = entries.values().cloned().collect();
        list.sort_by(|a, b| a.descriptor.key.cmp(&b.descriptor.key));
        list
    }

    /// 获取单个模块的注册条目
    pub async fn get_module(&self, key: &str) -> Option<ModuleEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// 模块是否已注册
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// 已注册模块数量
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// 当前加载顺序（依赖在前）
    pub async fn load_order(&self) -> Vec<String> {
        self.load_order.read().await.clone()
    }

    /// 获取模块健康指标
    pub async fn get_health(&self, key: &str) -> Option<HealthMetric> {
        self.metrics.read().await.get(key).cloned()
    }

    /// 获取全部健康指标
    pub async fn get_all_health(&self) -> HashMap<String, HealthMetric> {
        self.metrics.read().await.clone()
    }

    /// 查询生命周期事件（从新到旧）
    pub async fn get_events(&self, query: EventQuery) -> Vec<LifecycleEvent> {
        self.event_log.query(query).await
    }

    /// 生命周期事件日志
    pub fn event_log(&self) -> &LifecycleEventLog {
        &self.event_log
    }

    /// 系统健康摘要
    pub async fn system_health_summary(&self) -> SystemHealthSummary {
        let entries = self.entries.read().await;
        let metrics = self.metrics.read().await;

        let mut summary = SystemHealthSummary {
            total: entries.len(),
            active: 0,
            disabled: 0,
            failed: 0,
            healthy: 0,
            warning: 0,
            error: 0,
            unknown: 0,
            overall: HealthState::Healthy,
        };

        for entry in entries.values() {
            match entry.state {
                ModuleState::Active => summary.active += 1,
                ModuleState::Disabled => summary.disabled += 1,
                ModuleState::Failed => summary.failed += 1,
                _ => {}
            }
        }

        for metric in metrics.values() {
            match metric.status {
                HealthState::Healthy => summary.healthy += 1,
                HealthState::Warning => summary.warning += 1,
                HealthState::Error => summary.error += 1,
                HealthState::Unknown => summary.unknown += 1,
            }
        }

        // 整体状态取最差
        summary.overall = if summary.error > 0 || summary.failed > 0 {
            HealthState::Error
        } else if summary.warning > 0 {
            HealthState::Warning
        } else if summary.unknown > 0 {
            HealthState::Unknown
        } else {
            HealthState::Healthy
        };

        summary
    }

    // ------------------------------------------------------------------
    // 内部流程
    // ------------------------------------------------------------------

    /// 注册流程（调用方必须已持有变更锁）
    async fn register_locked(&self, descriptor: ModuleDescriptor) -> Result<()> {
        let start = std::time::Instant::now();
        let key = descriptor.key.clone();

        if let Err(e) = descriptor.validate() {
            return Err(self.refuse(&key, e).await);
        }

        // 重复注册检查：Failed 终态条目允许覆盖重注册
        {
            let entries = self.entries.read().await;
            if let Some(existing) = entries.get(&key) {
                if existing.state != ModuleState::Failed {
                    return Err(self
                        .refuse(&key, CoreError::ModuleAlreadyRegistered(key.clone()))
                        .await);
                }
            }
        }

        // 版本门禁
        let report = self.gate.check(&descriptor);
        for issue in &report.issues {
            warn!(module_key = %key, "{}", issue);
        }
        if !report.compatible {
            let err = CoreError::Incompatible {
                module: key.clone(),
                core_version: self.gate.core_version().to_string(),
                required: descriptor.compatible_range.clone().unwrap_or_default(),
            };
            return Err(self.refuse(&key, err).await);
        }

        // 依赖检查：必需依赖缺失为致命错误，可选依赖缺失仅告警。
        // 只有完成提交的模块（活跃或禁用）才算已注册的依赖，
        // Failed / Loading / Unloading 条目不在图中，视同缺失。
        {
            let entries = self.entries.read().await;
            for dep in &descriptor.dependencies {
                let registered = entries
                    .get(&dep.module_key)
                    .filter(|e| matches!(e.state, ModuleState::Active | ModuleState::Disabled));
                match registered {
                    None => {
                        if dep.required {
                            let err = CoreError::DependencyNotFound {
                                module: key.clone(),
                                dependency: dep.module_key.clone(),
                            };
                            return Err(self.refuse(&key, err).await);
                        }
                        warn!(
                            module_key = %key,
                            dependency = %dep.module_key,
                            "可选依赖未注册，跳过"
                        );
                    }
                    Some(dep_entry) => {
                        if let Some(req) = &dep.version_req {
                            match &dep_entry.descriptor.version {
                                Some(found) if !req.matches(found) => {
                                    let err = CoreError::DependencyVersionMismatch {
                                        module: key.clone(),
                                        dependency: dep.module_key.clone(),
                                        required: req.to_string(),
                                        found: found.to_string(),
                                    };
                                    return Err(self.refuse(&key, err).await);
                                }
                                Some(_) => {}
                                None => {
                                    warn!(
                                        module_key = %key,
                                        dependency = %dep.module_key,
                                        "依赖未声明版本，跳过版本要求检查"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }

        // 进入 Loading 状态
        self.entries.write().await.insert(
            key.clone(),
            ModuleEntry {
                descriptor: descriptor.clone(),
                state: ModuleState::Loading,
                registered_at: Utc::now(),
                last_error: None,
            },
        );

        // before_load 钩子：失败中止注册，条目转入 Failed
        if let Err(reason) = self.run_hook(&descriptor.hooks.before_load).await {
            self.fail_module(&key, &reason, Some("before_load")).await;
            return Err(CoreError::HookFailed {
                module: key,
                hook: "before_load".to_string(),
                reason,
            });
        }

        // 依赖图提交与排序，失败回滚图插入
        {
            let mut graph = self.graph.write().await;
            graph.upsert(
                key.clone(),
                descriptor
                    .dependencies
                    .iter()
                    .map(|d| d.module_key.clone())
                    .collect(),
            );
            match graph.compute_order() {
                Ok(order) => {
                    *self.load_order.write().await = order;
                }
                Err(e) => {
                    graph.remove(&key);
                    drop(graph);
                    self.fail_module(&key, &e.to_string(), None).await;
                    return Err(e);
                }
            }
        }

        // 创建健康指标（状态未知）
        let load_duration_ms = start.elapsed().as_millis() as u64;
        let widget_declared = descriptor.provides_widget.is_some();
        let widget_resolved = descriptor
            .provides_widget
            .as_deref()
            .map_or(false, |w| !w.trim().is_empty());
        self.metrics.write().await.insert(
            key.clone(),
            HealthMetric::new(HealthDetails {
                load_duration_ms,
                widget_declared,
                widget_resolved,
            }),
        );

        // 提交完成，进入活跃状态
        if let Some(entry) = self.entries.write().await.get_mut(&key) {
            entry.state = ModuleState::Active;
        }

        // 启动健康监控
        if self.health_enabled.load(Ordering::SeqCst) && descriptor.health_check.enabled {
            self.start_monitoring(&descriptor).await;
        }

        // after_load 钩子：模块已提交，失败仅告警
        if let Err(reason) = self.run_hook(&descriptor.hooks.after_load).await {
            warn!(module_key = %key, hook = "after_load", error_msg = %reason, "钩子执行失败");
            self.report_hook_error(&descriptor, "after_load", &reason).await;
        }

        self.event_log
            .append(LifecycleEvent::new(EventKind::Load, &key).with_duration_ms(load_duration_ms))
            .await;
        info!(
            module_key = %key,
            version = ?descriptor.version,
            duration_ms = load_duration_ms,
            "模块注册成功"
        );
        Ok(())
    }

    /// 卸载流程（调用方必须已持有变更锁）
    async fn unregister_locked(&self, key: &str) -> Result<()> {
        let descriptor = {
            let mut entries = self.entries.write().await;
            let entry = entries
                .get_mut(key)
                .ok_or_else(|| CoreError::ModuleNotFound(key.to_string()))?;
            entry.state = ModuleState::Unloading;
            entry.descriptor.clone()
        };

        // before_unload 钩子：失败不中断拆除
        if let Err(reason) = self.run_hook(&descriptor.hooks.before_unload).await {
            warn!(module_key = %key, hook = "before_unload", error_msg = %reason, "钩子执行失败");
            self.report_hook_error(&descriptor, "before_unload", &reason).await;
        }

        self.monitor.stop(key).await;

        {
            let mut graph = self.graph.write().await;
            graph.remove(key);
            // 删除节点不会引入环，排序必然成功
            if let Ok(order) = graph.compute_order() {
                *self.load_order.write().await = order;
            }
        }

        self.metrics.write().await.remove(key);
        self.entries.write().await.remove(key);

        if let Err(reason) = self.run_hook(&descriptor.hooks.after_unload).await {
            warn!(module_key = %key, hook = "after_unload", error_msg = %reason, "钩子执行失败");
            self.report_hook_error(&descriptor, "after_unload", &reason).await;
        }

        self.event_log
            .append(LifecycleEvent::new(EventKind::Unload, key))
            .await;
        info!(module_key = %key, "模块已卸载");
        Ok(())
    }

    /// 清除模块的全部残留状态（重载失败后的兜底）
    async fn purge_locked(&self, key: &str) {
        self.monitor.stop(key).await;
        self.entries.write().await.remove(key);
        self.metrics.write().await.remove(key);
        let mut graph = self.graph.write().await;
        if graph.remove(key) {
            if let Ok(order) = graph.compute_order() {
                *self.load_order.write().await = order;
            }
        }
    }

    /// 执行可选钩子，错误以字符串返回
    async fn run_hook(&self, hook: &Option<LifecycleHook>) -> std::result::Result<(), String> {
        match hook {
            Some(hook) => hook().await.map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    /// 注册被拒绝（未产生任何条目变更）时记录失败的 load 事件并回传错误
    async fn refuse(&self, key: &str, err: CoreError) -> CoreError {
        self.event_log
            .append(
                LifecycleEvent::new(EventKind::Load, key)
                    .failed()
                    .with_payload(serde_json::json!({
                        "reason": err.to_string(),
                        "error_code": err.error_code(),
                    })),
            )
            .await;
        warn!(module_key = %key, error_code = %err.error_code(), error_msg = %err, "模块注册被拒绝");
        err
    }

    /// 将模块转入 Failed 状态并记录 error 事件
    ///
    /// `failed_hook` 为 Some 时表示钩子失败，额外触发模块的 on_error 回调。
    async fn fail_module(&self, key: &str, reason: &str, failed_hook: Option<&str>) {
        let on_error = {
            let mut entries = self.entries.write().await;
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.state = ModuleState::Failed;
                    entry.last_error = Some(reason.to_string());
                    entry.descriptor.hooks.on_error.clone()
                }
                None => None,
            }
        };

        if failed_hook.is_some() {
            if let Some(on_error) = on_error {
                on_error(reason.to_string()).await;
            }
        }

        self.event_log
            .append(
                LifecycleEvent::new(EventKind::Error, key)
                    .failed()
                    .with_payload(serde_json::json!({
                        "reason": reason,
                        "hook": failed_hook,
                    })),
            )
            .await;
        warn!(module_key = %key, error_msg = %reason, "模块转入故障状态");
    }

    /// 非致命钩子失败的统一上报：on_error 回调 + error 事件
    async fn report_hook_error(&self, descriptor: &ModuleDescriptor, hook: &str, reason: &str) {
        if let Some(on_error) = descriptor.hooks.on_error.clone() {
            on_error(reason.to_string()).await;
        }
        self.event_log
            .append(
                LifecycleEvent::new(EventKind::Error, &descriptor.key)
                    .failed()
                    .with_payload(serde_json::json!({ "reason": reason, "hook": hook })),
            )
            .await;
    }

    /// 模块的健康探针（未声明探针时默认健康）
    fn probe_of(descriptor: &ModuleDescriptor) -> HealthProbe {
        descriptor
            .hooks
            .on_health_check
            .clone()
            .unwrap_or_else(|| Arc::new(|| Box::pin(async { Ok(true) })))
    }

    /// 为模块启动定时探测任务
    async fn start_monitoring(&self, descriptor: &ModuleDescriptor) {
        let interval = descriptor
            .health_check
            .interval_secs
            .map(Duration::from_secs)
            .unwrap_or(self.health_interval);
        let timeout = descriptor
            .health_check
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.health_timeout);

        debug!(module_key = %descriptor.key, "启动健康监控");
        self.monitor
            .start(
                &descriptor.key,
                Self::probe_of(descriptor),
                descriptor.hooks.on_error.clone(),
                interval,
                timeout,
            )
            .await;
    }
}
