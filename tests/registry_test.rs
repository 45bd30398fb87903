//! 注册表端到端场景测试

use coach_core::module::{
    DependencySpec, EventKind, EventQuery, HealthCheckConfig, HealthState, ModuleDescriptor,
    ModuleHooks, ModuleRegistry, ModuleState, RegistryOptions,
};
use coach_core::CoreError;
use semver::Version;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn registry_with_core(version: Version) -> ModuleRegistry {
    ModuleRegistry::new(RegistryOptions {
        core_version: version,
        ..Default::default()
    })
}

fn descriptor(key: &str) -> ModuleDescriptor {
    ModuleDescriptor::new(key, format!("模块 {}", key), Version::new(1, 0, 0))
}

#[tokio::test]
async fn goals_sgnb_lifecycle_scenario() {
    let reg = registry_with_core(Version::new(1, 2, 0));

    // goals 无依赖，sgnb 依赖 goals
    reg.register(descriptor("goals")).await.unwrap();
    reg.register(descriptor("sgnb").with_dependency(DependencySpec::required("goals")))
        .await
        .unwrap();
    assert_eq!(reg.load_order().await, vec!["goals", "sgnb"]);

    // 卸载 goals：sgnb 保持注册，不级联卸载
    reg.unregister("goals").await.unwrap();
    assert!(!reg.contains("goals").await);
    assert_eq!(
        reg.get_module("sgnb").await.unwrap().state,
        ModuleState::Active
    );

    // 此后重载 sgnb 会重新校验依赖，必需依赖缺失导致失败
    let err = reg.reload("sgnb").await.unwrap_err();
    assert!(matches!(err, CoreError::DependencyNotFound { .. }));
}

#[tokio::test]
async fn compatibility_gate_scenario() {
    // ^1.0.0 对内核 1.2.0 兼容
    let reg = registry_with_core(Version::new(1, 2, 0));
    reg.register(descriptor("goals").with_compatible_range("^1.0.0"))
        .await
        .unwrap();
    assert!(reg.contains("goals").await);

    // 同一声明对内核 2.0.0 不兼容，注册被拒绝
    let reg = registry_with_core(Version::new(2, 0, 0));
    let err = reg
        .register(descriptor("goals").with_compatible_range("^1.0.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Incompatible { .. }));
    assert!(!reg.contains("goals").await);
    assert!(reg.list_modules().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn probe_error_on_third_tick_scenario() {
    let reg = registry_with_core(Version::new(1, 2, 0));

    let ticks = Arc::new(AtomicU64::new(0));
    let errors = Arc::new(AtomicU64::new(0));
    let ticks_clone = Arc::clone(&ticks);
    let errors_clone = Arc::clone(&errors);

    let hooks = ModuleHooks::new()
        .on_health_check(move || {
            let ticks = Arc::clone(&ticks_clone);
            async move {
                let n = ticks.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= 3 {
                    Err(anyhow::anyhow!("连接池耗尽"))
                } else {
                    Ok(true)
                }
            }
        })
        .on_error(move |_msg| {
            let errors = Arc::clone(&errors_clone);
            async move {
                errors.fetch_add(1, Ordering::SeqCst);
            }
        });

    let desc = descriptor("goals")
        .with_health_check(HealthCheckConfig {
            enabled: true,
            interval_secs: Some(10),
            timeout_ms: Some(1_000),
        })
        .with_hooks(hooks);
    reg.register(desc).await.unwrap();

    // 前两个周期探测通过
    tokio::time::sleep(Duration::from_secs(21)).await;
    tokio::task::yield_now().await;
    assert_eq!(
        reg.get_health("goals").await.unwrap().status,
        HealthState::Healthy
    );

    // 第三个周期探针报错
    tokio::time::sleep(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;

    let metric = reg.get_health("goals").await.unwrap();
    assert_eq!(metric.status, HealthState::Error);
    assert_eq!(metric.error_count, 1);
    assert_eq!(errors.load(Ordering::SeqCst), 1);

    // 探测故障不触发卸载
    assert_eq!(
        reg.get_module("goals").await.unwrap().state,
        ModuleState::Active
    );
}

#[tokio::test(start_paused = true)]
async fn probe_never_overlaps_for_same_module() {
    let reg = registry_with_core(Version::new(1, 2, 0));

    let in_flight = Arc::new(AtomicU64::new(0));
    let max_in_flight = Arc::new(AtomicU64::new(0));
    let in_flight_clone = Arc::clone(&in_flight);
    let max_clone = Arc::clone(&max_in_flight);

    // 探测耗时超过调度间隔
    let hooks = ModuleHooks::new().on_health_check(move || {
        let in_flight = Arc::clone(&in_flight_clone);
        let max = Arc::clone(&max_clone);
        async move {
            let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(25)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(true)
        }
    });

    let desc = descriptor("slow")
        .with_health_check(HealthCheckConfig {
            enabled: true,
            interval_secs: Some(10),
            timeout_ms: Some(60_000),
        })
        .with_hooks(hooks);
    reg.register(desc).await.unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;
    tokio::task::yield_now().await;

    // 同一模块的探测串行执行，从未并发
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn events_audit_full_lifecycle() {
    let reg = registry_with_core(Version::new(1, 2, 0));

    reg.register(descriptor("goals")).await.unwrap();
    reg.reload("goals").await.unwrap();
    reg.unregister("goals").await.unwrap();

    let events = reg.get_events(EventQuery::all().module("goals")).await;
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();

    // 从新到旧：unload, reload, load（重载期间）, unload（重载期间）, load
    assert_eq!(
        kinds,
        vec![
            EventKind::Unload,
            EventKind::Reload,
            EventKind::Load,
            EventKind::Unload,
            EventKind::Load,
        ]
    );
    assert!(events.iter().all(|e| e.success));

    // load 事件携带耗时
    let load = events.iter().find(|e| e.kind == EventKind::Load).unwrap();
    assert!(load.duration_ms.is_some());
}

#[tokio::test]
async fn disabled_module_remains_dependency_target() {
    let reg = registry_with_core(Version::new(1, 2, 0));
    reg.register(descriptor("profile")).await.unwrap();
    reg.toggle("profile").await.unwrap();

    // 禁用的模块仍在图中，依赖它的模块可以注册
    reg.register(descriptor("goals").with_dependency(DependencySpec::required("profile")))
        .await
        .unwrap();
    assert_eq!(reg.load_order().await, vec!["profile", "goals"]);
}
