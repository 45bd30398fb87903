//! 依赖图与版本门禁的性质测试

use coach_core::module::{check_compatibility, DependencyGraph};
use coach_core::CoreError;
use proptest::prelude::*;
use semver::{Version, VersionReq};
use std::collections::HashMap;

/// 生成保证无环的依赖集：节点 i 只允许依赖下标更小的节点
fn acyclic_deps() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..100, 0..4), 1..12).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, deps)| {
                if i == 0 {
                    Vec::new()
                } else {
                    let mut deps: Vec<usize> = deps.into_iter().map(|d| d % i).collect();
                    deps.sort_unstable();
                    deps.dedup();
                    deps
                }
            })
            .collect()
    })
}

fn key(i: usize) -> String {
    format!("module-{}", i)
}

proptest! {
    #[test]
    fn compute_order_is_valid_permutation(deps in acyclic_deps()) {
        let mut graph = DependencyGraph::new();
        for (i, dep_indices) in deps.iter().enumerate() {
            graph.upsert(key(i), dep_indices.iter().map(|d| key(*d)).collect());
        }

        let order = graph.compute_order().unwrap();

        // 结果是所有节点的一个排列
        prop_assert_eq!(order.len(), deps.len());
        let positions: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(pos, k)| (k.as_str(), pos))
            .collect();
        prop_assert_eq!(positions.len(), deps.len());

        // 每个依赖都在其依赖方之前
        for (i, dep_indices) in deps.iter().enumerate() {
            let my_pos = positions[key(i).as_str()];
            for d in dep_indices {
                prop_assert!(positions[key(*d).as_str()] < my_pos);
            }
        }
    }

    #[test]
    fn two_node_cycle_always_detected(extra in acyclic_deps()) {
        let mut graph = DependencyGraph::new();
        for (i, dep_indices) in extra.iter().enumerate() {
            graph.upsert(key(i), dep_indices.iter().map(|d| key(*d)).collect());
        }
        // 叠加一个双节点环
        graph.upsert("cycle-a", vec!["cycle-b".to_string()]);
        graph.upsert("cycle-b", vec!["cycle-a".to_string()]);

        prop_assert!(matches!(
            graph.compute_order(),
            Err(CoreError::CircularDependency(_))
        ));
    }

    #[test]
    fn compatibility_matches_semver_semantics(
        core in (0u64..8, 0u64..8, 0u64..8),
        range in (0u64..8, 0u64..8, 0u64..8),
    ) {
        let core = Version::new(core.0, core.1, core.2);
        let range = format!("^{}.{}.{}", range.0, range.1, range.2);
        let req = VersionReq::parse(&range).unwrap();

        let module_v = Version::new(1, 0, 0);
        let report = check_compatibility(&core, Some(&module_v), Some(&range));
        prop_assert_eq!(report.compatible, req.matches(&core));
        // 不兼容时必须携带致命问题说明
        if !report.compatible {
            prop_assert!(!report.issues.is_empty());
        }
    }

    #[test]
    fn compatibility_is_deterministic(
        core in (0u64..8, 0u64..8, 0u64..8),
        range in "[a-z0-9.^~ ]{0,12}",
    ) {
        let core = Version::new(core.0, core.1, core.2);
        let first = check_compatibility(&core, None, Some(&range));
        let second = check_compatibility(&core, None, Some(&range));
        prop_assert_eq!(first.compatible, second.compatible);
        prop_assert_eq!(first.issues, second.issues);
    }
}
