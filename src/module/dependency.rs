//! 模块依赖图
//!
//! 维护模块键之间的依赖邻接关系，提供环检测和拓扑排序。
//! 采用 BTreeMap 保证遍历顺序确定，从而得到稳定的加载顺序。

use crate::utils::{CoreError, Result};
use std::collections::BTreeMap;

/// DFS 着色标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// 未访问
    White,
    /// 访问中（在当前 DFS 栈上）
    Gray,
    /// 已完成
    Black,
}

/// 模块依赖图
///
/// 节点为模块键，边由模块指向其依赖。
/// 指向图中不存在节点的边在遍历时被跳过（可选依赖缺失的场景）。
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// 邻接表：模块键 -> 依赖的模块键列表
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// 创建空依赖图
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或更新节点及其依赖边
    pub fn upsert(&mut self, key: impl Into<String>, dependencies: Vec<String>) {
        self.edges.insert(key.into(), dependencies);
    }

    /// 移除节点
    ///
    /// 指向该节点的残留边在遍历时自然跳过，无需逐一清理。
    pub fn remove(&mut self, key: &str) -> bool {
        self.edges.remove(key).is_some()
    }

    /// 判断节点是否存在
    pub fn contains(&self, key: &str) -> bool {
        self.edges.contains_key(key)
    }

    /// 节点数量
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// 图是否为空
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 获取模块声明的依赖（仅返回图中存在的）
    pub fn dependencies_of(&self, key: &str) -> Vec<String> {
        self.edges
            .get(key)
            .map(|deps| {
                deps.iter()
                    .filter(|d| self.edges.contains_key(*d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 获取直接依赖指定模块的所有模块（反向边）
    pub fn dependents_of(&self, key: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.iter().any(|d| d == key))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// 计算拓扑加载顺序（依赖在前，被依赖者在后）
    ///
    /// 使用三色标记 DFS。检测到环时返回 `CircularDependency`，
    /// 错误信息中包含完整的环路径。
    pub fn compute_order(&self) -> Result<Vec<String>> {
        let mut colors: BTreeMap<&str, Color> =
            self.edges.keys().map(|k| (k.as_str(), Color::White)).collect();
        let mut order = Vec::with_capacity(self.edges.len());
        let mut stack = Vec::new();

        for key in self.edges.keys() {
            if colors[key.as_str()] == Color::White {
                self.visit(key, &mut colors, &mut stack, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        key: &'a str,
        colors: &mut BTreeMap<&'a str, Color>,
        stack: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        colors.insert(key, Color::Gray);
        stack.push(key);

        if let Some(deps) = self.edges.get(key) {
            for dep in deps {
                match colors.get(dep.as_str()) {
                    // 指向不存在节点的边，跳过
                    None => continue,
                    Some(Color::Black) => continue,
                    Some(Color::Gray) => {
                        return Err(CoreError::CircularDependency(Self::cycle_path(
                            stack, dep,
                        )));
                    }
                    Some(Color::White) => {
                        self.visit(dep, colors, stack, order)?;
                    }
                }
            }
        }

        stack.pop();
        colors.insert(key, Color::Black);
        order.push(key.to_string());
        Ok(())
    }

    /// 从 DFS 栈中截取环路径，格式 "a -> b -> c -> a"
    fn cycle_path(stack: &[&str], repeated: &str) -> String {
        let start = stack
            .iter()
            .position(|k| *k == repeated)
            .unwrap_or_default();
        let mut path: Vec<&str> = stack[start..].to_vec();
        path.push(repeated);
        path.join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_respects_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.upsert("goals", vec!["profile".to_string()]);
        graph.upsert("profile", vec![]);
        graph.upsert("sgnb", vec!["goals".to_string(), "profile".to_string()]);

        let order = graph.compute_order().unwrap();
        let pos = |k: &str| order.iter().position(|x| x == k).unwrap();
        assert!(pos("profile") < pos("goals"));
        assert!(pos("goals") < pos("sgnb"));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_order_is_deterministic() {
        let mut graph = DependencyGraph::new();
        graph.upsert("c", vec![]);
        graph.upsert("a", vec![]);
        graph.upsert("b", vec![]);

        // 无依赖约束时按键名字典序
        assert_eq!(graph.compute_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_detected_with_path() {
        let mut graph = DependencyGraph::new();
        graph.upsert("a", vec!["b".to_string()]);
        graph.upsert("b", vec!["c".to_string()]);
        graph.upsert("c", vec!["a".to_string()]);

        let err = graph.compute_order().unwrap_err();
        match err {
            CoreError::CircularDependency(path) => {
                assert!(path.contains("a -> b -> c -> a") || path.contains("->"));
                // 环路径首尾闭合
                let parts: Vec<&str> = path.split(" -> ").collect();
                assert_eq!(parts.first(), parts.last());
            }
            other => panic!("期望 CircularDependency，得到 {:?}", other),
        }
    }

    #[test]
    fn test_self_cycle() {
        let mut graph = DependencyGraph::new();
        graph.upsert("a", vec!["a".to_string()]);
        assert!(matches!(
            graph.compute_order(),
            Err(CoreError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_edges_to_absent_nodes_skipped() {
        let mut graph = DependencyGraph::new();
        graph.upsert("goals", vec!["missing".to_string()]);

        let order = graph.compute_order().unwrap();
        assert_eq!(order, vec!["goals"]);
        assert!(graph.dependencies_of("goals").is_empty());
    }

    #[test]
    fn test_dependents_of() {
        let mut graph = DependencyGraph::new();
        graph.upsert("profile", vec![]);
        graph.upsert("goals", vec!["profile".to_string()]);
        graph.upsert("sgnb", vec!["profile".to_string()]);

        let mut dependents = graph.dependents_of("profile");
        dependents.sort();
        assert_eq!(dependents, vec!["goals", "sgnb"]);
    }

    #[test]
    fn test_remove_node() {
        let mut graph = DependencyGraph::new();
        graph.upsert("goals", vec!["profile".to_string()]);
        graph.upsert("profile", vec![]);

        assert!(graph.remove("profile"));
        assert!(!graph.remove("profile"));
        // 残留边被跳过
        assert_eq!(graph.compute_order().unwrap(), vec!["goals"]);
    }
}
