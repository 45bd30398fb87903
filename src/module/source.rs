//! 模块描述符来源
//!
//! 抽象模块描述符的获取途径：从目录扫描描述文件，
//! 或由代码直接提供（内置模块、测试场景）。

use crate::module::descriptor::ModuleDescriptor;
use crate::utils::{CoreError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 模块描述符来源
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// 加载全部可用的模块描述符
    async fn load(&self) -> Result<Vec<ModuleDescriptor>>;
}

// ============================================================================
// 文件来源
// ============================================================================

/// 从目录扫描模块描述文件的来源
///
/// 识别 `*.module.json` 与 `*.module.yaml`（含 `.yml`）文件。
/// 单个文件解析失败仅告警跳过，不影响其它文件。
pub struct FileModuleSource {
    dirs: Vec<PathBuf>,
}

impl FileModuleSource {
    /// 创建文件来源
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// 判断文件名是否为模块描述文件
    fn is_descriptor_file(path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        name.ends_with(".module.json")
            || name.ends_with(".module.yaml")
            || name.ends_with(".module.yml")
    }

    /// 解析单个描述文件
    async fn parse_file(path: &Path) -> Result<ModuleDescriptor> {
        let content = tokio::fs::read_to_string(path).await?;
        let descriptor: ModuleDescriptor = if path
            .to_str()
            .map_or(false, |p| p.ends_with(".json"))
        {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

#[async_trait]
impl ModuleSource for FileModuleSource {
    async fn load(&self) -> Result<Vec<ModuleDescriptor>> {
        let mut descriptors = Vec::new();

        for dir in &self.dirs {
            if !dir.exists() {
                warn!(dir = %dir.display(), "模块目录不存在，跳过");
                continue;
            }

            let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
                CoreError::ConfigLoadFailed(format!(
                    "扫描模块目录 {} 失败: {}",
                    dir.display(),
                    e
                ))
            })?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if !Self::is_descriptor_file(&path) {
                    continue;
                }

                match Self::parse_file(&path).await {
                    Ok(descriptor) => {
                        debug!(
                            module_key = %descriptor.key,
                            file = %path.display(),
                            "扫描到模块描述文件"
                        );
                        descriptors.push(descriptor);
                    }
                    Err(e) => {
                        warn!(
                            file = %path.display(),
                            error_msg = %e,
                            "模块描述文件解析失败，跳过"
                        );
                    }
                }
            }
        }

        Ok(descriptors)
    }
}

// ============================================================================
// 静态来源
// ============================================================================

/// 由代码直接提供描述符的来源
pub struct StaticModuleSource {
    descriptors: Vec<ModuleDescriptor>,
}

impl StaticModuleSource {
    /// 创建静态来源
    pub fn new(descriptors: Vec<ModuleDescriptor>) -> Self {
        Self { descriptors }
    }
}

#[async_trait]
impl ModuleSource for StaticModuleSource {
    async fn load(&self) -> Result<Vec<ModuleDescriptor>> {
        Ok(self.descriptors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use std::io::Write;

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticModuleSource::new(vec![ModuleDescriptor::new(
            "goals",
            "目标管理",
            Version::new(1, 0, 0),
        )]);
        let descriptors = source.load().await.unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].key, "goals");
    }

    #[tokio::test]
    async fn test_file_source_scans_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();

        let mut json_file = std::fs::File::create(dir.path().join("goals.module.json")).unwrap();
        writeln!(
            json_file,
            r#"{{"key": "goals", "name": "目标管理", "version": "1.0.0"}}"#
        )
        .unwrap();

        let mut yaml_file = std::fs::File::create(dir.path().join("sgnb.module.yaml")).unwrap();
        writeln!(
            yaml_file,
            "key: sgnb\nname: 小组课\nversion: \"2.1.0\"\ndependencies:\n  - module_key: goals"
        )
        .unwrap();

        // 非描述文件不应被识别
        std::fs::File::create(dir.path().join("readme.txt")).unwrap();

        let source = FileModuleSource::new(vec![dir.path().to_path_buf()]);
        let mut descriptors = source.load().await.unwrap();
        descriptors.sort_by(|a, b| a.key.cmp(&b.key));

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].key, "goals");
        assert_eq!(descriptors[1].key, "sgnb");
        assert_eq!(descriptors[1].dependencies[0].module_key, "goals");
    }

    #[tokio::test]
    async fn test_file_source_skips_invalid_file() {
        let dir = tempfile::tempdir().unwrap();

        let mut bad = std::fs::File::create(dir.path().join("bad.module.json")).unwrap();
        writeln!(bad, "{{ 不是合法的 JSON").unwrap();

        let mut good = std::fs::File::create(dir.path().join("ok.module.json")).unwrap();
        writeln!(
            good,
            r#"{{"key": "ok", "name": "正常模块", "version": "1.0.0"}}"#
        )
        .unwrap();

        let source = FileModuleSource::new(vec![dir.path().to_path_buf()]);
        let descriptors = source.load().await.unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].key, "ok");
    }

    #[tokio::test]
    async fn test_file_source_missing_dir_skipped() {
        let source = FileModuleSource::new(vec![PathBuf::from("/nonexistent/modules")]);
        let descriptors = source.load().await.unwrap();
        assert!(descriptors.is_empty());
    }
}
