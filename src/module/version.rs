//! 版本门禁
//!
//! 在模块注册前检查其声明的兼容内核版本范围。
//! 范围表达式无法解析或缺失时仅记录告警（宽容处理），
//! 能解析但不匹配当前内核版本时判定为不兼容。

use crate::module::descriptor::ModuleDescriptor;
use semver::{Version, VersionReq};

/// 兼容性检查报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatReport {
    /// 是否兼容（允许继续注册）
    pub compatible: bool,
    /// 检查过程中发现的问题描述
    pub issues: Vec<String>,
}

/// 检查模块声明与内核版本的匹配（纯函数，结果确定）
///
/// - 未声明模块版本：记录非致命问题，视为兼容
/// - 未声明兼容范围：记录非致命问题，视为兼容
/// - 范围无法解析：记录非致命问题，视为兼容
/// - 范围可解析但不匹配：不兼容（致命）
pub fn check_compatibility(
    core_version: &Version,
    module_version: Option<&Version>,
    range: Option<&str>,
) -> CompatReport {
    let mut issues = Vec::new();

    if module_version.is_none() {
        issues.push("模块未声明自身版本".to_string());
    }

    let range = match range {
        Some(range) => range,
        None => {
            issues.push("未声明兼容的内核版本范围".to_string());
            return CompatReport {
                compatible: true,
                issues,
            };
        }
    };

    let compatible = match VersionReq::parse(range) {
        Ok(req) => {
            if req.matches(core_version) {
                true
            } else {
                issues.push(format!("要求内核版本 '{}'，当前为 {}", range, core_version));
                false
            }
        }
        Err(e) => {
            issues.push(format!(
                "兼容范围 '{}' 无法解析（{}），已跳过版本检查",
                range, e
            ));
            true
        }
    };

    CompatReport { compatible, issues }
}

/// 版本门禁
///
/// 持有当前内核版本，对模块描述符执行兼容性判定。
#[derive(Debug, Clone)]
pub struct VersionGate {
    core_version: Version,
}

impl VersionGate {
    /// 创建版本门禁
    pub fn new(core_version: Version) -> Self {
        Self { core_version }
    }

    /// 当前内核版本
    pub fn core_version(&self) -> &Version {
        &self.core_version
    }

    /// 检查模块描述符与内核版本的兼容性
    pub fn check(&self, descriptor: &ModuleDescriptor) -> CompatReport {
        check_compatibility(
            &self.core_version,
            descriptor.version.as_ref(),
            descriptor.compatible_range.as_deref(),
        )
    }
}
