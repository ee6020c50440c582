// ==========================================
// 工作量感知派单引擎 - 领域类型定义
// ==========================================
// 依据: 派单规则 - 区域 × 紧急度分区
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 紧急度分类 (Urgency Class)
// ==========================================
// 红线: 紧急分区只能分给具备紧急资格的人员
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyClass {
    Urgent, // 紧急
    Normal, // 普通
}

impl UrgencyClass {
    /// 由事项的紧急标志推导分类
    pub fn of(urgent: bool) -> Self {
        if urgent {
            UrgencyClass::Urgent
        } else {
            UrgencyClass::Normal
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, UrgencyClass::Urgent)
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            UrgencyClass::Urgent => "URGENT",
            UrgencyClass::Normal => "NORMAL",
        }
    }
}

impl fmt::Display for UrgencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 分区键 (Partition Key)
// ==========================================
// 一个分区 = 同一区域 + 同一紧急度，独立分配
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub region: String,
    pub class: UrgencyClass,
}

impl PartitionKey {
    pub fn new(region: impl Into<String>, class: UrgencyClass) -> Self {
        Self {
            region: region.into(),
            class,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.class)
    }
}

// ==========================================
// 区域定义 (Region Spec)
// ==========================================
// 用途: 把待办批次的分组列值、人员名册的类别列值映射到同一个区域代码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub code: String,            // 区域代码 (如 NAM)
    pub batch_group: String,     // 待办批次中的分组值 (如 CAMERON NAM)
    pub roster_category: String, // 人员名册中的类别值 (如 CAM IND NAM)
}

impl RegionSpec {
    pub fn new(
        code: impl Into<String>,
        batch_group: impl Into<String>,
        roster_category: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            batch_group: batch_group.into(),
            roster_category: roster_category.into(),
        }
    }

    /// 待办事项的分组值是否属于本区域（忽略首尾空白与大小写）
    pub fn matches_batch_group(&self, value: &str) -> bool {
        normalize_tag(value) == normalize_tag(&self.batch_group)
    }

    /// 人员的类别值是否属于本区域（忽略首尾空白与大小写）
    pub fn matches_roster_category(&self, value: &str) -> bool {
        normalize_tag(value) == normalize_tag(&self.roster_category)
    }
}

fn normalize_tag(value: &str) -> String {
    value.trim().to_uppercase()
}

// ==========================================
// 分配来源 (Assignment Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentSource {
    Allocated,   // 本次按配额分配
    Preassigned, // 上游已指定，原样透传
}

impl AssignmentSource {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AssignmentSource::Allocated => "ALLOCATED",
            AssignmentSource::Preassigned => "PREASSIGNED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PREASSIGNED" => AssignmentSource::Preassigned,
            _ => AssignmentSource::Allocated,
        }
    }
}

impl fmt::Display for AssignmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 失败类别 (Failure Kind)
// ==========================================
// 用途: 调用方区分"上游数据问题(可重跑)"与"业务规则违反"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    UpstreamData, // 上游快照缺列/格式错，修正数据后可重跑
    BusinessRule, // 规则层面无法满足（无人可分等）
}

impl FailureKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            FailureKind::UpstreamData => "UPSTREAM_DATA",
            FailureKind::BusinessRule => "BUSINESS_RULE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UPSTREAM_DATA" => Some(FailureKind::UpstreamData),
            "BUSINESS_RULE" => Some(FailureKind::BusinessRule),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_key_display() {
        let key = PartitionKey::new("NAM", UrgencyClass::Urgent);
        assert_eq!(key.to_string(), "NAM/URGENT");
    }

    #[test]
    fn test_region_spec_matching_ignores_case_and_padding() {
        let region = RegionSpec::new("LAM", "CAMERON LAM", "CAM IND LAM");
        assert!(region.matches_batch_group("  cameron lam "));
        assert!(region.matches_roster_category("CAM IND LAM"));
        assert!(!region.matches_batch_group("CAMERON NAM"));
    }

    #[test]
    fn test_assignment_source_db_roundtrip() {
        assert_eq!(
            AssignmentSource::from_str(AssignmentSource::Preassigned.to_db_str()),
            AssignmentSource::Preassigned
        );
        assert_eq!(AssignmentSource::from_str("whatever"), AssignmentSource::Allocated);
    }
}
