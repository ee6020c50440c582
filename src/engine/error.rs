// ==========================================
// 工作量感知派单引擎 - 分配错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 分区内不存在部分成功；要么全部指派，要么整体失败
// ==========================================

use crate::domain::types::{FailureKind, PartitionKey};
use thiserror::Error;

/// 分配错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    /// 分区非空但筛选后无人可分
    #[error("分区 {partition} 无可用人员: {item_count} 个事项待分配，{reason}")]
    NoEligibleWorkers {
        partition: PartitionKey,
        item_count: usize,
        reason: String,
    },

    /// 可用人员容量全部为 0
    #[error("分区 {partition} 可用人员容量全部为 0 (人数 {worker_count})")]
    AllZeroCapacity {
        partition: PartitionKey,
        worker_count: usize,
    },

    /// 单个人员班次无法解析（非致命，只排除该人员）
    #[error("人员 {alias} 班次无法解析: '{raw}'")]
    UnparsableShift { alias: String, raw: String },
}

impl AllocationError {
    /// 失败类别
    pub fn kind(&self) -> FailureKind {
        match self {
            AllocationError::NoEligibleWorkers { .. } => FailureKind::BusinessRule,
            AllocationError::AllZeroCapacity { .. } => FailureKind::BusinessRule,
            AllocationError::UnparsableShift { .. } => FailureKind::UpstreamData,
        }
    }

    /// 出错分区（单人错误无分区）
    pub fn partition(&self) -> Option<&PartitionKey> {
        match self {
            AllocationError::NoEligibleWorkers { partition, .. }
            | AllocationError::AllZeroCapacity { partition, .. } => Some(partition),
            AllocationError::UnparsableShift { .. } => None,
        }
    }
}

/// Result 类型别名
pub type AllocationResult<T> = Result<T, AllocationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UrgencyClass;

    #[test]
    fn test_error_kind_and_partition() {
        let err = AllocationError::NoEligibleWorkers {
            partition: PartitionKey::new("NAM", UrgencyClass::Urgent),
            item_count: 3,
            reason: "无紧急资格人员在班".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::BusinessRule);
        assert_eq!(err.partition().map(|p| p.to_string()), Some("NAM/URGENT".to_string()));
        assert!(err.to_string().contains("NAM/URGENT"));

        let err = AllocationError::UnparsableShift {
            alias: "ana".to_string(),
            raw: "??".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::UpstreamData);
        assert!(err.partition().is_none());
    }
}
