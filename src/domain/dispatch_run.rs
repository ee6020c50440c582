// ==========================================
// 工作量感知派单引擎 - 派单运行台账领域模型
// ==========================================
// 用途: 审计追踪 + 同快照重跑比对
// 对齐: db.rs 中 dispatch_run / dispatch_region_result / dispatch_assignment 表
// ==========================================

use crate::domain::types::{AssignmentSource, FailureKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// RunStatus - 运行状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Succeeded, // 全部区域成功
    Partial,   // 部分区域失败
    Failed,    // 全部区域失败
}

impl RunStatus {
    /// 由区域成功/失败数推导
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => RunStatus::Succeeded,
            (0, _) => RunStatus::Failed,
            _ => RunStatus::Partial,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Partial => "PARTIAL",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "SUCCEEDED" => RunStatus::Succeeded,
            "PARTIAL" => RunStatus::Partial,
            _ => RunStatus::Failed,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// DispatchRun - 一次派单运行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRun {
    pub run_id: String,
    pub executed_at: NaiveDateTime, // 分配使用的执行时刻
    pub recorded_at: NaiveDateTime, // 写台账时刻
    pub status: RunStatus,
    pub item_count: usize,      // 参与分区的事项数
    pub special_count: usize,   // 特殊事项（不参与分配）
    pub unrouted_count: usize,  // 未匹配区域的事项
    pub config_snapshot_json: Option<String>,
    pub source_files: Option<String>,
}

// ==========================================
// RegionRunRecord - 单区域结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRunRecord {
    pub run_id: String,
    pub region: String,
    pub succeeded: bool,
    pub allocated_count: usize,
    pub preassigned_count: usize,
    pub failure_kind: Option<FailureKind>,
    pub error_message: Option<String>,
}

// ==========================================
// AssignmentRecord - 单事项指派
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub run_id: String,
    pub item_id: String,
    pub region: String,
    pub urgent: bool,
    pub worker: String,
    pub source: AssignmentSource,
}
