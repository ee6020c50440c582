// ==========================================
// 工作量感知派单引擎 - 待办事项领域模型
// ==========================================
// 依据: 派单规则 - 待办批次快照
// 红线: 每个事项在一次运行内最多被指派一次
// ==========================================

use crate::domain::types::AssignmentSource;
use serde::{Deserialize, Serialize};

// ==========================================
// WorkItem - 待办事项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    // ===== 主键 =====
    pub item_id: String,

    // ===== 分区字段 =====
    pub region_tag: String, // 批次分组列原值
    pub urgent: bool,

    // ===== 指派结果 =====
    pub assigned_worker: Option<String>,
    pub source: Option<AssignmentSource>,

    // ===== 原始行（输出时原样还原）=====
    pub row_number: usize,
    pub values: Vec<String>,
}

impl WorkItem {
    pub fn new(item_id: impl Into<String>, region_tag: impl Into<String>, urgent: bool) -> Self {
        Self {
            item_id: item_id.into(),
            region_tag: region_tag.into(),
            urgent,
            assigned_worker: None,
            source: None,
            row_number: 0,
            values: Vec::new(),
        }
    }

    /// 是否已带有上游指定的人员
    pub fn is_preassigned(&self) -> bool {
        self.assigned_worker
            .as_deref()
            .map(|w| !w.trim().is_empty())
            .unwrap_or(false)
    }

    /// 盖章：写入指派人员，返回新事项
    pub fn stamped(mut self, alias: &str, source: AssignmentSource) -> Self {
        debug_assert!(
            self.source.is_none(),
            "事项 {} 已被指派过一次",
            self.item_id
        );
        self.assigned_worker = Some(alias.to_string());
        self.source = Some(source);
        self
    }

    /// 清除上游指定（始终重分配模式）
    pub fn cleared(mut self) -> Self {
        self.assigned_worker = None;
        self.source = None;
        self
    }
}

// ==========================================
// PendingBatch - 待办批次
// ==========================================
// headers 保留原表列顺序，供输出表复用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBatch {
    pub headers: Vec<String>,
    pub items: Vec<WorkItem>,
}

impl PendingBatch {
    pub fn new(headers: Vec<String>, items: Vec<WorkItem>) -> Self {
        Self { headers, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 按谓词拆成 (命中, 未命中) 两个批次，保持原顺序
    pub fn split_by<F>(self, predicate: F) -> (PendingBatch, PendingBatch)
    where
        F: Fn(&WorkItem) -> bool,
    {
        let (hit, rest): (Vec<WorkItem>, Vec<WorkItem>) =
            self.items.into_iter().partition(|item| predicate(item));
        (
            PendingBatch::new(self.headers.clone(), hit),
            PendingBatch::new(self.headers, rest),
        )
    }
}

/// 按事项 ID 排序（输出表的确定顺序）
pub fn sort_by_item_id(items: &mut [WorkItem]) {
    items.sort_by(|a, b| a.item_id.cmp(&b.item_id));
}
