// ==========================================
// 工作量感知派单引擎 - 待办批次导入
// ==========================================
// 输入: 待办批次表（ID / 分组 / URGENT / 可选人员列）
// 输出: PendingBatch（保留原列顺序与原始行值）
// 红线: 事项 ID 在批次内唯一；重复即整个运行失败
// ==========================================

use crate::config::BatchColumns;
use crate::domain::work_item::{PendingBatch, WorkItem};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawTable, UniversalFileParser};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub const BATCH_TABLE: &str = "pending_batch";

pub struct BatchImporter {
    columns: BatchColumns,
    cleaner: DataCleaner,
}

impl BatchImporter {
    pub fn new(columns: BatchColumns) -> Self {
        Self {
            columns,
            cleaner: DataCleaner,
        }
    }

    /// 从文件导入待办批次
    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> ImportResult<PendingBatch> {
        let table = UniversalFileParser.parse(path.as_ref(), BATCH_TABLE)?;
        let batch = self.from_table(&table)?;
        info!(
            path = %path.as_ref().display(),
            items = batch.len(),
            urgent = batch.items.iter().filter(|i| i.urgent).count(),
            "待办批次导入完成"
        );
        Ok(batch)
    }

    /// 从原始表构建批次
    ///
    /// # 错误
    /// - MissingRequiredColumn: 缺少 ID / 分组 / URGENT 列
    /// - PrimaryKeyMissing: ID 为空
    /// - DuplicateKey: ID 重复
    /// - InvalidValue: URGENT 取值无法识别
    pub fn from_table(&self, table: &RawTable) -> ImportResult<PendingBatch> {
        let c = &self.columns;
        let idx = table.require_columns(&[c.item_id.as_str(), c.group.as_str(), c.urgent.as_str()])?;
        let (id_idx, group_idx, urgent_idx) = (idx[0], idx[1], idx[2]);
        let worker_idx = table.column_index(&c.worker);

        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut items = Vec::with_capacity(table.len());

        for row in &table.rows {
            let item_id = self.cleaner.clean_text(row.cell(id_idx), false);
            if item_id.is_empty() {
                return Err(ImportError::PrimaryKeyMissing {
                    table: table.name.clone(),
                    row: row.row_number,
                });
            }
            if first_seen.insert(item_id.clone(), row.row_number).is_some() {
                return Err(ImportError::DuplicateKey {
                    table: table.name.clone(),
                    row: row.row_number,
                    key: item_id,
                });
            }

            let raw_urgent = row.cell(urgent_idx);
            let urgent = self
                .cleaner
                .parse_flag(raw_urgent)
                .ok_or_else(|| ImportError::InvalidValue {
                    table: table.name.clone(),
                    row: row.row_number,
                    field: c.urgent.clone(),
                    value: raw_urgent.to_string(),
                })?;

            let mut values = row.values.clone();
            values.resize(table.headers.len().max(values.len()), String::new());

            let mut item = WorkItem::new(item_id, self.cleaner.clean_text(row.cell(group_idx), false), urgent);
            item.assigned_worker = self.cleaner.normalize_null(row.optional_cell(worker_idx));
            item.row_number = row.row_number;
            item.values = values;
            items.push(item);
        }

        Ok(PendingBatch::new(table.headers.clone(), items))
    }
}

impl Default for BatchImporter {
    fn default() -> Self {
        Self::new(BatchColumns::default())
    }
}

/// 拆出特殊事项（ID 命中保留模式，不参与分配）
///
/// # 返回
/// (特殊事项, 常规批次)，两者都保持原顺序
pub fn split_special(batch: PendingBatch, pattern: &Regex) -> (Vec<WorkItem>, PendingBatch) {
    let (special, regular) = batch.split_by(|item| pattern.is_match(&item.item_id));
    if !special.is_empty() {
        info!(count = special.len(), pattern = %pattern, "特殊事项已拆出");
    }
    (special.items, regular)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::RawRow;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            BATCH_TABLE,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .enumerate()
                .map(|(i, r)| RawRow {
                    row_number: i + 2,
                    values: r.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_from_table_parses_items() {
        let t = table(
            &["ID", "Assignment Group", "URGENT", "BUYER", "Notes"],
            &[
                &["PR100", " CAMERON NAM ", "1", "", "first"],
                &["PR101", "CAMERON LAM", "0.0", "zed"],
                &["PR102", "CAMERON LAM", "true", " ", "x"],
            ],
        );
        let batch = BatchImporter::default().from_table(&t).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.items[0].region_tag, "CAMERON NAM");
        assert!(batch.items[0].urgent);
        assert!(!batch.items[1].urgent);
        assert!(batch.items[2].urgent);
        assert_eq!(batch.items[1].assigned_worker.as_deref(), Some("zed"));
        assert_eq!(batch.items[2].assigned_worker, None);
        // 短行补齐到表头长度
        assert_eq!(batch.items[1].values.len(), 5);
    }

    #[test]
    fn test_duplicate_id_is_error() {
        let t = table(
            &["ID", "Assignment Group", "URGENT"],
            &[&["PR1", "CAMERON NAM", "0"], &["PR1", "CAMERON NAM", "1"]],
        );
        let err = BatchImporter::default().from_table(&t).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateKey { row: 3, .. }));
    }

    #[test]
    fn test_invalid_urgent_flag_is_error() {
        let t = table(&["ID", "Assignment Group", "URGENT"], &[&["PR1", "CAMERON NAM", "soon"]]);
        let err = BatchImporter::default().from_table(&t).unwrap_err();
        assert!(matches!(err, ImportError::InvalidValue { ref value, .. } if value == "soon"));
    }

    #[test]
    fn test_missing_group_column_is_fatal() {
        let t = table(&["ID", "URGENT"], &[&["PR1", "0"]]);
        let err = BatchImporter::default().from_table(&t).unwrap_err();
        assert!(matches!(err, ImportError::MissingRequiredColumn { .. }));
    }

    #[test]
    fn test_split_special_by_revision_suffix() {
        let t = table(
            &["ID", "Assignment Group", "URGENT"],
            &[
                &["PR1", "CAMERON NAM", "0"],
                &["PR2-V2", "CAMERON NAM", "1"],
                &["PR3-v10", "CAMERON LAM", "0"],
                &["PR4-VX", "CAMERON LAM", "0"],
            ],
        );
        let batch = BatchImporter::default().from_table(&t).unwrap();
        let pattern = Regex::new(r"(?i)-V\d+$").unwrap();

        let (special, regular) = split_special(batch, &pattern);
        let ids: Vec<_> = special.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["PR2-V2", "PR3-v10"]);
        assert_eq!(regular.len(), 2);
    }
}
