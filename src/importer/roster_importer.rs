// ==========================================
// 工作量感知派单引擎 - 人员名册导入
// ==========================================
// 输入: 名册表（别名 / 类别 / 容量 / 班次 / 紧急资格）
// 输出: Worker 列表（负载为 0，由负载快照叠加）
// 规则: 别名为空的行跳过；同一类别内别名重复保留首行
// ==========================================

use crate::config::RosterColumns;
use crate::domain::worker::Worker;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{RawTable, UniversalFileParser};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

pub const ROSTER_TABLE: &str = "roster";

pub struct RosterImporter {
    columns: RosterColumns,
    cleaner: DataCleaner,
}

impl RosterImporter {
    pub fn new(columns: RosterColumns) -> Self {
        Self {
            columns,
            cleaner: DataCleaner,
        }
    }

    /// 从文件导入名册
    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> ImportResult<Vec<Worker>> {
        let table = UniversalFileParser.parse(path.as_ref(), ROSTER_TABLE)?;
        let workers = self.from_table(&table)?;
        info!(path = %path.as_ref().display(), workers = workers.len(), "名册导入完成");
        Ok(workers)
    }

    /// 从原始表构建人员列表
    ///
    /// # 错误
    /// - MissingRequiredColumn: 缺少别名/类别/容量/班次/紧急资格任一列
    pub fn from_table(&self, table: &RawTable) -> ImportResult<Vec<Worker>> {
        let c = &self.columns;
        let idx = table.require_columns(&[
            c.alias.as_str(),
            c.category.as_str(),
            c.capacity.as_str(),
            c.shift.as_str(),
            c.urgent_eligible.as_str(),
        ])?;
        let (alias_idx, category_idx, capacity_idx, shift_idx, urgent_idx) =
            (idx[0], idx[1], idx[2], idx[3], idx[4]);

        let mut seen = HashSet::new();
        let mut workers = Vec::with_capacity(table.len());

        for row in &table.rows {
            let Some(alias) = self.cleaner.normalize_null(Some(row.cell(alias_idx))) else {
                warn!(row = row.row_number, "名册行别名为空，跳过");
                continue;
            };
            let category = self.cleaner.clean_text(row.cell(category_idx), false);

            if !seen.insert((category.to_uppercase(), alias.clone())) {
                warn!(row = row.row_number, alias = %alias, category = %category, "名册别名重复，保留首行");
                continue;
            }

            let mut worker = Worker::new(alias, category);
            worker.capacity_raw = self.cleaner.normalize_null(Some(row.cell(capacity_idx)));
            worker.shift_raw = self.cleaner.normalize_null(Some(row.cell(shift_idx)));
            worker.urgent_eligible = self.cleaner.is_yes(row.cell(urgent_idx));
            workers.push(worker);
        }

        Ok(workers)
    }
}

impl Default for RosterImporter {
    fn default() -> Self {
        Self::new(RosterColumns::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::ImportError;
    use crate::importer::file_parser::RawRow;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            ROSTER_TABLE,
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

    const HEADERS: &[&str] = &[
        "Buyer Alias",
        "Sub-Category",
        "Workload / Availability",
        "Shift",
        "Available For Urgencies",
    ];

    #[test]
    fn test_from_table_builds_workers() {
        let t = table(
            HEADERS,
            &[
                &["ana", "CAM IND NAM", "100%", "7 to 5", "Yes"],
                &["bob", "CAM IND LAM", "", "", "no"],
                &["", "CAM IND LAM", "50%", "9 to 7", "Yes"],
            ],
        );
        let workers = RosterImporter::default().from_table(&t).unwrap();

        assert_eq!(workers.len(), 2);
        assert_eq!(workers[0].alias, "ana");
        assert_eq!(workers[0].capacity_raw.as_deref(), Some("100%"));
        assert!(workers[0].urgent_eligible);
        assert_eq!(workers[1].shift_raw, None);
        assert!(!workers[1].urgent_eligible);
    }

    #[test]
    fn test_duplicate_alias_keeps_first_row() {
        let t = table(
            HEADERS,
            &[
                &["ana", "CAM IND NAM", "100%", "7 to 5", "Yes"],
                &["ana", "cam ind nam", "10%", "9 to 7", "No"],
                &["ana", "CAM IND LAM", "10%", "9 to 7", "No"],
            ],
        );
        let workers = RosterImporter::default().from_table(&t).unwrap();
        assert_eq!(workers.len(), 2);
        assert_eq!(workers[0].capacity_raw.as_deref(), Some("100%"));
        assert_eq!(workers[1].region, "CAM IND LAM");
    }

    #[test]
    fn test_missing_shift_column_is_fatal() {
        let t = table(
            &["Buyer Alias", "Sub-Category", "Workload / Availability", "Available For Urgencies"],
            &[],
        );
        let err = RosterImporter::default().from_table(&t).unwrap_err();
        assert!(matches!(
            err,
            ImportError::MissingRequiredColumn { ref column, .. } if column == "Shift"
        ));
    }
}
