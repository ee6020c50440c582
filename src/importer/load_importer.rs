// ==========================================
// 工作量感知派单引擎 - 当日负载快照导入
// ==========================================
// 输入: 当日派单清单（别名 / 是否紧急 / 创建时间）
// 输出: WorkerLoadSnapshot（按别名聚合）
// 规则:
// - 只统计创建日期 == 执行日期的行
// - 创建时间无法解析的行跳过（告警）
// - 无创建时间列 → 全部计入（告警）
// - 无紧急列 → 紧急数按 0 计
// - 文件缺失 → 全员负载为 0
// ==========================================

use crate::config::LoadColumns;
use crate::domain::worker::WorkerLoadSnapshot;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{RawTable, UniversalFileParser};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{info, warn};

pub const LOAD_TABLE: &str = "current_load";

pub struct LoadImporter {
    columns: LoadColumns,
    cleaner: DataCleaner,
}

/// 负载导入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadImportStats {
    pub counted_rows: usize,
    pub other_day_rows: usize,
    pub bad_date_rows: usize,
}

impl LoadImporter {
    pub fn new(columns: LoadColumns) -> Self {
        Self {
            columns,
            cleaner: DataCleaner,
        }
    }

    /// 从可选文件导入负载快照
    ///
    /// # 参数
    /// - path: 清单文件，None 表示无当日负载
    /// - execution_date: 执行日期
    pub fn import_optional<P: AsRef<Path>>(
        &self,
        path: Option<P>,
        execution_date: NaiveDate,
    ) -> ImportResult<WorkerLoadSnapshot> {
        let Some(path) = path else {
            info!("未提供当日负载清单，全员负载按 0 计");
            return Ok(WorkerLoadSnapshot::empty());
        };
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "当日负载清单不存在，全员负载按 0 计");
            return Ok(WorkerLoadSnapshot::empty());
        }

        let table = UniversalFileParser.parse(path, LOAD_TABLE)?;
        let (snapshot, stats) = self.from_table(&table, execution_date)?;
        info!(
            path = %path.display(),
            workers = snapshot.len(),
            counted = stats.counted_rows,
            other_day = stats.other_day_rows,
            bad_date = stats.bad_date_rows,
            "当日负载导入完成"
        );
        Ok(snapshot)
    }

    /// 从原始表聚合负载
    ///
    /// # 错误
    /// - MissingRequiredColumn: 缺少别名列
    pub fn from_table(
        &self,
        table: &RawTable,
        execution_date: NaiveDate,
    ) -> ImportResult<(WorkerLoadSnapshot, LoadImportStats)> {
        let alias_idx = table.require_column(&self.columns.alias)?;
        let urgent_idx = table.column_index(&self.columns.urgent);
        let created_idx = table.column_index(&self.columns.created);

        if urgent_idx.is_none() {
            warn!(column = %self.columns.urgent, "负载清单无紧急列，紧急数按 0 计");
        }
        if created_idx.is_none() {
            warn!(column = %self.columns.created, "负载清单无创建时间列，全部行计入当日负载");
        }

        let mut snapshot = WorkerLoadSnapshot::empty();
        let mut stats = LoadImportStats::default();

        for row in &table.rows {
            let Some(alias) = self.cleaner.normalize_null(Some(row.cell(alias_idx))) else {
                continue;
            };

            if let Some(idx) = created_idx {
                match self.cleaner.parse_date(row.cell(idx), &self.columns.created_formats) {
                    Some(date) if date == execution_date => {}
                    Some(_) => {
                        stats.other_day_rows += 1;
                        continue;
                    }
                    None => {
                        warn!(row = row.row_number, value = %row.cell(idx), "创建时间无法解析，跳过该行");
                        stats.bad_date_rows += 1;
                        continue;
                    }
                }
            }

            let urgent = row
                .optional_cell(urgent_idx)
                .map(|v| self.cleaner.is_yes(v))
                .unwrap_or(false);
            snapshot.record(&alias, urgent);
            stats.counted_rows += 1;
        }

        Ok((snapshot, stats))
    }
}

impl Default for LoadImporter {
    fn default() -> Self {
        Self::new(LoadColumns::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::RawRow;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            LOAD_TABLE,
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

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 26).unwrap()
    }

    #[test]
    fn test_only_execution_day_rows_count() {
        let t = table(
            &["Buyer Alias", "Urgent?", "Created"],
            &[
                &["ana", "Yes", "11/26/2025 8:15 AM"],
                &["ana", "No", "11/26/2025 1:40 PM"],
                &["ana", "Yes", "11/25/2025 4:00 PM"],
                &["bob", "", "bad date"],
                &["bob", "1", "11/26/2025"],
            ],
        );
        let (snapshot, stats) = LoadImporter::default().from_table(&t, day()).unwrap();

        assert_eq!(snapshot.get("ana").total_count, 2);
        assert_eq!(snapshot.get("ana").urgent_count, 1);
        assert_eq!(snapshot.get("bob").total_count, 1);
        assert_eq!(snapshot.get("bob").urgent_count, 1);
        assert_eq!(stats.other_day_rows, 1);
        assert_eq!(stats.bad_date_rows, 1);
        assert_eq!(stats.counted_rows, 3);
    }

    #[test]
    fn test_missing_optional_columns() {
        let t = table(&["Buyer Alias"], &[&["ana"], &["ana"], &[""]]);
        let (snapshot, _) = LoadImporter::default().from_table(&t, day()).unwrap();
        assert_eq!(snapshot.get("ana").total_count, 2);
        assert_eq!(snapshot.get("ana").urgent_count, 0);
    }

    #[test]
    fn test_absent_file_means_zero_load() {
        let importer = LoadImporter::default();
        let snapshot = importer.import_optional(None::<&Path>, day()).unwrap();
        assert!(snapshot.is_empty());

        let snapshot = importer
            .import_optional(Some(Path::new("no_such_dispatch_list.csv")), day())
            .unwrap();
        assert!(snapshot.is_empty());
    }
}
