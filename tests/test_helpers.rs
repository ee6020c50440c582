// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的台账库初始化、CSV 快照生成、人员/事项构建
// ==========================================
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use csv::Writer;
use std::error::Error;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use workload_dispatch::db::open_ledger_connection;
use workload_dispatch::domain::{WorkItem, Worker};

pub const NAM_GROUP: &str = "CAMERON NAM";
pub const NAM_CATEGORY: &str = "CAM IND NAM";
pub const LAM_GROUP: &str = "CAMERON LAM";
pub const LAM_CATEGORY: &str = "CAM IND LAM";

pub const ROSTER_HEADERS: &[&str] = &[
    "Buyer Alias",
    "Sub-Category",
    "Workload / Availability",
    "Shift",
    "Available For Urgencies",
];
pub const LOAD_HEADERS: &[&str] = &["Buyer Alias", "Urgent?", "Created"];
pub const BATCH_HEADERS: &[&str] = &["ID", "Assignment Group", "URGENT", "BUYER", "Notes"];

/// 创建临时台账库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("临时路径非 UTF-8")?.to_string();
    open_ledger_connection(&db_path)?;
    Ok((temp_file, db_path))
}

/// 写一张 CSV 快照
pub fn write_csv(dir: &Path, file_name: &str, headers: &[&str], rows: &[Vec<String>]) -> PathBuf {
    let path = dir.join(file_name);
    let mut wtr = Writer::from_path(&path).unwrap();
    wtr.write_record(headers).unwrap();
    for row in rows {
        wtr.write_record(row).unwrap();
    }
    wtr.flush().unwrap();
    path
}

/// 读回 CSV（表头 + 行）
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers = rdr.headers().unwrap().iter().map(|h| h.to_string()).collect();
    let rows = rdr
        .records()
        .map(|r| r.unwrap().iter().map(|v| v.to_string()).collect())
        .collect();
    (headers, rows)
}

pub fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// 固定执行日期 2025-11-26 的某个时刻
pub fn exec_at(hour: u32, minute: u32) -> NaiveDateTime {
    exec_date().and_hms_opt(hour, minute, 0).unwrap()
}

pub fn exec_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 26).unwrap()
}

// ==========================================
// Worker 构建器
// ==========================================

pub struct WorkerBuilder {
    worker: Worker,
}

impl WorkerBuilder {
    pub fn new(alias: &str, category: &str) -> Self {
        let mut worker = Worker::new(alias, category);
        worker.capacity_raw = Some("100%".to_string());
        worker.shift_raw = Some("7 to 5".to_string());
        Self { worker }
    }

    pub fn capacity(mut self, raw: &str) -> Self {
        self.worker.capacity_raw = Some(raw.to_string());
        self
    }

    pub fn shift(mut self, raw: &str) -> Self {
        self.worker.shift_raw = Some(raw.to_string());
        self
    }

    pub fn no_shift(mut self) -> Self {
        self.worker.shift_raw = None;
        self
    }

    pub fn urgent(mut self) -> Self {
        self.worker.urgent_eligible = true;
        self
    }

    pub fn load(mut self, total: u32, urgent: u32) -> Self {
        self.worker.current_total_count = total;
        self.worker.current_urgent_count = urgent;
        self
    }

    pub fn build(self) -> Worker {
        self.worker
    }
}

/// 生成 n 个同区域同紧急度的事项，ID 为 <prefix>001..
pub fn items(prefix: &str, n: usize, group: &str, urgent: bool) -> Vec<WorkItem> {
    (1..=n)
        .map(|i| WorkItem::new(format!("{}{:03}", prefix, i), group, urgent))
        .collect()
}
