// ==========================================
// 工作量感知派单引擎 - 指派结果输出
// ==========================================
// 输出:
// - assignments_<区域>.csv: 成功区域（批次原列 + 人员列，按事项 ID 排序）
// - special_items.csv: 特殊事项（原样）
// - unrouted_items.csv: 未匹配区域的事项（非空时才写）
// 规则: 原表已有人员列则覆盖，否则追加到末尾
//       同目录下失败区域与未匹配表的旧文件在写出前删除
//       （输出目录只反映本次运行）
// ==========================================

use crate::config::BatchColumns;
use crate::domain::work_item::WorkItem;
use crate::engine::partitioner::DispatchReport;
use crate::exporter::error::{ExportError, ExportResult};
use csv::Writer;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SPECIAL_FILE: &str = "special_items.csv";
pub const UNROUTED_FILE: &str = "unrouted_items.csv";

/// 区域输出文件名
pub fn region_file_name(region: &str) -> String {
    format!("assignments_{}.csv", region.trim().to_uppercase())
}

/// 输出表头与人员列位置
fn output_headers(headers: &[String], worker_column: &str) -> (Vec<String>, usize) {
    let wanted = worker_column.trim().to_lowercase();
    match headers.iter().position(|h| h.trim().to_lowercase() == wanted) {
        Some(idx) => (headers.to_vec(), idx),
        None => {
            let mut out = headers.to_vec();
            out.push(worker_column.to_string());
            let idx = out.len() - 1;
            (out, idx)
        }
    }
}

// ==========================================
// AssignmentWriter
// ==========================================
pub struct AssignmentWriter {
    output_dir: PathBuf,
    columns: BatchColumns,
}

impl AssignmentWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P, columns: BatchColumns) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            columns,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn ensure_output_dir(&self) -> ExportResult<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| ExportError::OutputDirError {
            path: self.output_dir.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 还原一行：原始值补齐 + 核心列兜底 + 人员列覆盖
    fn output_row(&self, headers: &[String], worker_idx: usize, item: &WorkItem) -> Vec<String> {
        let mut row = item.values.clone();
        row.resize(headers.len(), String::new());

        let column = |name: &str| {
            let wanted = name.trim().to_lowercase();
            headers.iter().position(|h| h.trim().to_lowercase() == wanted)
        };
        let mut fill_blank = |idx: Option<usize>, value: String| {
            if let Some(i) = idx {
                if row[i].trim().is_empty() {
                    row[i] = value;
                }
            }
        };
        fill_blank(column(&self.columns.item_id), item.item_id.clone());
        fill_blank(column(&self.columns.group), item.region_tag.clone());
        fill_blank(
            column(&self.columns.urgent),
            if item.urgent { "1" } else { "0" }.to_string(),
        );

        row[worker_idx] = item.assigned_worker.clone().unwrap_or_default();
        row
    }

    /// 写一张表
    pub fn write_table(&self, file_name: &str, headers: &[String], items: &[WorkItem]) -> ExportResult<PathBuf> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join(file_name);

        let (out_headers, worker_idx) = output_headers(headers, &self.columns.worker);
        let mut wtr = Writer::from_writer(File::create(&path)?);
        wtr.write_record(&out_headers)?;
        for item in items {
            wtr.write_record(&self.output_row(&out_headers, worker_idx, item))?;
        }
        wtr.flush()?;

        info!(path = %path.display(), rows = items.len(), "输出表已写入");
        Ok(path)
    }

    /// 删除上次运行留下的旧表（不存在则忽略）
    fn remove_stale(&self, file_name: &str) -> ExportResult<bool> {
        let path = self.output_dir.join(file_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                warn!(path = %path.display(), "已删除上次运行遗留的输出表");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// 写出一次运行的全部输出表
    ///
    /// 失败区域不写文件；特殊事项表总是写出；未匹配表非空才写。
    /// 失败区域和空未匹配表对应的旧文件先被删除。
    pub fn write_report(&self, report: &DispatchReport) -> ExportResult<Vec<PathBuf>> {
        let mut written = Vec::new();

        for outcome in report.regions.iter().filter(|o| o.result.is_err()) {
            self.remove_stale(&region_file_name(&outcome.region.code))?;
        }
        if report.unrouted.is_empty() {
            self.remove_stale(UNROUTED_FILE)?;
        }

        for outcome in &report.regions {
            if let Ok(assignment) = &outcome.result {
                written.push(self.write_table(
                    &region_file_name(&outcome.region.code),
                    &report.headers,
                    &assignment.items,
                )?);
            }
        }

        written.push(self.write_table(SPECIAL_FILE, &report.headers, &report.special)?);

        if !report.unrouted.is_empty() {
            written.push(self.write_table(UNROUTED_FILE, &report.headers, &report.unrouted)?);
        }

        Ok(written)
    }
}
