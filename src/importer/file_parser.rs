// ==========================================
// 工作量感知派单引擎 - 表格解析器
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 保留列顺序的原始表（表头 + 行值），不做业务转换
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// RawTable - 原始表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// 原始行（row_number 为文件中的行号，表头为第 1 行）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub row_number: usize,
    pub values: Vec<String>,
}

impl RawRow {
    /// 取单元格（越界视为空）
    pub fn cell(&self, idx: usize) -> &str {
        self.values.get(idx).map(String::as_str).unwrap_or("")
    }

    /// 取可选单元格（空白视为 None）
    pub fn optional_cell(&self, idx: Option<usize>) -> Option<&str> {
        idx.map(|i| self.cell(i)).filter(|v| !v.is_empty())
    }
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// 查找列下标（忽略首尾空白与大小写）
    pub fn column_index(&self, column: &str) -> Option<usize> {
        let wanted = column.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// 查找必需列
    pub fn require_column(&self, column: &str) -> ImportResult<usize> {
        self.column_index(column)
            .ok_or_else(|| ImportError::MissingRequiredColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// 一次性检查多个必需列，按传入顺序返回下标
    pub fn require_columns(&self, columns: &[&str]) -> ImportResult<Vec<usize>> {
        columns.iter().map(|c| self.require_column(c)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ==========================================
// TableParser Trait
// ==========================================
pub trait TableParser {
    /// 解析文件为原始表
    ///
    /// # 参数
    /// - path: 文件路径
    /// - table: 表名（错误信息用）
    fn parse_table(&self, path: &Path, table: &str) -> ImportResult<RawTable>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn is_blank(values: &[String]) -> bool {
    values.iter().all(|v| v.is_empty())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl TableParser for CsvParser {
    fn parse_table(&self, path: &Path, table: &str) -> ImportResult<RawTable> {
        ensure_exists(path)?;

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 去掉 Excel 导出 CSV 时带的 BOM
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let values: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            // 跳过完全空白的行
            if is_blank(&values) {
                continue;
            }
            rows.push(RawRow {
                row_number: idx + 2,
                values,
            });
        }

        Ok(RawTable::new(table, headers, rows))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

/// 单元格转文本：日期单元格统一为 %Y-%m-%d %H:%M:%S
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        _ => cell.to_string().trim().to_string(),
    }
}

impl TableParser for ExcelParser {
    fn parse_table(&self, path: &Path, table: &str) -> ImportResult<RawTable> {
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut iter = range.rows();
        let header_row = iter
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无表头行".to_string()))?;
        let headers: Vec<String> = header_row.iter().map(cell_text).collect();

        let mut rows = Vec::new();
        for (idx, data_row) in iter.enumerate() {
            let values: Vec<String> = data_row.iter().map(cell_text).collect();
            if is_blank(&values) {
                continue;
            }
            rows.push(RawRow {
                row_number: idx + 2,
                values,
            });
        }

        Ok(RawTable::new(table, headers, rows))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P, table: &str) -> ImportResult<RawTable> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_table(path, table),
            "xlsx" | "xls" | "xlsm" => ExcelParser.parse_table(path, table),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
