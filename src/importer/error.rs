// ==========================================
// 工作量感知派单引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 缺列在分配开始前报错，整个运行终止
// ==========================================

use crate::domain::types::FailureKind;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 表结构错误 =====
    #[error("{table} 缺少必需列: {column}")]
    MissingRequiredColumn { table: String, column: String },

    // ===== 数据质量错误 =====
    #[error("{table} 主键重复 (行 {row}): {key}")]
    DuplicateKey {
        table: String,
        row: usize,
        key: String,
    },

    #[error("{table} 取值无效 (行 {row}, 字段 {field}): '{value}'")]
    InvalidValue {
        table: String,
        row: usize,
        field: String,
        value: String,
    },

    #[error("{table} 主键缺失 (行 {row})")]
    PrimaryKeyMissing { table: String, row: usize },
}

impl ImportError {
    /// 导入错误一律视为上游数据问题（修正快照后可重跑）
    pub fn failure_kind(&self) -> FailureKind {
        FailureKind::UpstreamData
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
