// ==========================================
// 工作量感知派单引擎 - 导入层
// ==========================================
// 职责: 读取名册 / 当日负载 / 待办批次快照，生成领域对象
// 支持: Excel, CSV
// 红线: 列检查在分配开始之前完成
// ==========================================

// 模块声明
pub mod batch_importer;
pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod load_importer;
pub mod roster_importer;

// 重导出核心类型
pub use batch_importer::{split_special, BatchImporter, BATCH_TABLE};
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, RawRow, RawTable, TableParser, UniversalFileParser};
pub use load_importer::{LoadImportStats, LoadImporter, LOAD_TABLE};
pub use roster_importer::{RosterImporter, ROSTER_TABLE};
