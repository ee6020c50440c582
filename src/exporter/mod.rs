// ==========================================
// 工作量感知派单引擎 - 导出层
// ==========================================
// 职责: 把分配结果写成 CSV 表
// ==========================================

pub mod assignment_writer;
pub mod error;

pub use assignment_writer::{region_file_name, AssignmentWriter, SPECIAL_FILE, UNROUTED_FILE};
pub use error::{ExportError, ExportResult};
