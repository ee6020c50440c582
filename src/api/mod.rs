// ==========================================
// 工作量感知派单引擎 - API 层
// ==========================================
// 职责: 编排导入 / 引擎 / 导出 / 台账，供命令行调用
// ==========================================

pub mod dispatch_api;
pub mod error;

pub use dispatch_api::{build_ledger_records, DispatchApi, DispatchRequest, DispatchSummary};
pub use error::{ApiError, ApiResult};
