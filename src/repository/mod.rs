// ==========================================
// 工作量感知派单引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 派单运行台账的读写,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod run_ledger_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use run_ledger_repo::RunLedgerRepository;
