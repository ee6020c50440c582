// ==========================================
// 工作量感知派单引擎 - 领域模型层
// ==========================================
// 职责: 定义人员、待办事项、分区与台账实体
// 红线: 不含文件读写,不含分配逻辑
// ==========================================

pub mod dispatch_run;
pub mod types;
pub mod work_item;
pub mod worker;

// 重导出核心类型
pub use dispatch_run::{AssignmentRecord, DispatchRun, RegionRunRecord, RunStatus};
pub use types::{AssignmentSource, FailureKind, PartitionKey, RegionSpec, UrgencyClass};
pub use work_item::{sort_by_item_id, PendingBatch, WorkItem};
pub use worker::{ShiftParseError, ShiftWindow, Worker, WorkerLoad, WorkerLoadSnapshot};
