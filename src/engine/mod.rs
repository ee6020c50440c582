// ==========================================
// 工作量感知派单引擎 - 引擎层
// ==========================================
// 职责: 纯函数式分配流水线，不做 I/O
// 红线: 输入快照不可变；同一输入必须得到同一输出
// ==========================================

pub mod allocator;
pub mod assigner;
pub mod capacity;
pub mod eligibility;
pub mod error;
pub mod load_weight;
pub mod partitioner;

// 重导出核心引擎
pub use allocator::{ProportionalAllocator, WorkerQuota};
pub use assigner::SequentialAssigner;
pub use capacity::{CapacityRatedWorker, CapacityWeightResolver};
pub use eligibility::{EligibilityFilter, EligibilityOutcome, ExcludedWorker, ExclusionReason};
pub use error::{AllocationError, AllocationResult};
pub use load_weight::{LoadAdjustedWeightCalculator, WeightedWorker};
pub use partitioner::{
    DispatchReport, PartitionReport, RegionAssignment, RegionOutcome, RegionPartitioner,
};
