// ==========================================
// 工作量感知派单引擎 - 核心库
// ==========================================
// 职责: 按容量 / 班次 / 紧急资格 / 当日负载，
//       把待办事项确定性地、一对一地分配给人员
// 技术栈: Rust + SQLite（运行台账）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 分配规则（纯计算）
pub mod engine;

// 导入层 - 名册 / 负载 / 批次快照
pub mod importer;

// 导出层 - 输出表
pub mod exporter;

// 配置层 - 分配参数
pub mod config;

// 数据仓储层 - 运行台账
pub mod repository;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 运行编排
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AssignmentSource, FailureKind, PartitionKey, RegionSpec, UrgencyClass};

// 领域实体
pub use domain::{
    AssignmentRecord, DispatchRun, PendingBatch, RegionRunRecord, RunStatus, ShiftWindow, WorkItem,
    Worker, WorkerLoadSnapshot,
};

// 引擎
pub use engine::{
    AllocationError, CapacityWeightResolver, DispatchReport, EligibilityFilter,
    LoadAdjustedWeightCalculator, ProportionalAllocator, RegionPartitioner, SequentialAssigner,
};

// 配置
pub use config::{AllocationConfig, ConfigManager};

// API
pub use api::{DispatchApi, DispatchRequest, DispatchSummary};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "工作量感知派单引擎";
