// ==========================================
// 工作量感知派单引擎 - 配置层
// ==========================================
// 职责: 分配参数、输入列名、区域定义
// 来源: 代码默认值 < JSON 配置文件 < 台账库 config_kv
// ==========================================

pub mod allocation_config;
pub mod config_manager;

// 重导出核心配置类型
pub use allocation_config::{
    AllocationConfig, BatchColumns, ColumnMapping, ConfigError, ConfigResult, LoadColumns,
    RosterColumns, RoundingMode,
};
pub use config_manager::{config_keys, ConfigManager};
