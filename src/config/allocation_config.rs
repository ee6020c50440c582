// ==========================================
// 工作量感知派单引擎 - 分配配置
// ==========================================
// 职责: 分配参数 + 输入表列名 + 区域定义
// 来源优先级: 代码默认值 < JSON 配置文件 < 台账库 config_kv
// ==========================================

use crate::domain::types::RegionSpec;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {0}")]
    ReadError(String),

    #[error("配置解析失败: {0}")]
    ParseError(String),

    #[error("配置值非法 (key: {key}, value: {value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("配置存储访问失败: {0}")]
    StoreError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::ReadError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<rusqlite::Error> for ConfigError {
    fn from(err: rusqlite::Error) -> Self {
        ConfigError::StoreError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// RoundingMode - 配额取整方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMode {
    /// 四舍五入，.5 远离零（默认）
    #[default]
    HalfAwayFromZero,
    /// 银行家舍入，.5 取偶
    HalfToEven,
}

impl RoundingMode {
    pub fn round(&self, value: f64) -> f64 {
        match self {
            RoundingMode::HalfAwayFromZero => value.round(),
            RoundingMode::HalfToEven => value.round_ties_even(),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "HALF_AWAY_FROM_ZERO" => Some(RoundingMode::HalfAwayFromZero),
            "HALF_TO_EVEN" => Some(RoundingMode::HalfToEven),
            _ => None,
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingMode::HalfAwayFromZero => write!(f, "HALF_AWAY_FROM_ZERO"),
            RoundingMode::HalfToEven => write!(f, "HALF_TO_EVEN"),
        }
    }
}

// ==========================================
// 输入表列名
// ==========================================

/// 人员名册列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterColumns {
    pub alias: String,
    pub category: String,
    pub capacity: String,
    pub shift: String,
    pub urgent_eligible: String,
}

impl Default for RosterColumns {
    fn default() -> Self {
        Self {
            alias: "Buyer Alias".to_string(),
            category: "Sub-Category".to_string(),
            capacity: "Workload / Availability".to_string(),
            shift: "Shift".to_string(),
            urgent_eligible: "Available For Urgencies".to_string(),
        }
    }
}

/// 当日派单清单列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadColumns {
    pub alias: String,
    pub urgent: String,
    pub created: String,
    /// Created 列的日期时间格式，按顺序尝试
    pub created_formats: Vec<String>,
}

impl Default for LoadColumns {
    fn default() -> Self {
        Self {
            alias: "Buyer Alias".to_string(),
            urgent: "Urgent?".to_string(),
            created: "Created".to_string(),
            created_formats: vec![
                "%m/%d/%Y %I:%M %p".to_string(),
                "%m/%d/%Y %H:%M".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M".to_string(),
                "%m/%d/%Y".to_string(),
                "%Y-%m-%d".to_string(),
            ],
        }
    }
}

/// 待办批次列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchColumns {
    pub item_id: String,
    pub group: String,
    pub urgent: String,
    pub worker: String,
}

impl Default for BatchColumns {
    fn default() -> Self {
        Self {
            item_id: "ID".to_string(),
            group: "Assignment Group".to_string(),
            urgent: "URGENT".to_string(),
            worker: "BUYER".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub roster: RosterColumns,
    pub load: LoadColumns,
    pub batch: BatchColumns,
}

// ==========================================
// AllocationConfig - 分配配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    // ===== 容量与权重 =====
    /// 容量表达式无法识别时的默认权重
    pub default_capacity_weight: f64,
    /// 负载调整系数：effective = capacity × (load_boost − 归一化负载)
    pub load_boost: f64,
    /// 有效权重下限
    pub min_effective_weight: f64,
    pub rounding: RoundingMode,

    // ===== 班次 =====
    /// "7 to 5" 按办公时间理解为 07:00–17:00
    pub office_hours_shift_notation: bool,

    // ===== 事项路由 =====
    /// 上游已指定人员的事项原样透传
    pub respect_preassigned: bool,
    /// 特殊事项（不参与分配）ID 正则
    pub special_id_pattern: String,
    pub regions: Vec<RegionSpec>,

    // ===== 输入列名 =====
    pub columns: ColumnMapping,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            default_capacity_weight: 1.0,
            load_boost: 1.25,
            min_effective_weight: 0.1,
            rounding: RoundingMode::HalfAwayFromZero,
            office_hours_shift_notation: true,
            respect_preassigned: true,
            special_id_pattern: r"(?i)-V\d+$".to_string(),
            regions: vec![
                RegionSpec::new("NAM", "CAMERON NAM", "CAM IND NAM"),
                RegionSpec::new("LAM", "CAMERON LAM", "CAM IND LAM"),
            ],
            columns: ColumnMapping::default(),
        }
    }
}

impl AllocationConfig {
    /// 从 JSON 文件加载（缺省字段取默认值）并校验
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: AllocationConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为快照（写入运行台账）
    pub fn to_snapshot_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 编译特殊事项正则
    pub fn special_id_regex(&self) -> ConfigResult<Regex> {
        Regex::new(&self.special_id_pattern).map_err(|e| ConfigError::InvalidValue {
            key: "special_id_pattern".to_string(),
            value: self.special_id_pattern.clone(),
            message: e.to_string(),
        })
    }

    /// 校验配置取值范围
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |key: &str, value: String, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            message: message.to_string(),
        };

        if !(0.0..=1.0).contains(&self.default_capacity_weight) {
            return Err(invalid(
                "default_capacity_weight",
                self.default_capacity_weight.to_string(),
                "必须在 [0, 1] 内",
            ));
        }
        if !self.load_boost.is_finite() || self.load_boost < 1.0 {
            return Err(invalid("load_boost", self.load_boost.to_string(), "必须 >= 1.0"));
        }
        if !self.min_effective_weight.is_finite() || self.min_effective_weight <= 0.0 {
            return Err(invalid(
                "min_effective_weight",
                self.min_effective_weight.to_string(),
                "必须 > 0",
            ));
        }
        self.special_id_regex()?;

        if self.regions.is_empty() {
            return Err(invalid("regions", "[]".to_string(), "至少需要一个区域"));
        }
        let mut codes = HashSet::new();
        for region in &self.regions {
            if region.code.trim().is_empty() {
                return Err(invalid("regions", region.batch_group.clone(), "区域代码不能为空"));
            }
            if !codes.insert(region.code.trim().to_uppercase()) {
                return Err(invalid("regions", region.code.clone(), "区域代码重复"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = AllocationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.load_boost, 1.25);
        assert_eq!(config.min_effective_weight, 0.1);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"load_boost": 1.5, "columns": {{"batch": {{"worker": "ASSIGNEE"}}}}}}"#).unwrap();

        let config = AllocationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.load_boost, 1.5);
        assert_eq!(config.columns.batch.worker, "ASSIGNEE");
        assert_eq!(config.columns.batch.item_id, "ID");
        assert_eq!(config.min_effective_weight, 0.1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AllocationConfig::default();
        config.min_effective_weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = AllocationConfig::default();
        config.special_id_pattern = "([".to_string();
        assert!(config.validate().is_err());

        let mut config = AllocationConfig::default();
        config.regions.push(RegionSpec::new("nam", "X", "Y"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rounding_modes() {
        assert_eq!(RoundingMode::HalfAwayFromZero.round(2.5), 3.0);
        assert_eq!(RoundingMode::HalfToEven.round(2.5), 2.0);
        assert_eq!(RoundingMode::HalfToEven.round(3.5), 4.0);
        assert_eq!(RoundingMode::from_str("half_to_even"), Some(RoundingMode::HalfToEven));
        assert_eq!(RoundingMode::from_str("up"), None);
    }
}
