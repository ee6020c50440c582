// ==========================================
// 工作量感知派单引擎 - 配置管理器
// ==========================================
// 职责: 读取/写入台账库 config_kv (scope_id='global')，
//       并把覆写叠加到 AllocationConfig 上
// ==========================================

use crate::config::allocation_config::{AllocationConfig, ConfigError, ConfigResult, RoundingMode};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::types::RegionSpec;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 台账数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn.lock().map_err(|e| ConfigError::StoreError(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> ConfigResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::StoreError(format!("锁获取失败: {}", e)))
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入配置值（UPSERT），写入前先校验 key 与取值
    pub fn set_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let mut candidate = AllocationConfig::default();
        apply_override(&mut candidate, key, value)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        info!(key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 列出所有 global 配置
    pub fn list_values(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// 把 config_kv 中的覆写叠加到基础配置上
    ///
    /// 未知 key 忽略（其他工具可能共用 config_kv）
    pub fn apply_overrides(&self, mut base: AllocationConfig) -> ConfigResult<AllocationConfig> {
        for (key, value) in self.list_values()? {
            if !config_keys::ALL.contains(&key.as_str()) {
                debug!(key = %key, "忽略未知配置键");
                continue;
            }
            apply_override(&mut base, &key, &value)?;
        }
        base.validate()?;
        Ok(base)
    }
}

/// 单个覆写
fn apply_override(config: &mut AllocationConfig, key: &str, value: &str) -> ConfigResult<()> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message,
    };
    let parse_f64 = || value.trim().parse::<f64>().map_err(|e| invalid(e.to_string()));
    let parse_bool = || match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(invalid("期望 true/false".to_string())),
    };

    match key {
        config_keys::DEFAULT_CAPACITY_WEIGHT => config.default_capacity_weight = parse_f64()?,
        config_keys::LOAD_BOOST => config.load_boost = parse_f64()?,
        config_keys::MIN_EFFECTIVE_WEIGHT => config.min_effective_weight = parse_f64()?,
        config_keys::ROUNDING => {
            config.rounding = RoundingMode::from_str(value)
                .ok_or_else(|| invalid("期望 HALF_AWAY_FROM_ZERO / HALF_TO_EVEN".to_string()))?
        }
        config_keys::OFFICE_HOURS_SHIFT_NOTATION => config.office_hours_shift_notation = parse_bool()?,
        config_keys::RESPECT_PREASSIGNED => config.respect_preassigned = parse_bool()?,
        config_keys::SPECIAL_ID_PATTERN => config.special_id_pattern = value.to_string(),
        config_keys::REGIONS => {
            config.regions = serde_json::from_str::<Vec<RegionSpec>>(value)
                .map_err(|e| invalid(e.to_string()))?
        }
        _ => return Err(invalid("未知配置键".to_string())),
    }
    config.validate()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 容量与权重
    pub const DEFAULT_CAPACITY_WEIGHT: &str = "allocation/default_capacity_weight";
    pub const LOAD_BOOST: &str = "allocation/load_boost";
    pub const MIN_EFFECTIVE_WEIGHT: &str = "allocation/min_effective_weight";
    pub const ROUNDING: &str = "allocation/rounding";

    // 班次
    pub const OFFICE_HOURS_SHIFT_NOTATION: &str = "allocation/office_hours_shift_notation";

    // 路由
    pub const RESPECT_PREASSIGNED: &str = "allocation/respect_preassigned";
    pub const SPECIAL_ID_PATTERN: &str = "allocation/special_id_pattern";
    pub const REGIONS: &str = "allocation/regions"; // JSON 数组

    pub const ALL: &[&str] = &[
        DEFAULT_CAPACITY_WEIGHT,
        LOAD_BOOST,
        MIN_EFFECTIVE_WEIGHT,
        ROUNDING,
        OFFICE_HOURS_SHIFT_NOTATION,
        RESPECT_PREASSIGNED,
        SPECIAL_ID_PATTERN,
        REGIONS,
    ];
}
