// ==========================================
// 工作量感知派单引擎 - 人员领域模型
// ==========================================
// 依据: 派单规则 - 人员名册 + 当日负载快照
// 红线: 一次分配运行内人员快照不可变
// ==========================================

use crate::domain::types::UrgencyClass;
use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

// ==========================================
// ShiftWindow - 当日班次窗口
// ==========================================
// 规则:
// - start < end: 半开区间 [start, end)
// - start >= end: 跨零点，time >= start 或 time < end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// 班次文本无法解析
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("班次格式无法解析: '{raw}' ({message})")]
pub struct ShiftParseError {
    pub raw: String,
    pub message: String,
}

impl ShiftParseError {
    fn new(raw: &str, message: impl Into<String>) -> Self {
        Self {
            raw: raw.to_string(),
            message: message.into(),
        }
    }
}

fn shift_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*(?:to|-)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*$",
        )
        .expect("班次正则必须合法")
    })
}

impl ShiftWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// 判断时刻是否落在班次内
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// 是否跨零点
    pub fn wraps_midnight(&self) -> bool {
        self.start >= self.end
    }

    /// 解析班次文本
    ///
    /// # 格式
    /// - `"7 to 5"` / `"9-7"` / `"7:30 to 4:30"` / `"7am to 5pm"` / `"18 to 4"`
    ///
    /// # 规则
    /// - 带 am/pm 时按 12 小时制换算
    /// - 不带 am/pm 且 office_notation=true 时：两端都 <= 12 且结束不晚于开始，
    ///   结束时刻按下午理解（"7 to 5" → 07:00–17:00）
    /// - 24 点仅作结束时刻，等价于零点
    pub fn parse(raw: &str, office_notation: bool) -> Result<Self, ShiftParseError> {
        let caps = shift_pattern()
            .captures(raw)
            .ok_or_else(|| ShiftParseError::new(raw, "期望 '<开始> to <结束>'"))?;

        let number = |idx: usize| -> Result<u32, ShiftParseError> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u32>()
                    .map_err(|e| ShiftParseError::new(raw, e.to_string())),
                None => Ok(0),
            }
        };
        let meridiem = |idx: usize| caps.get(idx).map(|m| m.as_str().to_lowercase());

        let (start_h, start_m) = (number(1)?, number(2)?);
        let (mut end_h, end_m) = (number(4)?, number(5)?);
        let start_mer = meridiem(3);
        let end_mer = meridiem(6);

        let start_h = to_24_hour(raw, start_h, start_mer.as_deref())?;
        end_h = to_24_hour(raw, end_h, end_mer.as_deref())?;

        if office_notation
            && start_mer.is_none()
            && end_mer.is_none()
            && start_h <= 12
            && end_h < 12
            && (end_h, end_m) <= (start_h, start_m)
        {
            end_h += 12;
        }

        let start = hour_minute(raw, start_h, start_m, false)?;
        let end = hour_minute(raw, end_h, end_m, true)?;
        Ok(Self { start, end })
    }
}

fn to_24_hour(raw: &str, hour: u32, meridiem: Option<&str>) -> Result<u32, ShiftParseError> {
    match meridiem {
        None => Ok(hour),
        Some(_) if hour == 0 || hour > 12 => Err(ShiftParseError::new(
            raw,
            format!("12 小时制小时数越界: {}", hour),
        )),
        Some("am") => Ok(if hour == 12 { 0 } else { hour }),
        Some(_) => Ok(if hour == 12 { 12 } else { hour + 12 }),
    }
}

fn hour_minute(raw: &str, hour: u32, minute: u32, is_end: bool) -> Result<NaiveTime, ShiftParseError> {
    // 24:00 只允许作为结束时刻
    if hour == 24 && minute == 0 && is_end {
        return Ok(NaiveTime::MIN);
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ShiftParseError::new(raw, format!("时刻越界: {:02}:{:02}", hour, minute)))
}

impl fmt::Display for ShiftWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

// ==========================================
// Worker - 人员快照
// ==========================================
// 对齐: 人员名册一行 + 当日负载聚合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    // ===== 主键 =====
    pub alias: String,  // 人员别名（区域内唯一）
    pub region: String, // 名册类别值

    // ===== 原始名册字段 =====
    pub capacity_raw: Option<String>, // 容量表达式，如 "50%"
    pub shift_raw: Option<String>,    // 班次文本，如 "7 to 5"
    pub urgent_eligible: bool,        // 是否可接紧急事项

    // ===== 当日负载 =====
    pub current_total_count: u32,  // 当日已派总数
    pub current_urgent_count: u32, // 当日已派紧急数
}

impl Worker {
    pub fn new(alias: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            region: region.into(),
            capacity_raw: None,
            shift_raw: None,
            urgent_eligible: false,
            current_total_count: 0,
            current_urgent_count: 0,
        }
    }

    /// 按分区紧急度选取负载因子
    pub fn load_factor(&self, class: UrgencyClass) -> u32 {
        match class {
            UrgencyClass::Urgent => self.current_urgent_count,
            UrgencyClass::Normal => self.current_total_count,
        }
    }

    /// 返回叠加了负载的新快照（原快照不变）
    pub fn with_load(&self, load: &WorkerLoad) -> Self {
        Self {
            current_total_count: load.total_count,
            current_urgent_count: load.urgent_count,
            ..self.clone()
        }
    }
}

// ==========================================
// WorkerLoad - 单人当日负载
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLoad {
    pub total_count: u32,
    pub urgent_count: u32,
}

// ==========================================
// WorkerLoadSnapshot - 当日负载快照
// ==========================================
// 缺失快照 == 所有人负载为 0
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLoadSnapshot {
    by_alias: BTreeMap<String, WorkerLoad>,
}

impl WorkerLoadSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 累计一条已派记录
    pub fn record(&mut self, alias: &str, urgent: bool) {
        let entry = self.by_alias.entry(alias.trim().to_string()).or_default();
        entry.total_count += 1;
        if urgent {
            entry.urgent_count += 1;
        }
    }

    pub fn get(&self, alias: &str) -> WorkerLoad {
        self.by_alias.get(alias.trim()).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &WorkerLoad)> {
        self.by_alias.iter()
    }

    /// 把负载叠加到名册上，返回新名册
    pub fn apply(&self, roster: &[Worker]) -> Vec<Worker> {
        roster.iter().map(|w| w.with_load(&self.get(&w.alias))).collect()
    }
}
