// ==========================================
// 工作量感知派单引擎 - 数据清洗器
// ==========================================
// 职责: TRIM / NULL 标准化 / 是否标志 / 日期解析
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};

pub struct DataCleaner;

impl DataCleaner {
    /// 去首尾空白，可选转大写
    pub fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// 空白视为 NULL
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 解析是否标志
    ///
    /// # 返回
    /// - Some(true): 1 / 1.0 / TRUE / YES / Y
    /// - Some(false): 0 / 0.0 / FALSE / NO / N / 空白
    /// - None: 无法识别
    pub fn parse_flag(&self, value: &str) -> Option<bool> {
        match value.trim().to_uppercase().as_str() {
            "1" | "1.0" | "TRUE" | "YES" | "Y" => Some(true),
            "0" | "0.0" | "FALSE" | "NO" | "N" | "" => Some(false),
            _ => None,
        }
    }

    /// 宽松是否标志：只有明确的"是"才算 true
    pub fn is_yes(&self, value: &str) -> bool {
        self.parse_flag(value).unwrap_or(false)
    }

    /// 按格式列表解析日期（取日期部分）
    ///
    /// 依次尝试:
    /// 1) 完整日期时间格式
    /// 2) 纯日期格式
    /// 3) 第一个空格前的部分按纯日期格式
    pub fn parse_date(&self, value: &str, formats: &[String]) -> Option<NaiveDate> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        for fmt in formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
                return Some(dt.date());
            }
            if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
                return Some(d);
            }
        }

        let date_part = value.split_whitespace().next()?;
        formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
    }
}
