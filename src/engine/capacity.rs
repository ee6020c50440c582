// ==========================================
// 工作量感知派单引擎 - 容量权重解析
// ==========================================
// 规则: 取表达式中第一个"整数%"，除以 100
// 规则: 无法识别时取默认权重（默认 1.0）
// 规则: 容量 0 → 本次不参与分配（不是错误）
// ==========================================

use crate::domain::worker::Worker;
use crate::engine::eligibility::{ExcludedWorker, ExclusionReason};
use regex::Regex;
use std::sync::OnceLock;

fn percent_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)%").expect("容量正则必须合法"))
}

/// 带容量权重的人员
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityRatedWorker {
    pub worker: Worker,
    pub capacity_weight: f64,
}

// ==========================================
// CapacityWeightResolver - 容量权重解析器
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct CapacityWeightResolver {
    default_weight: f64,
}

impl CapacityWeightResolver {
    pub fn new(default_weight: f64) -> Self {
        Self {
            default_weight: default_weight.clamp(0.0, 1.0),
        }
    }

    /// 解析容量表达式
    ///
    /// # 示例
    /// - "100%" → 1.0
    /// - "Available 50% today" → 0.5
    /// - "0%" → 0.0
    /// - "" / None → default_weight
    /// - "150%" → 1.0（上限截断）
    pub fn resolve(&self, raw: Option<&str>) -> f64 {
        let Some(text) = raw else {
            return self.default_weight;
        };

        match percent_pattern()
            .captures(text.trim())
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            Some(percent) => (percent as f64 / 100.0).min(1.0),
            None => self.default_weight,
        }
    }

    /// 为人员打容量权重，容量为 0 的人员移入排除列表
    pub fn rate(&self, workers: Vec<Worker>) -> (Vec<CapacityRatedWorker>, Vec<ExcludedWorker>) {
        let mut rated = Vec::with_capacity(workers.len());
        let mut excluded = Vec::new();

        for worker in workers {
            let capacity_weight = self.resolve(worker.capacity_raw.as_deref());
            if capacity_weight > 0.0 {
                rated.push(CapacityRatedWorker {
                    worker,
                    capacity_weight,
                });
            } else {
                excluded.push(ExcludedWorker {
                    alias: worker.alias,
                    reason: ExclusionReason::ZeroCapacity,
                });
            }
        }

        (rated, excluded)
    }
}

impl Default for CapacityWeightResolver {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_percentages() {
        let resolver = CapacityWeightResolver::default();
        assert_eq!(resolver.resolve(Some("100%")), 1.0);
        assert_eq!(resolver.resolve(Some("50%")), 0.5);
        assert_eq!(resolver.resolve(Some(" 25% ")), 0.25);
        assert_eq!(resolver.resolve(Some("0%")), 0.0);
        assert_eq!(resolver.resolve(Some("Partial - 75% (training)")), 0.75);
    }

    #[test]
    fn test_resolve_takes_first_match() {
        let resolver = CapacityWeightResolver::default();
        assert_eq!(resolver.resolve(Some("30% / 80%")), 0.3);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let resolver = CapacityWeightResolver::new(0.8);
        assert_eq!(resolver.resolve(None), 0.8);
        assert_eq!(resolver.resolve(Some("")), 0.8);
        assert_eq!(resolver.resolve(Some("full time")), 0.8);
        // 数字与 % 之间有空格不算匹配
        assert_eq!(resolver.resolve(Some("50 %")), 0.8);
    }

    #[test]
    fn test_resolve_clamps_above_one() {
        let resolver = CapacityWeightResolver::default();
        assert_eq!(resolver.resolve(Some("150%")), 1.0);
    }

    #[test]
    fn test_rate_excludes_zero_capacity() {
        let mut a = Worker::new("a", "R");
        a.capacity_raw = Some("0%".to_string());
        let mut b = Worker::new("b", "R");
        b.capacity_raw = Some("40%".to_string());
        let c = Worker::new("c", "R");

        let (rated, excluded) = CapacityWeightResolver::default().rate(vec![a, b, c]);
        assert_eq!(rated.len(), 2);
        assert_eq!(rated[0].worker.alias, "b");
        assert_eq!(rated[0].capacity_weight, 0.4);
        assert_eq!(rated[1].capacity_weight, 1.0);
        assert_eq!(excluded[0].alias, "a");
        assert_eq!(excluded[0].reason, ExclusionReason::ZeroCapacity);
    }
}
