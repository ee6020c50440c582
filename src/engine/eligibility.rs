// ==========================================
// 工作量感知派单引擎 - 可用人员筛选
// ==========================================
// 红线: 班次不包含执行时刻的人员不得接单
// 红线: 紧急分区只保留具备紧急资格的人员，不做降级处理
// ==========================================
// 职责: 班次过滤 + 紧急资格过滤
// 输入: 人员快照 + 执行时刻
// 输出: 筛选后的人员副本 + 被排除人员及原因
// ==========================================

use crate::domain::types::UrgencyClass;
use crate::domain::worker::{ShiftWindow, Worker};
use crate::engine::error::AllocationError;
use chrono::NaiveTime;
use std::fmt;
use tracing::{debug, warn};

// ==========================================
// ExclusionReason - 排除原因
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionReason {
    NoShift,                           // 未填写班次，视为不可用
    UnparsableShift(AllocationError),  // 班次无法解析
    OffShift(ShiftWindow),             // 执行时刻不在班次内
    NotUrgencyEligible,                // 紧急分区且无紧急资格
    ZeroCapacity,                      // 容量为 0
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NoShift => write!(f, "NO_SHIFT"),
            ExclusionReason::UnparsableShift(err) => write!(f, "UNPARSABLE_SHIFT: {}", err),
            ExclusionReason::OffShift(shift) => write!(f, "OFF_SHIFT: {}", shift),
            ExclusionReason::NotUrgencyEligible => write!(f, "NOT_URGENCY_ELIGIBLE"),
            ExclusionReason::ZeroCapacity => write!(f, "ZERO_CAPACITY"),
        }
    }
}

/// 被排除的人员
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedWorker {
    pub alias: String,
    pub reason: ExclusionReason,
}

/// 筛选结果
#[derive(Debug, Clone, Default)]
pub struct EligibilityOutcome {
    pub eligible: Vec<Worker>,
    pub excluded: Vec<ExcludedWorker>,
}

// ==========================================
// EligibilityFilter - 可用人员筛选器
// ==========================================
// 无状态：只依赖执行时刻与班次记法，不修改输入快照
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter {
    execution_time: NaiveTime,
    office_notation: bool,
}

impl EligibilityFilter {
    pub fn new(execution_time: NaiveTime, office_notation: bool) -> Self {
        Self {
            execution_time,
            office_notation,
        }
    }

    pub fn execution_time(&self) -> NaiveTime {
        self.execution_time
    }

    /// 解析单个人员的班次
    ///
    /// # 返回
    /// - Ok(Some(shift)): 班次有效
    /// - Ok(None): 未填写班次
    /// - Err(UnparsableShift): 班次无法解析
    pub fn resolve_shift(&self, worker: &Worker) -> Result<Option<ShiftWindow>, AllocationError> {
        let raw = match worker.shift_raw.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(None),
        };
        ShiftWindow::parse(raw, self.office_notation)
            .map(Some)
            .map_err(|_| AllocationError::UnparsableShift {
                alias: worker.alias.clone(),
                raw: raw.to_string(),
            })
    }

    /// 班次过滤：保留班次包含执行时刻的人员
    pub fn filter_by_shift(&self, workers: &[Worker]) -> EligibilityOutcome {
        let mut outcome = EligibilityOutcome::default();

        for worker in workers {
            let reason = match self.resolve_shift(worker) {
                Ok(Some(shift)) if shift.contains(self.execution_time) => {
                    outcome.eligible.push(worker.clone());
                    continue;
                }
                Ok(Some(shift)) => ExclusionReason::OffShift(shift),
                Ok(None) => ExclusionReason::NoShift,
                Err(err) => {
                    warn!(alias = %worker.alias, error = %err, "班次无法解析，人员本次不可用");
                    ExclusionReason::UnparsableShift(err)
                }
            };
            outcome.excluded.push(ExcludedWorker {
                alias: worker.alias.clone(),
                reason,
            });
        }

        outcome
    }

    /// 紧急资格过滤：紧急分区只保留 urgent_eligible=true
    pub fn filter_by_urgency(&self, outcome: EligibilityOutcome, class: UrgencyClass) -> EligibilityOutcome {
        if !class.is_urgent() {
            return outcome;
        }

        let EligibilityOutcome { eligible, mut excluded } = outcome;
        let (kept, dropped): (Vec<Worker>, Vec<Worker>) =
            eligible.into_iter().partition(|w| w.urgent_eligible);
        excluded.extend(dropped.into_iter().map(|w| ExcludedWorker {
            alias: w.alias,
            reason: ExclusionReason::NotUrgencyEligible,
        }));

        EligibilityOutcome {
            eligible: kept,
            excluded,
        }
    }

    /// 依次执行班次过滤与紧急资格过滤
    pub fn filter(&self, workers: &[Worker], class: UrgencyClass) -> EligibilityOutcome {
        let outcome = self.filter_by_urgency(self.filter_by_shift(workers), class);
        debug!(
            class = %class,
            eligible = outcome.eligible.len(),
            excluded = outcome.excluded.len(),
            execution_time = %self.execution_time,
            "人员筛选完成"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(alias: &str, shift: Option<&str>, urgent: bool) -> Worker {
        let mut w = Worker::new(alias, "CAM IND NAM");
        w.shift_raw = shift.map(str::to_string);
        w.urgent_eligible = urgent;
        w
    }

    fn at(h: u32, m: u32) -> EligibilityFilter {
        EligibilityFilter::new(NaiveTime::from_hms_opt(h, m, 0).unwrap(), true)
    }

    #[test]
    fn test_shift_filter_keeps_on_shift_workers() {
        let roster = vec![
            worker("early", Some("6 to 4"), false),
            worker("late", Some("9 to 7"), false),
            worker("night", Some("18 to 4"), false),
        ];

        let outcome = at(8, 30).filter_by_shift(&roster);
        let aliases: Vec<_> = outcome.eligible.iter().map(|w| w.alias.as_str()).collect();
        assert_eq!(aliases, vec!["early"]);
        assert_eq!(outcome.excluded.len(), 2);
        assert!(matches!(outcome.excluded[0].reason, ExclusionReason::OffShift(_)));
    }

    #[test]
    fn test_shift_filter_excludes_missing_and_unparsable() {
        let roster = vec![
            worker("none", None, true),
            worker("blank", Some("  "), true),
            worker("garbage", Some("all day"), true),
        ];

        let outcome = at(10, 0).filter_by_shift(&roster);
        assert!(outcome.eligible.is_empty());
        assert_eq!(outcome.excluded[0].reason, ExclusionReason::NoShift);
        assert_eq!(outcome.excluded[1].reason, ExclusionReason::NoShift);
        assert!(matches!(
            outcome.excluded[2].reason,
            ExclusionReason::UnparsableShift(AllocationError::UnparsableShift { .. })
        ));
    }

    #[test]
    fn test_urgency_filter_only_for_urgent_class() {
        let roster = vec![
            worker("a", Some("7 to 5"), true),
            worker("b", Some("7 to 5"), false),
        ];
        let filter = at(9, 0);

        let normal = filter.filter(&roster, UrgencyClass::Normal);
        assert_eq!(normal.eligible.len(), 2);

        let urgent = filter.filter(&roster, UrgencyClass::Urgent);
        assert_eq!(urgent.eligible.len(), 1);
        assert_eq!(urgent.eligible[0].alias, "a");
        assert_eq!(urgent.excluded[0].reason, ExclusionReason::NotUrgencyEligible);
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let roster = vec![worker("a", Some("7 to 5"), false)];
        let _ = at(20, 0).filter(&roster, UrgencyClass::Urgent);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].alias, "a");
    }
}
