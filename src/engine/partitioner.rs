// ==========================================
// 工作量感知派单引擎 - 区域/紧急度分区驱动
// ==========================================
// 状态: 未分区 → 按区域拆分 → 按紧急度拆分 → 分配 → 合并
// 红线: 分区内不存在部分成功
// 红线: 一个区域失败不影响其他区域的结果
// 红线: 合并后的区域输出按事项 ID 排序
// ==========================================
// 分区流水线:
//   可用人员筛选 → 容量权重 → 负载调整权重 → 比例配额 → 顺序指派
// ==========================================

use crate::config::AllocationConfig;
use crate::domain::types::{AssignmentSource, PartitionKey, RegionSpec, UrgencyClass};
use crate::domain::work_item::{sort_by_item_id, PendingBatch, WorkItem};
use crate::domain::worker::Worker;
use crate::engine::allocator::{ProportionalAllocator, WorkerQuota};
use crate::engine::assigner::SequentialAssigner;
use crate::engine::capacity::CapacityWeightResolver;
use crate::engine::eligibility::{EligibilityFilter, ExcludedWorker, ExclusionReason};
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::load_weight::LoadAdjustedWeightCalculator;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 结果类型
// ==========================================

/// 单个分区的分配审计
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionReport {
    pub partition: PartitionKey,
    pub item_count: usize,
    pub quotas: Vec<WorkerQuota>,
    pub excluded: Vec<ExcludedWorker>,
}

/// 单个区域的成功结果
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAssignment {
    pub region: String,
    /// 合并后的事项（按事项 ID 排序）
    pub items: Vec<WorkItem>,
    pub partitions: Vec<PartitionReport>,
    pub allocated_count: usize,
    pub preassigned_count: usize,
}

impl RegionAssignment {
    /// 每个人员本次获得的事项数（含透传）
    pub fn counts_by_worker(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for alias in self.items.iter().filter_map(|i| i.assigned_worker.as_deref()) {
            *counts.entry(alias.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// 单个区域的结果（成功或带类型的失败）
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOutcome {
    pub region: RegionSpec,
    pub item_count: usize,
    pub result: Result<RegionAssignment, AllocationError>,
}

impl RegionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// 一次派单运行的完整结果
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub executed_at: NaiveDateTime,
    pub headers: Vec<String>,
    pub regions: Vec<RegionOutcome>,
    /// 特殊事项（不参与分配，原样输出）
    pub special: Vec<WorkItem>,
    /// 分组值不属于任何区域的事项
    pub unrouted: Vec<WorkItem>,
}

impl DispatchReport {
    pub fn failed_regions(&self) -> impl Iterator<Item = &RegionOutcome> {
        self.regions.iter().filter(|r| !r.is_success())
    }

    pub fn has_failures(&self) -> bool {
        self.failed_regions().next().is_some()
    }

    pub fn item_count(&self) -> usize {
        self.regions.iter().map(|r| r.item_count).sum::<usize>() + self.special.len() + self.unrouted.len()
    }
}

// ==========================================
// RegionPartitioner - 分区驱动
// ==========================================
pub struct RegionPartitioner {
    config: AllocationConfig,
    executed_at: NaiveDateTime,
    eligibility: EligibilityFilter,
    capacity: CapacityWeightResolver,
    weights: LoadAdjustedWeightCalculator,
    allocator: ProportionalAllocator,
    assigner: SequentialAssigner,
}

impl RegionPartitioner {
    /// 构造分区驱动
    ///
    /// # 参数
    /// - config: 已校验的分配配置
    /// - executed_at: 执行时刻（班次判断用其时分）
    pub fn new(config: AllocationConfig, executed_at: NaiveDateTime) -> Self {
        Self {
            eligibility: EligibilityFilter::new(executed_at.time(), config.office_hours_shift_notation),
            capacity: CapacityWeightResolver::new(config.default_capacity_weight),
            weights: LoadAdjustedWeightCalculator::new(config.load_boost, config.min_effective_weight),
            allocator: ProportionalAllocator::new(config.rounding),
            assigner: SequentialAssigner::new(),
            config,
            executed_at,
        }
    }

    pub fn executed_at(&self) -> NaiveDateTime {
        self.executed_at
    }

    // ==========================================
    // 分区级
    // ==========================================

    /// 对单个 (区域, 紧急度) 分区执行完整流水线
    ///
    /// # 返回
    /// - Ok((盖章后的事项, 审计)): 分区全部指派
    /// - Err: 分区整体失败，不返回任何部分结果
    #[instrument(skip(self, items, workers), fields(partition = %partition, items = items.len()))]
    pub fn allocate_partition(
        &self,
        partition: &PartitionKey,
        items: Vec<WorkItem>,
        workers: &[Worker],
    ) -> AllocationResult<(Vec<WorkItem>, PartitionReport)> {
        let item_count = items.len();
        if items.is_empty() {
            return Ok((
                Vec::new(),
                PartitionReport {
                    partition: partition.clone(),
                    item_count: 0,
                    quotas: Vec::new(),
                    excluded: Vec::new(),
                },
            ));
        }

        let outcome = self.eligibility.filter(workers, partition.class);
        let mut excluded = outcome.excluded;
        if outcome.eligible.is_empty() {
            return Err(AllocationError::NoEligibleWorkers {
                partition: partition.clone(),
                item_count,
                reason: summarize_exclusions(workers.len(), &excluded),
            });
        }

        let eligible_count = outcome.eligible.len();
        let (rated, zero_capacity) = self.capacity.rate(outcome.eligible);
        excluded.extend(zero_capacity);
        if rated.is_empty() {
            return Err(AllocationError::AllZeroCapacity {
                partition: partition.clone(),
                worker_count: eligible_count,
            });
        }

        let weighted = self.weights.calculate(partition, &rated)?;
        let quotas = self.allocator.allocate(partition, item_count, &weighted)?;
        let stamped = self.assigner.assign(items, &quotas);

        for quota in &quotas {
            debug!(
                alias = %quota.alias,
                capacity = quota.capacity_weight,
                load = quota.load_factor,
                effective = quota.effective_weight,
                raw = quota.raw_quota,
                quota = quota.quota,
                "配额明细"
            );
        }
        info!(
            workers = quotas.len(),
            excluded = excluded.len(),
            "分区分配完成"
        );

        Ok((
            stamped,
            PartitionReport {
                partition: partition.clone(),
                item_count,
                quotas,
                excluded,
            },
        ))
    }

    // ==========================================
    // 区域级
    // ==========================================

    /// 对单个区域执行分配：透传预指派 → 紧急分区 → 普通分区 → 合并排序
    ///
    /// # 参数
    /// - region: 区域定义
    /// - items: 本区域事项（批次顺序）
    /// - roster: 全量人员快照（按区域类别过滤）
    #[instrument(skip(self, region, items, roster), fields(region = %region.code, items = items.len()))]
    pub fn assign_region(
        &self,
        region: &RegionSpec,
        items: Vec<WorkItem>,
        roster: &[Worker],
    ) -> AllocationResult<RegionAssignment> {
        let workers: Vec<Worker> = roster
            .iter()
            .filter(|w| region.matches_roster_category(&w.region))
            .cloned()
            .collect();

        let (preassigned, pending) = self.split_preassigned(items);
        let preassigned_count = preassigned.len();

        let (urgent, normal): (Vec<WorkItem>, Vec<WorkItem>) =
            pending.into_iter().partition(|item| item.urgent);

        let mut merged = preassigned;
        let mut partitions = Vec::with_capacity(2);
        let mut allocated_count = 0;

        for (class, items) in [(UrgencyClass::Urgent, urgent), (UrgencyClass::Normal, normal)] {
            let key = PartitionKey::new(region.code.clone(), class);
            let (stamped, report) = self.allocate_partition(&key, items, &workers)?;
            allocated_count += stamped.len();
            merged.extend(stamped);
            partitions.push(report);
        }

        sort_by_item_id(&mut merged);

        Ok(RegionAssignment {
            region: region.code.clone(),
            items: merged,
            partitions,
            allocated_count,
            preassigned_count,
        })
    }

    /// 拆出上游已指定人员的事项
    fn split_preassigned(&self, items: Vec<WorkItem>) -> (Vec<WorkItem>, Vec<WorkItem>) {
        if !self.config.respect_preassigned {
            return (Vec::new(), items.into_iter().map(WorkItem::cleared).collect());
        }

        let mut preassigned = Vec::new();
        let mut pending = Vec::new();
        for item in items {
            if item.is_preassigned() {
                let alias = item
                    .assigned_worker
                    .as_deref()
                    .map(|w| w.trim().to_string())
                    .unwrap_or_default();
                preassigned.push(item.cleared().stamped(&alias, AssignmentSource::Preassigned));
            } else {
                pending.push(item.cleared());
            }
        }
        (preassigned, pending)
    }

    // ==========================================
    // 运行级
    // ==========================================

    /// 按配置中的区域拆分批次并逐区域分配
    ///
    /// 特殊事项在进入此处之前已拆出，由调用方挂到报告上
    #[instrument(skip(self, batch, roster), fields(items = batch.len(), workers = roster.len(), executed_at = %self.executed_at))]
    pub fn dispatch(&self, batch: PendingBatch, roster: &[Worker]) -> DispatchReport {
        let PendingBatch { headers, items } = batch;

        let mut by_region: Vec<Vec<WorkItem>> = vec![Vec::new(); self.config.regions.len()];
        let mut unrouted = Vec::new();
        for item in items {
            match self
                .config
                .regions
                .iter()
                .position(|r| r.matches_batch_group(&item.region_tag))
            {
                Some(idx) => by_region[idx].push(item),
                None => unrouted.push(item),
            }
        }

        if !unrouted.is_empty() {
            warn!(count = unrouted.len(), "存在不属于任何区域的事项，不参与分配");
        }

        let regions: Vec<RegionOutcome> = self
            .config
            .regions
            .iter()
            .zip(by_region)
            .map(|(region, items)| {
                let item_count = items.len();
                let result = self.assign_region(region, items, roster);
                match &result {
                    Ok(assignment) => info!(
                        region = %region.code,
                        allocated = assignment.allocated_count,
                        preassigned = assignment.preassigned_count,
                        "区域分配成功"
                    ),
                    Err(err) => warn!(
                        region = %region.code,
                        kind = %err.kind(),
                        error = %err,
                        "区域分配失败"
                    ),
                }
                RegionOutcome {
                    region: region.clone(),
                    item_count,
                    result,
                }
            })
            .collect();

        sort_by_item_id(&mut unrouted);

        DispatchReport {
            executed_at: self.executed_at,
            headers,
            regions,
            special: Vec::new(),
            unrouted,
        }
    }
}

/// 把排除原因汇总成一句话（错误信息用）
fn summarize_exclusions(total: usize, excluded: &[ExcludedWorker]) -> String {
    if total == 0 {
        return "区域名册为空".to_string();
    }

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for ex in excluded {
        let label = match ex.reason {
            ExclusionReason::NoShift => "无班次",
            ExclusionReason::UnparsableShift(_) => "班次无法解析",
            ExclusionReason::OffShift(_) => "不在班",
            ExclusionReason::NotUrgencyEligible => "无紧急资格",
            ExclusionReason::ZeroCapacity => "容量为0",
        };
        *counts.entry(label).or_insert(0) += 1;
    }
    let parts: Vec<String> = counts.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("名册 {} 人全部被排除 ({})", total, parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn worker(alias: &str, category: &str, capacity: &str, shift: &str, urgent: bool) -> Worker {
        let mut w = Worker::new(alias, category);
        w.capacity_raw = Some(capacity.to_string());
        w.shift_raw = Some(shift.to_string());
        w.urgent_eligible = urgent;
        w
    }

    fn item(id: &str, group: &str, urgent: bool) -> WorkItem {
        WorkItem::new(id, group, urgent)
    }

    #[test]
    fn test_empty_partition_is_noop() {
        let partitioner = RegionPartitioner::new(AllocationConfig::default(), at(9, 0));
        let key = PartitionKey::new("NAM", UrgencyClass::Urgent);
        let (stamped, report) = partitioner.allocate_partition(&key, Vec::new(), &[]).unwrap();
        assert!(stamped.is_empty());
        assert!(report.quotas.is_empty());
    }

    #[test]
    fn test_no_eligible_workers_reports_reason() {
        let partitioner = RegionPartitioner::new(AllocationConfig::default(), at(22, 0));
        let key = PartitionKey::new("NAM", UrgencyClass::Normal);
        let roster = vec![worker("a", "CAM IND NAM", "100%", "7 to 5", true)];
        let err = partitioner
            .allocate_partition(&key, vec![item("P1", "CAMERON NAM", false)], &roster)
            .unwrap_err();
        match err {
            AllocationError::NoEligibleWorkers { reason, item_count, .. } => {
                assert_eq!(item_count, 1);
                assert!(reason.contains("不在班=1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_all_zero_capacity_fails_partition() {
        let partitioner = RegionPartitioner::new(AllocationConfig::default(), at(9, 0));
        let key = PartitionKey::new("NAM", UrgencyClass::Normal);
        let roster = vec![worker("a", "CAM IND NAM", "0%", "7 to 5", true)];
        let err = partitioner
            .allocate_partition(&key, vec![item("P1", "CAMERON NAM", false)], &roster)
            .unwrap_err();
        assert!(matches!(err, AllocationError::AllZeroCapacity { worker_count: 1, .. }));
    }

    #[test]
    fn test_assign_region_respects_preassigned() {
        let partitioner = RegionPartitioner::new(AllocationConfig::default(), at(9, 0));
        let region = RegionSpec::new("NAM", "CAMERON NAM", "CAM IND NAM");
        let roster = vec![worker("a", "CAM IND NAM", "100%", "7 to 5", true)];

        let mut pre = item("P2", "CAMERON NAM", false);
        pre.assigned_worker = Some(" zed ".to_string());
        let items = vec![item("P3", "CAMERON NAM", true), pre, item("P1", "CAMERON NAM", false)];

        let assignment = partitioner.assign_region(&region, items, &roster).unwrap();
        assert_eq!(assignment.preassigned_count, 1);
        assert_eq!(assignment.allocated_count, 2);

        let ids: Vec<_> = assignment.items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);
        assert_eq!(assignment.items[1].assigned_worker.as_deref(), Some("zed"));
        assert_eq!(assignment.items[1].source, Some(AssignmentSource::Preassigned));
        assert_eq!(assignment.counts_by_worker().get("a"), Some(&2));
    }

    #[test]
    fn test_assign_region_reassigns_when_configured() {
        let config = AllocationConfig {
            respect_preassigned: false,
            ..AllocationConfig::default()
        };
        let partitioner = RegionPartitioner::new(config, at(9, 0));
        let region = RegionSpec::new("NAM", "CAMERON NAM", "CAM IND NAM");
        let roster = vec![worker("a", "CAM IND NAM", "100%", "7 to 5", false)];

        let mut pre = item("P1", "CAMERON NAM", false);
        pre.assigned_worker = Some("zed".to_string());
        let assignment = partitioner.assign_region(&region, vec![pre], &roster).unwrap();
        assert_eq!(assignment.items[0].assigned_worker.as_deref(), Some("a"));
        assert_eq!(assignment.preassigned_count, 0);
    }

    #[test]
    fn test_dispatch_isolates_region_failures_and_collects_unrouted() {
        let partitioner = RegionPartitioner::new(AllocationConfig::default(), at(9, 0));
        let roster = vec![
            worker("a", "CAM IND NAM", "100%", "7 to 5", true),
            // LAM 唯一人员无紧急资格
            worker("b", "CAM IND LAM", "100%", "7 to 5", false),
        ];
        let batch = PendingBatch::new(
            vec!["ID".to_string()],
            vec![
                item("N1", "CAMERON NAM", true),
                item("L1", "CAMERON LAM", true),
                item("X1", "SOMEWHERE ELSE", false),
            ],
        );

        let report = partitioner.dispatch(batch, &roster);
        assert_eq!(report.regions.len(), 2);
        assert!(report.regions[0].is_success());
        assert!(!report.regions[1].is_success());
        assert!(report.has_failures());
        assert_eq!(report.unrouted.len(), 1);
        assert_eq!(report.item_count(), 3);

        let err = report.regions[1].result.as_ref().unwrap_err();
        assert_eq!(
            err.partition(),
            Some(&PartitionKey::new("LAM", UrgencyClass::Urgent))
        );
    }
}
