// ==========================================
// 工作量感知派单引擎 - 按比例配额分配
// ==========================================
// 红线: 配额之和 == 分区事项数，且无负配额
// 红线: 同一输入必须得到同一配额（显式排序键，不依赖 HashMap 顺序）
// ==========================================
// 步骤:
// 1) raw_i = round(N × w_i / W)
// 2) diff = N − Σ raw_i
//    diff > 0: 按 (负载升序, 别名升序) 循环 +1
//    diff < 0: 按 (负载降序, 别名升序) 循环 −1，已为 0 的人员跳过
// ==========================================

use crate::config::RoundingMode;
use crate::domain::types::PartitionKey;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::load_weight::WeightedWorker;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// 单个人员在分区内的配额（审计用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerQuota {
    pub alias: String,
    pub capacity_weight: f64,
    pub load_factor: u32,
    pub effective_weight: f64,
    pub raw_quota: i64,
    pub quota: usize,
}

/// 指派顺序：负载升序，别名升序
pub fn assignment_order(a: &WeightedWorker, b: &WeightedWorker) -> Ordering {
    a.load_factor
        .cmp(&b.load_factor)
        .then_with(|| a.alias.cmp(&b.alias))
}

/// 削减顺序：负载降序，别名升序
fn trim_order(a: &WeightedWorker, b: &WeightedWorker) -> Ordering {
    b.load_factor
        .cmp(&a.load_factor)
        .then_with(|| a.alias.cmp(&b.alias))
}

// ==========================================
// ProportionalAllocator - 比例分配器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalAllocator {
    rounding: RoundingMode,
}

impl ProportionalAllocator {
    pub fn new(rounding: RoundingMode) -> Self {
        Self { rounding }
    }

    /// 计算分区配额
    ///
    /// # 参数
    /// - partition: 分区键（错误信息用）
    /// - item_count: 分区待分配事项数
    /// - weighted: 有效权重人员（顺序无关）
    ///
    /// # 返回
    /// 按指派顺序（负载升序、别名升序）排列的配额列表
    #[instrument(skip(self, weighted), fields(partition = %partition, workers = weighted.len()))]
    pub fn allocate(
        &self,
        partition: &PartitionKey,
        item_count: usize,
        weighted: &[WeightedWorker],
    ) -> AllocationResult<Vec<WorkerQuota>> {
        if weighted.is_empty() {
            return Err(AllocationError::NoEligibleWorkers {
                partition: partition.clone(),
                item_count,
                reason: "有效权重人员为空".to_string(),
            });
        }

        let mut ordered: Vec<WeightedWorker> = weighted.to_vec();
        ordered.sort_by(assignment_order);

        let total_weight: f64 = ordered.iter().map(|w| w.effective_weight).sum();
        let n = item_count as f64;

        let raw: Vec<i64> = ordered
            .iter()
            .map(|w| self.rounding.round(n * w.effective_weight / total_weight) as i64)
            .collect();
        let mut quotas = raw.clone();

        let diff = item_count as i64 - quotas.iter().sum::<i64>();
        if diff != 0 {
            debug!(diff = diff, "配额取整存在余差，执行修正");
        }
        if diff > 0 {
            // ordered 已是 (负载升序, 别名升序)
            let len = quotas.len();
            for step in 0..diff as usize {
                quotas[step % len] += 1;
            }
        } else if diff < 0 {
            let mut trim_idx: Vec<usize> = (0..ordered.len()).collect();
            trim_idx.sort_by(|&a, &b| trim_order(&ordered[a], &ordered[b]));

            let mut remaining = -diff;
            let mut cursor = 0usize;
            // Σ quotas > N >= 0，必然存在正配额，循环可终止
            while remaining > 0 {
                let idx = trim_idx[cursor % trim_idx.len()];
                if quotas[idx] > 0 {
                    quotas[idx] -= 1;
                    remaining -= 1;
                }
                cursor += 1;
            }
        }

        let result: Vec<WorkerQuota> = ordered
            .into_iter()
            .zip(raw)
            .zip(quotas)
            .map(|((w, raw_quota), quota)| WorkerQuota {
                alias: w.alias,
                capacity_weight: w.capacity_weight,
                load_factor: w.load_factor,
                effective_weight: w.effective_weight,
                raw_quota,
                quota: quota.max(0) as usize,
            })
            .collect();

        debug_assert_eq!(result.iter().map(|q| q.quota).sum::<usize>(), item_count);
        Ok(result)
    }
}
