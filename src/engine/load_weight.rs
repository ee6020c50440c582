// ==========================================
// 工作量感知派单引擎 - 负载调整权重
// ==========================================
// 公式:
//   load_i   = 紧急分区取 current_urgent_count，否则取 current_total_count
//   max_load = max(load_i)
//   max_load == 0 → effective_i = capacity_i
//   否则         → effective_i = capacity_i × (load_boost − load_i / max_load)
//   effective_i  = max(effective_i, min_effective_weight)
// 红线: 容量为 0 的人员在本步骤之前已移除，下限截断不能让其复活
// ==========================================

use crate::domain::types::PartitionKey;
use crate::engine::capacity::CapacityRatedWorker;
use crate::engine::error::{AllocationError, AllocationResult};
use serde::Serialize;

/// 带有效权重的人员（仅存在于单个分区的计算过程中）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedWorker {
    pub alias: String,
    pub capacity_weight: f64,
    pub load_factor: u32,
    pub effective_weight: f64,
}

// ==========================================
// LoadAdjustedWeightCalculator
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct LoadAdjustedWeightCalculator {
    load_boost: f64,
    min_effective_weight: f64,
}

impl LoadAdjustedWeightCalculator {
    pub fn new(load_boost: f64, min_effective_weight: f64) -> Self {
        Self {
            load_boost,
            min_effective_weight,
        }
    }

    /// 计算分区内每个人员的有效权重
    ///
    /// # 错误
    /// - AllZeroCapacity: 传入人员为空或容量全部为 0
    pub fn calculate(
        &self,
        partition: &PartitionKey,
        rated: &[CapacityRatedWorker],
    ) -> AllocationResult<Vec<WeightedWorker>> {
        let positive: Vec<&CapacityRatedWorker> =
            rated.iter().filter(|r| r.capacity_weight > 0.0).collect();
        if positive.is_empty() {
            return Err(AllocationError::AllZeroCapacity {
                partition: partition.clone(),
                worker_count: rated.len(),
            });
        }

        let class = partition.class;
        let max_load = positive
            .iter()
            .map(|r| r.worker.load_factor(class))
            .max()
            .unwrap_or(0);

        Ok(positive
            .into_iter()
            .map(|r| {
                let load_factor = r.worker.load_factor(class);
                WeightedWorker {
                    alias: r.worker.alias.clone(),
                    capacity_weight: r.capacity_weight,
                    load_factor,
                    effective_weight: self.effective_weight(r.capacity_weight, load_factor, max_load),
                }
            })
            .collect())
    }

    /// 单人有效权重
    pub fn effective_weight(&self, capacity_weight: f64, load_factor: u32, max_load: u32) -> f64 {
        if max_load == 0 {
            return capacity_weight;
        }
        let normalized = f64::from(load_factor) / f64::from(max_load);
        (capacity_weight * (self.load_boost - normalized)).max(self.min_effective_weight)
    }
}

impl Default for LoadAdjustedWeightCalculator {
    fn default() -> Self {
        Self::new(1.25, 0.1)
    }
}
