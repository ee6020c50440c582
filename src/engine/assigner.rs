// ==========================================
// 工作量感知派单引擎 - 顺序指派
// ==========================================
// 规则: 人员按配额顺序（负载升序、别名升序）依次领取
//       批次中接下来的 quota 个事项；无随机性
// ==========================================

use crate::domain::types::AssignmentSource;
use crate::domain::work_item::WorkItem;
use crate::engine::allocator::WorkerQuota;

#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialAssigner;

impl SequentialAssigner {
    pub fn new() -> Self {
        Self
    }

    /// 按配额盖章
    ///
    /// # 参数
    /// - items: 分区事项（批次顺序）
    /// - quotas: 配额（已按指派顺序排列，Σquota == items.len()）
    pub fn assign(&self, items: Vec<WorkItem>, quotas: &[WorkerQuota]) -> Vec<WorkItem> {
        debug_assert_eq!(quotas.iter().map(|q| q.quota).sum::<usize>(), items.len());

        let mut slots = quotas
            .iter()
            .flat_map(|q| std::iter::repeat(q.alias.as_str()).take(q.quota));

        items
            .into_iter()
            .filter_map(|item| {
                slots
                    .next()
                    .map(|alias| item.stamped(alias, AssignmentSource::Allocated))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(alias: &str, quota: usize) -> WorkerQuota {
        WorkerQuota {
            alias: alias.to_string(),
            capacity_weight: 1.0,
            load_factor: 0,
            effective_weight: 1.0,
            raw_quota: quota as i64,
            quota,
        }
    }

    #[test]
    fn test_assign_in_quota_order() {
        let items: Vec<_> = ["P1", "P2", "P3", "P4", "P5"]
            .iter()
            .map(|id| WorkItem::new(*id, "CAMERON NAM", false))
            .collect();
        let stamped = SequentialAssigner::new().assign(items, &[quota("b", 2), quota("a", 0), quota("c", 3)]);

        let workers: Vec<_> = stamped.iter().map(|i| i.assigned_worker.as_deref().unwrap()).collect();
        assert_eq!(workers, vec!["b", "b", "c", "c", "c"]);
        assert!(stamped.iter().all(|i| i.source == Some(AssignmentSource::Allocated)));
        assert_eq!(stamped[0].item_id, "P1");
    }

    #[test]
    fn test_assign_empty() {
        let stamped = SequentialAssigner::new().assign(Vec::new(), &[quota("a", 0)]);
        assert!(stamped.is_empty());
    }
}
