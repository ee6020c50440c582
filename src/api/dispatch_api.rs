// ==========================================
// 工作量感知派单引擎 - 派单 API
// ==========================================
// 职责: 编排一次完整运行
//   导入名册 → 叠加当日负载 → 导入批次 → 拆特殊事项
//   → 分区分配 → 写输出表 → 写运行台账
// 红线: 列检查失败时不做任何分配、不写任何输出
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AllocationConfig;
use crate::domain::dispatch_run::{AssignmentRecord, DispatchRun, RegionRunRecord, RunStatus};
use crate::domain::types::AssignmentSource;
use crate::engine::partitioner::{DispatchReport, RegionPartitioner};
use crate::exporter::AssignmentWriter;
use crate::importer::{split_special, BatchImporter, LoadImporter, RosterImporter};
use crate::repository::RunLedgerRepository;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 请求 / 响应
// ==========================================

/// 一次派单运行的输入
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRequest {
    pub roster_path: PathBuf,
    pub batch_path: PathBuf,
    pub load_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub executed_at: NaiveDateTime,
}

impl DispatchRequest {
    /// 台账中记录的来源文件（JSON）
    fn source_files_json(&self) -> Option<String> {
        serde_json::to_string(&serde_json::json!({
            "roster": self.roster_path.display().to_string(),
            "batch": self.batch_path.display().to_string(),
            "load": self.load_path.as_ref().map(|p| p.display().to_string()),
        }))
        .ok()
    }
}

/// 一次派单运行的结果
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub report: DispatchReport,
    pub written_files: Vec<PathBuf>,
    pub recorded: bool,
}

// ==========================================
// DispatchApi
// ==========================================
pub struct DispatchApi {
    config: AllocationConfig,
    ledger: Option<Arc<RunLedgerRepository>>,
}

impl DispatchApi {
    /// # 参数
    /// - config: 生效配置（已叠加 config_kv 覆写）
    /// - ledger: 运行台账，None 表示不落库
    pub fn new(config: AllocationConfig, ledger: Option<Arc<RunLedgerRepository>>) -> Self {
        Self { config, ledger }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// 执行一次完整派单
    ///
    /// 顺序: 导入 → 分配 → 写输出表 → 写台账。
    /// 台账写入失败时输出表已落盘且不回收，返回 Err，台账中无此运行记录；
    /// 重跑会覆盖同目录下的输出表。
    ///
    /// # 返回
    /// - Ok(DispatchSummary): 运行完成（区域可能部分失败，见 status）
    /// - Err(ApiError): 配置/导入/导出/台账错误，整个运行失败
    #[instrument(skip(self, request), fields(executed_at = %request.executed_at))]
    pub fn run(&self, request: &DispatchRequest) -> ApiResult<DispatchSummary> {
        self.config.validate()?;
        let columns = &self.config.columns;
        let special_pattern = self.config.special_id_regex()?;

        // 1. 快照导入（任何缺列都在此处终止）
        let roster = RosterImporter::new(columns.roster.clone()).import_file(&request.roster_path)?;
        let load = LoadImporter::new(columns.load.clone())
            .import_optional(request.load_path.as_ref(), request.executed_at.date())?;
        let roster = load.apply(&roster);
        let batch = BatchImporter::new(columns.batch.clone()).import_file(&request.batch_path)?;

        // 2. 特殊事项拆分 + 分区分配
        let (special, regular) = split_special(batch, &special_pattern);
        let partitioner = RegionPartitioner::new(self.config.clone(), request.executed_at);
        let mut report = partitioner.dispatch(regular, &roster);
        report.special = special;

        // 3. 输出表
        let written_files =
            AssignmentWriter::new(&request.output_dir, columns.batch.clone()).write_report(&report)?;

        // 4. 运行台账
        let run_id = Uuid::new_v4().to_string();
        let recorded_at = chrono::Local::now().naive_local();
        let (run, regions, assignments) = build_ledger_records(
            &run_id,
            &report,
            self.config.to_snapshot_json().ok(),
            request.source_files_json(),
            recorded_at,
        );

        let recorded = match &self.ledger {
            Some(ledger) => {
                if let Err(e) = ledger.record_run(&run, &regions, &assignments) {
                    warn!(
                        run_id = %run_id,
                        output_dir = %request.output_dir.display(),
                        files = written_files.len(),
                        error = %e,
                        "台账写入失败，输出表已写出但无运行记录"
                    );
                    return Err(e.into());
                }
                true
            }
            None => false,
        };

        if report.has_failures() {
            warn!(run_id = %run_id, status = %run.status, "派单运行存在失败区域");
        } else {
            info!(run_id = %run_id, items = run.item_count, "派单运行完成");
        }

        Ok(DispatchSummary {
            run_id,
            status: run.status,
            report,
            written_files,
            recorded,
        })
    }

    /// 按 run_id 查询运行（台账未启用时报错）
    pub fn find_run(&self, run_id: &str) -> ApiResult<DispatchRun> {
        let ledger = self
            .ledger
            .as_ref()
            .ok_or_else(|| ApiError::InvalidInput("未启用运行台账".to_string()))?;
        ledger
            .find_run(run_id)?
            .ok_or_else(|| ApiError::NotFound(format!("dispatch_run(id={})不存在", run_id)))
    }
}

/// 由运行结果构建台账记录
///
/// - item_count 为参与分区的事项数（不含特殊与未匹配）
/// - 指派明细只包含成功区域的事项
pub fn build_ledger_records(
    run_id: &str,
    report: &DispatchReport,
    config_snapshot_json: Option<String>,
    source_files: Option<String>,
    recorded_at: NaiveDateTime,
) -> (DispatchRun, Vec<RegionRunRecord>, Vec<AssignmentRecord>) {
    let mut regions = Vec::with_capacity(report.regions.len());
    let mut assignments = Vec::new();

    for outcome in &report.regions {
        match &outcome.result {
            Ok(assignment) => {
                regions.push(RegionRunRecord {
                    run_id: run_id.to_string(),
                    region: outcome.region.code.clone(),
                    succeeded: true,
                    allocated_count: assignment.allocated_count,
                    preassigned_count: assignment.preassigned_count,
                    failure_kind: None,
                    error_message: None,
                });
                assignments.extend(assignment.items.iter().filter_map(|item| {
                    item.assigned_worker.as_ref().map(|worker| AssignmentRecord {
                        run_id: run_id.to_string(),
                        item_id: item.item_id.clone(),
                        region: outcome.region.code.clone(),
                        urgent: item.urgent,
                        worker: worker.clone(),
                        source: item.source.unwrap_or(AssignmentSource::Allocated),
                    })
                }));
            }
            Err(err) => regions.push(RegionRunRecord {
                run_id: run_id.to_string(),
                region: outcome.region.code.clone(),
                succeeded: false,
                allocated_count: 0,
                preassigned_count: 0,
                failure_kind: Some(err.kind()),
                error_message: Some(err.to_string()),
            }),
        }
    }

    let succeeded = regions.iter().filter(|r| r.succeeded).count();
    let failed = regions.len() - succeeded;

    let run = DispatchRun {
        run_id: run_id.to_string(),
        executed_at: report.executed_at,
        recorded_at,
        status: RunStatus::from_counts(succeeded, failed),
        item_count: report.regions.iter().map(|r| r.item_count).sum(),
        special_count: report.special.len(),
        unrouted_count: report.unrouted.len(),
        config_snapshot_json,
        source_files,
    };

    (run, regions, assignments)
}
