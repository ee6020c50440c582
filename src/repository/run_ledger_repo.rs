// ==========================================
// 工作量感知派单引擎 - 派单运行台账仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 一次运行的 run / region / assignment 在同一事务内写入
// ==========================================

use crate::db::open_ledger_connection;
use crate::domain::dispatch_run::{AssignmentRecord, DispatchRun, RegionRunRecord, RunStatus};
use crate::domain::types::{AssignmentSource, FailureKind};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::info;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_datetime(field: &str, value: &str) -> RepositoryResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FMT).map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("'{}': {}", value, e),
    })
}

/// dispatch_run 原始行（日期在闭包外解析，便于返回仓储错误）
struct RunRow {
    run_id: String,
    executed_at: String,
    recorded_at: String,
    status: String,
    item_count: i64,
    special_count: i64,
    unrouted_count: i64,
    config_snapshot_json: Option<String>,
    source_files: Option<String>,
}

impl RunRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            executed_at: row.get(1)?,
            recorded_at: row.get(2)?,
            status: row.get(3)?,
            item_count: row.get(4)?,
            special_count: row.get(5)?,
            unrouted_count: row.get(6)?,
            config_snapshot_json: row.get(7)?,
            source_files: row.get(8)?,
        })
    }

    fn into_run(self) -> RepositoryResult<DispatchRun> {
        Ok(DispatchRun {
            executed_at: parse_datetime("executed_at", &self.executed_at)?,
            recorded_at: parse_datetime("recorded_at", &self.recorded_at)?,
            run_id: self.run_id,
            status: RunStatus::from_str(&self.status),
            item_count: self.item_count.max(0) as usize,
            special_count: self.special_count.max(0) as usize,
            unrouted_count: self.unrouted_count.max(0) as usize,
            config_snapshot_json: self.config_snapshot_json,
            source_files: self.source_files,
        })
    }
}

const RUN_COLUMNS: &str = "run_id, executed_at, recorded_at, status, item_count, special_count, \
                           unrouted_count, config_snapshot_json, source_files";

// ==========================================
// RunLedgerRepository - 运行台账仓储
// ==========================================
pub struct RunLedgerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RunLedgerRepository {
    /// 打开台账库（不存在则建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_ledger_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一次完整运行
    pub fn record_run(
        &self,
        run: &DispatchRun,
        regions: &[RegionRunRecord],
        assignments: &[AssignmentRecord],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            &format!(
                "INSERT INTO dispatch_run ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                RUN_COLUMNS
            ),
            params![
                run.run_id,
                run.executed_at.format(DATETIME_FMT).to_string(),
                run.recorded_at.format(DATETIME_FMT).to_string(),
                run.status.to_db_str(),
                run.item_count as i64,
                run.special_count as i64,
                run.unrouted_count as i64,
                run.config_snapshot_json,
                run.source_files,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO dispatch_region_result (
                    run_id, region, succeeded, allocated_count, preassigned_count,
                    failure_kind, error_message
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            )?;
            for region in regions {
                stmt.execute(params![
                    region.run_id,
                    region.region,
                    if region.succeeded { 1 } else { 0 },
                    region.allocated_count as i64,
                    region.preassigned_count as i64,
                    region.failure_kind.map(|k| k.to_db_str()),
                    region.error_message,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO dispatch_assignment (
                    run_id, item_id, region, urgent, worker, source
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )?;
            for a in assignments {
                stmt.execute(params![
                    a.run_id,
                    a.item_id,
                    a.region,
                    if a.urgent { 1 } else { 0 },
                    a.worker,
                    a.source.to_db_str(),
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(
            run_id = %run.run_id,
            status = %run.status,
            regions = regions.len(),
            assignments = assignments.len(),
            "运行台账已写入"
        );
        Ok(())
    }

    /// 按执行时刻倒序列出最近的运行
    pub fn list_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<DispatchRun>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM dispatch_run ORDER BY executed_at DESC, recorded_at DESC, run_id LIMIT ?1",
            RUN_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], RunRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RunRow::into_run).collect()
    }

    /// 按 run_id 查询
    pub fn find_run(&self, run_id: &str) -> RepositoryResult<Option<DispatchRun>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM dispatch_run WHERE run_id = ?1", RUN_COLUMNS),
                params![run_id],
                RunRow::from_row,
            )
            .optional()?;
        row.map(RunRow::into_run).transpose()
    }

    /// 查询运行的区域结果
    pub fn list_region_results(&self, run_id: &str) -> RepositoryResult<Vec<RegionRunRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT run_id, region, succeeded, allocated_count, preassigned_count,
                      failure_kind, error_message
               FROM dispatch_region_result WHERE run_id = ?1 ORDER BY region"#,
        )?;
        let records = stmt
            .query_map(params![run_id], |row| {
                Ok(RegionRunRecord {
                    run_id: row.get(0)?,
                    region: row.get(1)?,
                    succeeded: row.get::<_, i64>(2)? != 0,
                    allocated_count: row.get::<_, i64>(3)?.max(0) as usize,
                    preassigned_count: row.get::<_, i64>(4)?.max(0) as usize,
                    failure_kind: row
                        .get::<_, Option<String>>(5)?
                        .and_then(|s| FailureKind::from_str(&s)),
                    error_message: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 查询运行的全部指派（按区域、事项 ID 排序）
    pub fn list_assignments(&self, run_id: &str) -> RepositoryResult<Vec<AssignmentRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT run_id, item_id, region, urgent, worker, source
               FROM dispatch_assignment WHERE run_id = ?1 ORDER BY region, item_id"#,
        )?;
        let records = stmt
            .query_map(params![run_id], |row| {
                Ok(AssignmentRecord {
                    run_id: row.get(0)?,
                    item_id: row.get(1)?,
                    region: row.get(2)?,
                    urgent: row.get::<_, i64>(3)? != 0,
                    worker: row.get(4)?,
                    source: AssignmentSource::from_str(&row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 每个人员在一次运行中的指派数（按人员别名排序）
    pub fn count_by_worker(&self, run_id: &str) -> RepositoryResult<Vec<(String, usize)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT worker, COUNT(*) FROM dispatch_assignment
               WHERE run_id = ?1 GROUP BY worker ORDER BY worker"#,
        )?;
        let counts = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}
