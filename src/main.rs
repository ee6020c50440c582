// ==========================================
// 工作量感知派单引擎 - 命令行入口
// ==========================================
// 子命令:
// - assign: 执行一次派单（导入 → 分配 → 输出 → 台账）
// - runs:   查看运行台账
// - config: 查看/修改 config_kv 覆写
// 退出码: 0 全部区域成功；2 存在失败区域；1 运行错误
// ==========================================

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use workload_dispatch::api::{DispatchApi, DispatchRequest, DispatchSummary};
use workload_dispatch::config::{config_keys, AllocationConfig, ConfigManager};
use workload_dispatch::db::open_ledger_connection;
use workload_dispatch::repository::RunLedgerRepository;
use workload_dispatch::{logging, APP_NAME, VERSION};

#[derive(Parser)]
#[command(
    name = "workload-dispatch",
    about = "工作量感知派单：按容量与当日负载把待办事项分配给在班人员",
    version,
    propagate_version = true
)]
struct Cli {
    /// 台账数据库路径（默认: <本地数据目录>/workload-dispatch/ledger.db）
    #[arg(long, global = true, env = "WORKLOAD_DISPATCH_LEDGER")]
    ledger: Option<PathBuf>,

    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 对给定快照执行一次派单
    Assign {
        /// 人员名册（CSV/XLSX）
        #[arg(long)]
        roster: PathBuf,

        /// 待办批次（CSV/XLSX）
        #[arg(long)]
        batch: PathBuf,

        /// 当日已派清单（CSV/XLSX）；省略则负载为零
        #[arg(long)]
        load: Option<PathBuf>,

        /// 分配配置 JSON（缺省字段取默认值）
        #[arg(long, env = "WORKLOAD_DISPATCH_CONFIG")]
        config: Option<PathBuf>,

        /// 输出表目录
        #[arg(long, default_value = "./output")]
        output_dir: PathBuf,

        /// 执行时刻，如 "2025-11-26 09:45"（默认: 当前时间）
        #[arg(long, value_parser = parse_execution_time)]
        at: Option<NaiveDateTime>,

        /// 不使用台账（不读配置覆写，不记录运行）
        #[arg(long)]
        no_ledger: bool,
    },

    /// 列出最近运行，或查看单次运行详情
    Runs {
        /// 列出的运行条数
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// 查看该运行的区域结果与按人统计
        #[arg(long)]
        run_id: Option<String>,
    },

    /// 查看或修改台账中的配置覆写
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// 打印生效配置（默认值 + 配置文件 + 覆写）
    Show {
        /// 作为基础的分配配置 JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// 写入一条覆写，如 `allocation/load_boost 1.5`
    Set { key: String, value: String },
}

fn parse_execution_time(raw: &str) -> Result<NaiveDateTime, String> {
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .ok_or_else(|| format!("时间格式应为 'YYYY-MM-DD HH:MM'，实际为 '{}'", raw))
}

/// 默认台账路径
fn default_ledger_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("workload-dispatch").join("ledger.db"),
        None => PathBuf::from("./workload_dispatch.db"),
    }
}

/// 打开共享台账连接
fn open_ledger(path: Option<PathBuf>) -> Result<Arc<Mutex<Connection>>> {
    let path = path.unwrap_or_else(default_ledger_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("无法创建台账目录 {}", parent.display()))?;
    }
    let path_str = path.to_string_lossy();
    let conn = open_ledger_connection(&path_str)
        .with_context(|| format!("无法打开台账 {}", path.display()))?;
    tracing::debug!(path = %path.display(), "台账已打开");
    Ok(Arc::new(Mutex::new(conn)))
}

fn load_base_config(path: Option<&PathBuf>) -> Result<AllocationConfig> {
    match path {
        Some(p) => AllocationConfig::from_json_file(p)
            .with_context(|| format!("无法加载配置文件 {}", p.display())),
        None => Ok(AllocationConfig::default()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);
    tracing::debug!(app = APP_NAME, version = VERSION, "启动");

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "运行失败");
            eprintln!("错误: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Assign {
            roster,
            batch,
            load,
            config,
            output_dir,
            at,
            no_ledger,
        } => {
            let base = load_base_config(config.as_ref())?;
            let (config, ledger) = if no_ledger {
                (base, None)
            } else {
                let conn = open_ledger(cli.ledger)?;
                let manager = ConfigManager::from_connection(conn.clone())?;
                let config = manager.apply_overrides(base)?;
                (config, Some(Arc::new(RunLedgerRepository::from_connection(conn))))
            };

            let request = DispatchRequest {
                roster_path: roster,
                batch_path: batch,
                load_path: load,
                output_dir,
                executed_at: at.unwrap_or_else(|| chrono::Local::now().naive_local()),
            };
            let summary = DispatchApi::new(config, ledger).run(&request)?;
            print_summary(&summary);

            Ok(if summary.report.has_failures() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            })
        }

        Commands::Runs { limit, run_id } => {
            let repo = RunLedgerRepository::from_connection(open_ledger(cli.ledger)?);
            match run_id {
                Some(run_id) => {
                    let run = repo
                        .find_run(&run_id)?
                        .with_context(|| format!("运行 {} 不存在", run_id))?;
                    println!(
                        "{}  执行时刻={}  状态={}  事项={}  特殊={}  未匹配={}",
                        run.run_id,
                        run.executed_at,
                        run.status,
                        run.item_count,
                        run.special_count,
                        run.unrouted_count
                    );
                    for region in repo.list_region_results(&run_id)? {
                        match region.error_message {
                            None => println!(
                                "  {}  成功  分配={}  预指派={}",
                                region.region, region.allocated_count, region.preassigned_count
                            ),
                            Some(msg) => println!(
                                "  {}  失败 [{}]  {}",
                                region.region,
                                region.failure_kind.map(|k| k.to_string()).unwrap_or_default(),
                                msg
                            ),
                        }
                    }
                    for (worker, count) in repo.count_by_worker(&run_id)? {
                        println!("    {:<24} {}", worker, count);
                    }
                }
                None => {
                    for run in repo.list_recent_runs(limit)? {
                        println!(
                            "{}  {}  {:<9}  事项={}  特殊={}  未匹配={}",
                            run.run_id,
                            run.executed_at,
                            run.status,
                            run.item_count,
                            run.special_count,
                            run.unrouted_count
                        );
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Config { subcommand } => {
            let manager = ConfigManager::from_connection(open_ledger(cli.ledger)?)?;
            match subcommand {
                ConfigSubcommand::Show { config } => {
                    let effective = manager.apply_overrides(load_base_config(config.as_ref())?)?;
                    println!("{}", serde_json::to_string_pretty(&effective)?);
                    let overrides = manager.list_values()?;
                    for key in config_keys::ALL {
                        if let Some(value) = overrides.get(*key) {
                            eprintln!("覆写 {} = {}", key, value);
                        }
                    }
                }
                ConfigSubcommand::Set { key, value } => {
                    manager.set_value(&key, &value)?;
                    println!("{} = {}", key, value);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(summary: &DispatchSummary) {
    let report = &summary.report;
    println!(
        "运行 {}  执行时刻={}  状态={}{}",
        summary.run_id,
        report.executed_at,
        summary.status,
        if summary.recorded { "" } else { "  （未记录台账）" }
    );

    for outcome in &report.regions {
        match &outcome.result {
            Ok(assignment) => {
                println!(
                    "  {}  成功  事项={}  分配={}  预指派={}",
                    outcome.region.code,
                    outcome.item_count,
                    assignment.allocated_count,
                    assignment.preassigned_count
                );
                for (worker, count) in assignment.counts_by_worker() {
                    println!("    {:<24} {}", worker, count);
                }
            }
            Err(err) => println!(
                "  {}  失败 [{}]  {}",
                outcome.region.code,
                err.kind(),
                err
            ),
        }
    }

    println!("  特殊={}  未匹配={}", report.special.len(), report.unrouted.len());
    for path in &summary.written_files {
        println!("  已写出 {}", path.display());
    }
}
