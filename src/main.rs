//! ghostline 命令行入口
//!
//! 启动时读取配置、打开存储并启动后台同步，然后为给定的输入打印建议，每行一条。
//! 终端交互层通过反复调用本程序（或直接使用库中的 `SuggestionSession`）获取建议。

use clap::Parser;
use ghostline_lib::completion::{ContextState, ModelSelection, SuggestionSession};
use ghostline_lib::setup::{
    build_ensemble, build_sync_workers, database_path, load_app_config, open_store, sync_schedule,
};
use ghostline_lib::storage::StoragePaths;
use ghostline_lib::sync::launch_sync_workers;
use ghostline_lib::utils::{app_error, init_logging, AppResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 退出前等待正在进行的同步完成的最长时间
const SYNC_EXIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "ghostline")]
#[command(about = "Ranked shell command suggestions from history, aliases and context")]
#[command(version)]
struct Cli {
    /// Partial command to complete
    prefix: Option<String>,

    /// Comma-separated models to use: markov,freq,llm,alias,context (default: all)
    #[arg(long, value_name = "LIST")]
    filter_models: Option<String>,

    /// Maximum number of suggestions
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Config file (default: $GHOSTLINE_CONFIG or the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Exit right after start-up
    #[arg(long)]
    quick_exit: bool,

    /// Wait for the first sync pass before suggesting
    #[arg(long)]
    wait_sync: bool,

    /// Record an accepted suggestion
    #[arg(long, value_name = "TEXT")]
    confirm: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    if let Err(e) = init_logging() {
        eprintln!("继续运行，日志不可用: {e}");
    }

    if cli.limit == Some(0) {
        return Err(app_error("--limit must be at least 1"));
    }

    let paths = StoragePaths::platform_default();
    let mut config = load_app_config(cli.config.as_deref(), &paths).await;
    if let Some(limit) = cli.limit {
        config.ensemble.max_results = limit;
    }
    let selection = ModelSelection::parse(
        cli.filter_models
            .as_deref()
            .unwrap_or(&config.ensemble.active_models),
    );
    for unknown in selection.unknown_names() {
        warn!(model = unknown, "completion.selection.unknown_model");
    }

    let store = open_store(&database_path(&config, &paths)).await;
    let mut sync_handles = launch_sync_workers(
        build_sync_workers(&config.sync, store.clone()),
        sync_schedule(&config.sync),
    );

    if cli.quick_exit {
        debug!("quick exit after start-up");
        return Ok(());
    }
    if cli.wait_sync {
        sync_handles.wait_first_pass().await;
    }

    let context = Arc::new(ContextState::from_env());
    let ensemble = Arc::new(build_ensemble(&config, store.clone(), context.clone()));
    let session = SuggestionSession::new(ensemble, store, context, selection);

    if let Some(text) = cli.confirm.as_deref() {
        session.on_confirm(text).await;
    }

    if let Some(prefix) = cli.prefix.as_deref() {
        for suggestion in session.suggest(prefix).await {
            println!("{suggestion}");
        }
    }

    if tokio::time::timeout(SYNC_EXIT_GRACE, sync_handles.shutdown())
        .await
        .is_err()
    {
        debug!("sync still running at exit; it resumes from its cursor next time");
    }
    Ok(())
}
