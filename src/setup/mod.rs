//! 应用程序初始化
//!
//! 把配置、存储、同步任务和集成引擎组装起来，供命令行入口和集成测试使用。
//! 这里的失败都不是致命的：配置错误退回默认值，数据库不可用退回内存存储。

use crate::completion::{build_models, ContextState, Ensemble, EnsembleConfig};
use crate::config::{load_config, resolve_config_path, AppConfig, SyncSettings};
use crate::loaders::{Loader, RcFileAliasLoader, ShellAliasLoader, ShellHistoryLoader};
use crate::storage::{
    AliasEntry, DataStore, DatabaseOptions, MemoryStore, SqliteStore, StoragePaths,
};
use crate::sync::{AliasSyncWorker, HistorySyncWorker, SyncSchedule, SyncWorker};
use crate::utils::error::{app_error_with_context, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 读取配置；文件无法解析时记录警告并使用默认配置
pub async fn load_app_config(explicit: Option<&Path>, paths: &StoragePaths) -> AppConfig {
    let config_path = resolve_config_path(explicit, paths.config_file());
    match load_config(&config_path).await {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %config_path.display(), error = %format!("{err:#}"), "config.load_failed");
            AppConfig::default()
        }
    }
}

/// 数据库文件位置：配置优先，其次平台数据目录
pub fn database_path(config: &AppConfig, paths: &StoragePaths) -> PathBuf {
    config
        .storage
        .database_path
        .clone()
        .unwrap_or_else(|| paths.database_file())
}

async fn open_sqlite(path: &Path) -> AppResult<SqliteStore> {
    SqliteStore::open(path, DatabaseOptions::default())
        .await
        .map_err(app_error_with_context("无法打开数据库"))
}

/// 打开持久化存储，失败时退回内存存储
pub async fn open_store(path: &Path) -> Arc<dyn DataStore> {
    match open_sqlite(path).await {
        Ok(store) => {
            info!(path = %path.display(), "storage.opened");
            Arc::new(store)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %format!("{err:#}"), "storage.fallback_to_memory");
            Arc::new(MemoryStore::new())
        }
    }
}

/// 同步运行计划：间隔为 0 时只同步一次
pub fn sync_schedule(settings: &SyncSettings) -> SyncSchedule {
    match settings.refresh_interval_secs {
        0 => SyncSchedule::once(),
        secs => SyncSchedule::every(Duration::from_secs(secs)),
    }
}

/// 历史同步与别名同步两个任务
///
/// 别名先读 rc 文件再读 shell 输出，同名时以 shell 中实际生效的定义为准。
pub fn build_sync_workers(
    settings: &SyncSettings,
    store: Arc<dyn DataStore>,
) -> Vec<Arc<dyn SyncWorker>> {
    let history_loader = match &settings.history_file {
        Some(path) => ShellHistoryLoader::new(path.clone()),
        None => ShellHistoryLoader::auto(),
    };

    let rc_loader = match &settings.alias_files {
        Some(files) => RcFileAliasLoader::new(files.clone()),
        None => RcFileAliasLoader::default_files(),
    };
    let shell_loader = match &settings.shell {
        Some(shell) => ShellAliasLoader::new(shell.clone()),
        None => ShellAliasLoader::from_env(),
    }
    .with_timeout(Duration::from_millis(settings.alias_command_timeout_ms));
    let alias_loaders: Vec<Arc<dyn Loader<Record = AliasEntry>>> =
        vec![Arc::new(rc_loader), Arc::new(shell_loader)];

    vec![
        Arc::new(HistorySyncWorker::new(store.clone(), Arc::new(history_loader))),
        Arc::new(AliasSyncWorker::new(store, alias_loaders)),
    ]
}

/// 按配置创建集成引擎并注册全部模型
pub fn build_ensemble(
    config: &AppConfig,
    store: Arc<dyn DataStore>,
    context: Arc<ContextState>,
) -> Ensemble {
    Ensemble::with_models(
        EnsembleConfig::from_settings(&config.ensemble),
        build_models(config, store, context),
    )
}
