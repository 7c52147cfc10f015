/*!
 * SQLite 连接管理
 *
 * 同步任务和交互查询共用一个连接池。WAL 模式下读写互不阻塞，
 * 写锁竞争由 busy_timeout 排队等待。
 */

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::sql_scripts::SqlScriptCatalog;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::ConnectOptions;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// 连接池参数
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: NonZeroU32,
    /// 从连接池取连接的最长等待
    pub connection_timeout: Duration,
    /// 写锁被占用时的最长等待
    pub busy_timeout: Duration,
    pub wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: NonZeroU32::new(4).unwrap_or(NonZeroU32::MIN),
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            wal: true,
        }
    }
}

impl DatabaseOptions {
    fn connect_options(&self, db_path: &Path) -> SqliteConnectOptions {
        let journal = if self.wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(journal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            .disable_statement_logging()
    }
}

#[derive(Debug)]
pub struct DatabaseManager {
    pool: SqlitePool,
    path: PathBuf,
}

impl DatabaseManager {
    /// 建立连接池，数据库文件所在目录不存在时自动创建
    pub async fn new(db_path: &Path, options: DatabaseOptions) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::io(format!("creating database directory {}", parent.display()), e)
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(options.max_connections.get())
            .acquire_timeout(options.connection_timeout)
            .idle_timeout(Some(Duration::from_secs(30)))
            .connect_with(options.connect_options(db_path))
            .await?;

        debug!(path = %db_path.display(), max_connections = options.max_connections.get(), "storage.database.connected");
        Ok(Self {
            pool,
            path: db_path.to_path_buf(),
        })
    }

    /// 执行建表脚本，脚本全部使用 IF NOT EXISTS，可重复调用
    pub async fn initialize(&self) -> StoreResult<()> {
        let scripts = SqlScriptCatalog::embedded()?;
        let mut executed = 0usize;

        for script in &scripts {
            for statement in &script.statements {
                sqlx::query(statement)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StoreError::SqlScript {
                        script: script.name.clone(),
                        reason: e.to_string(),
                    })?;
                executed += 1;
            }
        }

        info!(path = %self.path.display(), statements = executed, "storage.database.ready");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
