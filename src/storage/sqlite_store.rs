/*!
 * 基于 SQLite 的数据存储
 */

use crate::storage::database::{DatabaseManager, DatabaseOptions};
use crate::storage::error::StoreResult;
use crate::storage::repositories::{AliasRepo, HistoryRepo, SyncCursorRepo};
use crate::storage::store::{AliasEntry, DataStore, HistoryEntry, SyncCursor};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct SqliteStore {
    database: DatabaseManager,
    revision: AtomicU64,
}

impl SqliteStore {
    /// 打开（必要时创建）数据库并执行建表脚本
    pub async fn open(db_path: &Path, options: DatabaseOptions) -> StoreResult<Self> {
        let database = DatabaseManager::new(db_path, options).await?;
        database.initialize().await?;
        Ok(Self::new(database))
    }

    pub fn new(database: DatabaseManager) -> Self {
        Self {
            database,
            revision: AtomicU64::new(0),
        }
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    fn bump_revision(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn upsert_history(&self, entry: &HistoryEntry) -> StoreResult<()> {
        HistoryRepo::new(&self.database).upsert(entry).await?;
        self.bump_revision();
        Ok(())
    }

    async fn upsert_alias(&self, entry: &AliasEntry) -> StoreResult<()> {
        AliasRepo::new(&self.database).upsert(entry).await?;
        self.bump_revision();
        Ok(())
    }

    async fn query_history_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<HistoryEntry>> {
        HistoryRepo::new(&self.database)
            .find_by_prefix(prefix, limit)
            .await
    }

    async fn all_aliases(&self) -> StoreResult<Vec<AliasEntry>> {
        AliasRepo::new(&self.database).find_all().await
    }

    async fn sync_cursor(&self, source: &str) -> StoreResult<SyncCursor> {
        SyncCursorRepo::new(&self.database).get(source).await
    }

    async fn set_sync_cursor(&self, source: &str, cursor: &SyncCursor) -> StoreResult<()> {
        SyncCursorRepo::new(&self.database).set(source, cursor).await
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}
