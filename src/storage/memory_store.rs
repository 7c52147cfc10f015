/*!
 * 内存数据存储
 *
 * 数据库不可用时的降级实现，语义与 SqliteStore 一致。
 * 每个操作持有一次锁，单条记录的写入对读取方原子可见。
 */

use crate::storage::error::StoreResult;
use crate::storage::store::{history_rank_cmp, AliasEntry, DataStore, HistoryEntry, SyncCursor};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    history: RwLock<BTreeMap<String, HistoryEntry>>,
    aliases: RwLock<BTreeMap<String, String>>,
    cursors: RwLock<HashMap<String, SyncCursor>>,
    revision: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn upsert_history(&self, entry: &HistoryEntry) -> StoreResult<()> {
        {
            let mut history = self.history.write();
            match history.get_mut(&entry.command) {
                Some(existing) => existing.merge(entry),
                None => {
                    let mut fresh = entry.clone();
                    fresh.count = fresh.count.max(0);
                    history.insert(entry.command.clone(), fresh);
                }
            }
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn upsert_alias(&self, entry: &AliasEntry) -> StoreResult<()> {
        self.aliases
            .write()
            .insert(entry.name.clone(), entry.expansion.clone());
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn query_history_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<HistoryEntry>> {
        let mut matches: Vec<HistoryEntry> = {
            let history = self.history.read();
            history
                .range(prefix.to_string()..)
                .take_while(|(command, _)| command.starts_with(prefix))
                .map(|(_, entry)| entry.clone())
                .collect()
        };

        matches.sort_by(history_rank_cmp);
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    async fn all_aliases(&self) -> StoreResult<Vec<AliasEntry>> {
        Ok(self
            .aliases
            .read()
            .iter()
            .map(|(name, expansion)| AliasEntry::new(name.clone(), expansion.clone()))
            .collect())
    }

    async fn sync_cursor(&self, source: &str) -> StoreResult<SyncCursor> {
        Ok(self.cursors.read().get(source).cloned().unwrap_or_default())
    }

    async fn set_sync_cursor(&self, source: &str, cursor: &SyncCursor) -> StoreResult<()> {
        self.cursors.write().insert(source.to_string(), cursor.clone());
        Ok(())
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}
