/*!
 * 历史与别名同步任务
 */

use super::{SyncError, SyncReport, SyncResult, SyncWorker};
use crate::loaders::{LoadError, Loader};
use crate::storage::{AliasEntry, DataStore, HistoryEntry, SyncCursor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// 每合并多少条记录保存一次游标
const CURSOR_FLUSH_EVERY: usize = 256;
/// 锚点保存最后几条已合并的记录
const ANCHOR_LEN: usize = 8;

/// 锚点中的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AnchorRecord {
    command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ts: Option<i64>,
}

impl AnchorRecord {
    fn of(entry: &HistoryEntry) -> Self {
        Self {
            command: entry.command.clone(),
            ts: entry.timestamp.map(|ts| ts.timestamp()),
        }
    }

    fn matches(&self, entry: &HistoryEntry) -> bool {
        self.command == entry.command && self.ts == entry.timestamp.map(|ts| ts.timestamp())
    }
}

/// 已合并到 `merged.len()` 条时的游标
fn cursor_after(merged: &[HistoryEntry]) -> SyncCursor {
    let tail = &merged[merged.len().saturating_sub(ANCHOR_LEN)..];
    let anchor: Vec<AnchorRecord> = tail.iter().map(AnchorRecord::of).collect();
    SyncCursor {
        position: merged.len() as u64,
        anchor: serde_json::to_string(&anchor).unwrap_or_default(),
    }
}

/// 在新读取的记录中找到上次停下的位置
///
/// 历史文件达到容量上限后会从头部丢弃旧记录，锚点随之前移，
/// 所以从上次的位置往前查找；锚点的前几条可能已经被丢弃，只比较仍在文件中的部分。
/// 返回 `None` 表示锚点已不在文件中。
fn resume_position(records: &[HistoryEntry], cursor: &SyncCursor) -> Option<usize> {
    if cursor.position == 0 {
        return Some(0);
    }

    let anchor: Vec<AnchorRecord> = serde_json::from_str(&cursor.anchor).unwrap_or_default();
    let position = usize::try_from(cursor.position).unwrap_or(usize::MAX);
    if anchor.is_empty() {
        // 没有锚点的游标只能按条数判断
        return (position <= records.len()).then_some(position);
    }

    (1..=position.min(records.len())).rev().find(|&end| {
        let overlap = anchor.len().min(end);
        records[end - overlap..end]
            .iter()
            .zip(&anchor[anchor.len() - overlap..])
            .all(|(entry, anchored)| anchored.matches(entry))
    })
}

/// 历史同步
///
/// 游标记录已合并的条数和最后几条记录的内容，每轮只写入锚点之后的新增部分，
/// 所以周期性刷新、进程重启以及历史文件滚动都不会重复累加次数。
pub struct HistorySyncWorker {
    name: String,
    store: Arc<dyn DataStore>,
    loader: Arc<dyn Loader<Record = HistoryEntry>>,
}

impl HistorySyncWorker {
    pub fn new(store: Arc<dyn DataStore>, loader: Arc<dyn Loader<Record = HistoryEntry>>) -> Self {
        Self {
            name: format!("history:{}", loader.name()),
            store,
            loader,
        }
    }

    async fn save_cursor(&self, source: &str, merged: &[HistoryEntry]) -> SyncResult<()> {
        self.store
            .set_sync_cursor(source, &cursor_after(merged))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SyncWorker for HistorySyncWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> SyncResult<SyncReport> {
        let records = self.loader.load().await?;
        let source = self.loader.source_key();
        let mut report = SyncReport::new(&self.name);
        report.loaded = records.len();

        let stored = self.store.sync_cursor(&source).await?;
        let cursor = resume_position(&records, &stored).unwrap_or_else(|| {
            // 文件被替换或截断，从头开始
            debug!(worker = %self.name, source = %source, stored = stored.position, loaded = records.len(), "sync.history.anchor_lost");
            0
        });
        report.skipped = cursor;

        for (position, record) in records.iter().enumerate().skip(cursor) {
            if let Err(error) = self.store.upsert_history(record).await {
                // 游标停在最后一条成功合并的记录之后，下一轮从这里继续
                if position > cursor {
                    if let Err(cursor_error) = self.save_cursor(&source, &records[..position]).await {
                        warn!(worker = %self.name, error = %cursor_error, "sync.history.cursor_save_failed");
                    }
                }
                return Err(SyncError::Store(error));
            }
            report.merged += 1;

            if report.merged % CURSOR_FLUSH_EVERY == 0 {
                self.save_cursor(&source, &records[..=position]).await?;
            }
        }

        let latest = cursor_after(&records);
        if latest != stored {
            self.store.set_sync_cursor(&source, &latest).await?;
        }

        debug!(
            worker = %self.name,
            source = %source,
            loaded = report.loaded,
            merged = report.merged,
            skipped = report.skipped,
            "sync.history.pass_done"
        );
        Ok(report)
    }
}

/// 别名同步
///
/// 每轮完整重写：别名写入是覆盖语义，重复执行不改变结果。
/// 多个加载器按顺序处理，同名别名以最后出现的定义为准。
pub struct AliasSyncWorker {
    store: Arc<dyn DataStore>,
    loaders: Vec<Arc<dyn Loader<Record = AliasEntry>>>,
}

impl AliasSyncWorker {
    pub fn new(store: Arc<dyn DataStore>, loaders: Vec<Arc<dyn Loader<Record = AliasEntry>>>) -> Self {
        Self { store, loaders }
    }

    /// 依次加载，单个加载器失败只跳过它；全部失败时返回最后一个错误
    async fn load_all(&self) -> Result<Vec<AliasEntry>, LoadError> {
        let mut aliases = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for loader in &self.loaders {
            match loader.load().await {
                Ok(records) => {
                    succeeded += 1;
                    aliases.extend(records);
                }
                Err(error) => {
                    debug!(loader = loader.name(), error = %error, "sync.alias.loader_skipped");
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) if succeeded == 0 => Err(error),
            _ => Ok(aliases),
        }
    }
}

#[async_trait]
impl SyncWorker for AliasSyncWorker {
    fn name(&self) -> &str {
        "alias"
    }

    async fn run(&self) -> SyncResult<SyncReport> {
        let aliases = self.load_all().await?;
        let mut report = SyncReport::new(self.name());
        report.loaded = aliases.len();

        for alias in &aliases {
            self.store.upsert_alias(alias).await?;
            report.merged += 1;
        }

        debug!(worker = self.name(), merged = report.merged, "sync.alias.pass_done");
        Ok(report)
    }
}
