/*!
 * 数据存储接口
 *
 * 同步任务通过这里写入历史和别名，预测模型通过这里读取。
 * 实现必须保证单条记录的写入是原子的：读取方可能看到同步进行到任意位置，
 * 但不会看到写了一半的记录。
 */

use crate::storage::error::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 历史命令条目，按命令文本唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub command: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub count: i64,
}

impl HistoryEntry {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timestamp: None,
            count: 1,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    /// 合并同一命令的另一条记录：次数累加，时间取较新的
    pub fn merge(&mut self, other: &HistoryEntry) {
        self.count = self.count.saturating_add(other.count.max(0));
        self.timestamp = match (self.timestamp, other.timestamp) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// 别名定义，按别名唯一，后写入的覆盖先前的
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AliasEntry {
    pub name: String,
    pub expansion: String,
}

impl AliasEntry {
    pub fn new(name: impl Into<String>, expansion: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expansion: expansion.into(),
        }
    }
}

/// 同步游标
///
/// `position` 是数据源中已合并的记录条数；`anchor` 由同步任务编码，
/// 描述最后几条已合并记录的内容，存储层只负责原样保存。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCursor {
    pub position: u64,
    pub anchor: String,
}

/// 数据存储
#[async_trait]
pub trait DataStore: Send + Sync {
    /// 写入历史命令，同一命令合并次数
    async fn upsert_history(&self, entry: &HistoryEntry) -> StoreResult<()>;

    /// 写入别名，同名覆盖
    async fn upsert_alias(&self, entry: &AliasEntry) -> StoreResult<()>;

    /// 按前缀（区分大小写）查询历史，按次数、最近使用时间、文本排序
    async fn query_history_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<HistoryEntry>>;

    /// 全部别名，按别名排序
    async fn all_aliases(&self) -> StoreResult<Vec<AliasEntry>>;

    /// 数据源的同步游标，从未同步过时为默认值
    async fn sync_cursor(&self, source: &str) -> StoreResult<SyncCursor>;

    async fn set_sync_cursor(&self, source: &str, cursor: &SyncCursor) -> StoreResult<()>;

    /// 每次成功写入后递增，供模型判断派生索引是否过期
    fn revision(&self) -> u64;
}

/// 交互路径上的历史读取：失败时记录日志并返回空结果
pub async fn history_or_empty(
    store: &dyn DataStore,
    prefix: &str,
    limit: Option<usize>,
) -> Vec<HistoryEntry> {
    match store.query_history_prefix(prefix, limit).await {
        Ok(entries) => entries,
        Err(error) => {
            warn!(error = %error, "storage.history_read_failed");
            Vec::new()
        }
    }
}

/// 交互路径上的别名读取：失败时记录日志并返回空结果
pub async fn aliases_or_empty(store: &dyn DataStore) -> Vec<AliasEntry> {
    match store.all_aliases().await {
        Ok(aliases) => aliases,
        Err(error) => {
            warn!(error = %error, "storage.alias_read_failed");
            Vec::new()
        }
    }
}

/// 历史排序规则：次数降序，最近使用降序，文本升序
pub(crate) fn history_rank_cmp(a: &HistoryEntry, b: &HistoryEntry) -> std::cmp::Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| a.command.cmp(&b.command))
}
