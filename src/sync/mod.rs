//! 后台同步
//!
//! 同步任务把加载器读到的记录逐条写入数据存储。任务之间互不依赖，
//! 任何一个失败（加载、存储甚至 panic）都只在该任务边界内被记录。

pub mod launcher;
pub mod worker;

pub use launcher::{launch_sync_workers, SyncHandles, SyncSchedule};
pub use worker::{AliasSyncWorker, HistorySyncWorker};

use crate::loaders::LoadError;
use crate::storage::StoreError;
use async_trait::async_trait;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("load failed: {0}")]
    Load(#[from] LoadError),
    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

/// 单次同步的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub worker: String,
    /// 加载器返回的记录数
    pub loaded: usize,
    /// 本轮写入存储的记录数
    pub merged: usize,
    /// 之前已经同步过而跳过的记录数
    pub skipped: usize,
}

impl SyncReport {
    pub fn new(worker: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
            ..Default::default()
        }
    }
}

/// 同步任务：一次 load-then-upsert
#[async_trait]
pub trait SyncWorker: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> SyncResult<SyncReport>;
}
