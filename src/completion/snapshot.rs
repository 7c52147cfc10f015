//! 派生索引的快照缓存
//!
//! 查询方拿到的是 `Arc` 快照，重建在独立的任务里完成，完成后整体替换。
//! 重建期间的查询继续使用旧快照，不会等待，也不会看到半成品。
//! 查询被超时或取消丢弃时，已经开始的重建照常完成，下一次查询即可使用。

use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

/// 一次构建的结果
#[derive(Debug)]
pub struct Snapshot<T> {
    /// 构建时的数据存储版本
    pub revision: u64,
    pub built_at: Instant,
    pub index: T,
}

struct CacheState<T> {
    name: &'static str,
    current: RwLock<Option<Arc<Snapshot<T>>>>,
    building: AtomicBool,
    /// 每次构建结束（成功或失败）递增
    finished: watch::Sender<u64>,
}

/// 构建任务结束时复位标记并唤醒等待方，panic 时同样生效
struct BuildGuard<T>(Arc<CacheState<T>>);

impl<T> Drop for BuildGuard<T> {
    fn drop(&mut self) {
        self.0.building.store(false, Ordering::Release);
        self.0.finished.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

pub struct IndexCache<T> {
    state: Arc<CacheState<T>>,
    min_interval: Duration,
}

impl<T: Send + Sync + 'static> IndexCache<T> {
    pub fn new(name: &'static str, min_interval: Duration) -> Self {
        let (finished, _) = watch::channel(0);
        Self {
            state: Arc::new(CacheState {
                name,
                current: RwLock::new(None),
                building: AtomicBool::new(false),
                finished,
            }),
            min_interval,
        }
    }

    pub fn current(&self) -> Option<Arc<Snapshot<T>>> {
        self.state.current.read().clone()
    }

    fn is_fresh(&self, snapshot: &Snapshot<T>, revision: u64) -> bool {
        snapshot.revision == revision || snapshot.built_at.elapsed() < self.min_interval
    }

    /// 获取与 `revision` 足够接近的快照，必要时在后台重建
    ///
    /// 已有快照时立即返回旧快照，重建在后台进行。
    /// 还没有快照时等待正在进行的构建；构建失败返回 `None`。
    pub async fn get_or_rebuild<F, Fut>(&self, revision: u64, build: F) -> Option<Arc<Snapshot<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let existing = self.current();
        if let Some(snapshot) = &existing {
            if self.is_fresh(snapshot, revision) {
                return existing;
            }
        }

        // 先订阅再启动构建，避免错过完成通知
        let mut finished = self.state.finished.subscribe();
        self.spawn_rebuild(revision, build);

        if existing.is_some() {
            return existing;
        }
        if finished.changed().await.is_err() {
            return None;
        }
        self.current()
    }

    /// 没有构建在进行时启动一次构建
    fn spawn_rebuild<F, Fut>(&self, revision: u64, build: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        if self
            .state
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let guard = BuildGuard(self.state.clone());
        let pending = build();
        tokio::spawn(async move {
            let started = Instant::now();
            let index = pending.await;
            let snapshot = Arc::new(Snapshot {
                revision,
                built_at: Instant::now(),
                index,
            });
            *guard.0.current.write() = Some(snapshot);
            debug!(
                index = guard.0.name,
                revision,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "completion.index.rebuilt"
            );
            drop(guard);
        });
    }
}
