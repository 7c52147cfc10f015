//! 同步任务启动器
//!
//! 每个任务一个 Tokio task，立即返回。任务内部捕获错误与 panic，
//! 只记录日志，不影响其他任务和进程。

use super::SyncWorker;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 运行计划：只跑一轮，或按固定间隔反复运行
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSchedule {
    pub refresh_interval: Option<Duration>,
}

impl SyncSchedule {
    pub fn once() -> Self {
        Self::default()
    }

    pub fn every(interval: Duration) -> Self {
        Self {
            refresh_interval: Some(interval),
        }
    }
}

/// 已启动任务的句柄
///
/// 直接丢弃即可让任务在后台继续运行；测试和 `--wait-sync` 使用
/// [`SyncHandles::wait_first_pass`] 或 [`SyncHandles::wait`]。
pub struct SyncHandles {
    tasks: Vec<JoinHandle<()>>,
    first_pass: Vec<oneshot::Receiver<()>>,
    cancel: CancellationToken,
}

impl SyncHandles {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 等待每个任务完成第一轮（不论成功与否）
    pub async fn wait_first_pass(&mut self) {
        for receiver in self.first_pass.drain(..) {
            let _ = receiver.await;
        }
    }

    /// 等待全部任务结束；周期任务只有在 [`SyncHandles::shutdown`] 后才会结束
    pub async fn wait(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }

    /// 停止周期任务并等待正在进行的一轮结束
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.wait().await;
    }
}

/// 启动所有同步任务
///
/// 必须在 Tokio 运行时中调用。
pub fn launch_sync_workers(workers: Vec<Arc<dyn SyncWorker>>, schedule: SyncSchedule) -> SyncHandles {
    let cancel = CancellationToken::new();
    let mut tasks = Vec::with_capacity(workers.len());
    let mut first_pass = Vec::with_capacity(workers.len());

    for worker in workers {
        let (done_tx, done_rx) = oneshot::channel();
        let token = cancel.clone();
        tasks.push(tokio::spawn(run_worker_loop(worker, schedule, token, done_tx)));
        first_pass.push(done_rx);
    }

    info!(workers = tasks.len(), interval = ?schedule.refresh_interval, "sync.workers.launched");

    SyncHandles {
        tasks,
        first_pass,
        cancel,
    }
}

async fn run_worker_loop(
    worker: Arc<dyn SyncWorker>,
    schedule: SyncSchedule,
    cancel: CancellationToken,
    done: oneshot::Sender<()>,
) {
    let mut done = Some(done);

    loop {
        run_guarded(worker.as_ref()).await;
        if let Some(done) = done.take() {
            let _ = done.send(());
        }

        let Some(interval) = schedule.refresh_interval else {
            break;
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn run_guarded(worker: &dyn SyncWorker) {
    let name = worker.name().to_string();
    match AssertUnwindSafe(worker.run()).catch_unwind().await {
        Ok(Ok(report)) => {
            info!(
                worker = %name,
                loaded = report.loaded,
                merged = report.merged,
                skipped = report.skipped,
                "sync.worker.completed"
            );
        }
        Ok(Err(err)) => {
            warn!(worker = %name, error = %err, "sync.worker.failed");
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(worker = %name, panic = %message, "sync.worker.panicked");
        }
    }
}
