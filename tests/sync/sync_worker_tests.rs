//! 后台同步集成测试

use async_trait::async_trait;
use ghostline_lib::loaders::{
    LoadError, LoadResult, Loader, RcFileAliasLoader, ShellHistoryLoader,
};
use ghostline_lib::storage::{
    AliasEntry, DataStore, DatabaseOptions, HistoryEntry, MemoryStore, SqliteStore, StoreError,
    StoreResult, SyncCursor,
};
use ghostline_lib::sync::{
    launch_sync_workers, AliasSyncWorker, HistorySyncWorker, SyncError, SyncReport, SyncResult,
    SyncSchedule, SyncWorker,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// 总是失败的别名加载器
struct BrokenAliasLoader;

#[async_trait]
impl Loader for BrokenAliasLoader {
    type Record = AliasEntry;

    fn name(&self) -> &str {
        "broken"
    }

    async fn load(&self) -> LoadResult<Vec<AliasEntry>> {
        Err(LoadError::Command {
            program: "zsh".to_string(),
            message: "exited with 127".to_string(),
        })
    }
}

struct PanickingWorker;

#[async_trait]
impl SyncWorker for PanickingWorker {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn run(&self) -> SyncResult<SyncReport> {
        panic!("worker exploded")
    }
}

/// 写入若干条后开始失败的存储
struct FlakyStore {
    inner: MemoryStore,
    remaining_writes: AtomicUsize,
}

impl FlakyStore {
    fn failing_after(writes: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            remaining_writes: AtomicUsize::new(writes),
        }
    }

    fn heal(&self) {
        self.remaining_writes.store(usize::MAX, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataStore for FlakyStore {
    async fn upsert_history(&self, entry: &HistoryEntry) -> StoreResult<()> {
        let allowed = self
            .remaining_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.upsert_history(entry).await
    }

    async fn upsert_alias(&self, entry: &AliasEntry) -> StoreResult<()> {
        self.inner.upsert_alias(entry).await
    }

    async fn query_history_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<HistoryEntry>> {
        self.inner.query_history_prefix(prefix, limit).await
    }

    async fn all_aliases(&self) -> StoreResult<Vec<AliasEntry>> {
        self.inner.all_aliases().await
    }

    async fn sync_cursor(&self, source: &str) -> StoreResult<SyncCursor> {
        self.inner.sync_cursor(source).await
    }

    async fn set_sync_cursor(&self, source: &str, cursor: &SyncCursor) -> StoreResult<()> {
        self.inner.set_sync_cursor(source, cursor).await
    }

    fn revision(&self) -> u64 {
        self.inner.revision()
    }
}

fn write_bash_history(dir: &TempDir, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(".bash_history");
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

#[tokio::test]
async fn test_alias_failure_does_not_block_history() {
    let temp_dir = TempDir::new().unwrap();
    let history_file = write_bash_history(&temp_dir, &["ls", "git status", "ls"]);
    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());

    let broken: Vec<Arc<dyn Loader<Record = AliasEntry>>> = vec![Arc::new(BrokenAliasLoader)];
    let workers: Vec<Arc<dyn SyncWorker>> = vec![
        Arc::new(AliasSyncWorker::new(store.clone(), broken)),
        Arc::new(PanickingWorker),
        Arc::new(HistorySyncWorker::new(
            store.clone(),
            Arc::new(ShellHistoryLoader::new(history_file)),
        )),
    ];
    launch_sync_workers(workers, SyncSchedule::once()).wait().await;

    let ls = store.query_history_prefix("ls", None).await.unwrap();
    assert_eq!(ls[0].count, 2);
    assert_eq!(store.query_history_prefix("git", None).await.unwrap().len(), 1);
    assert!(store.all_aliases().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_later_alias_definition_wins() {
    let temp_dir = TempDir::new().unwrap();
    let bashrc = temp_dir.path().join(".bashrc");
    let zshrc = temp_dir.path().join(".zshrc");
    std::fs::write(&bashrc, "alias ll='ls -la'\nalias gs='git status'\n").unwrap();
    std::fs::write(&zshrc, "alias ll='ls -lah'\n").unwrap();

    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    let loaders: Vec<Arc<dyn Loader<Record = AliasEntry>>> = vec![
        Arc::new(RcFileAliasLoader::new(vec![bashrc, zshrc])),
        Arc::new(BrokenAliasLoader),
    ];
    let worker = AliasSyncWorker::new(store.clone(), loaders);

    let report = worker.run().await.unwrap();
    assert_eq!(report.loaded, 3);
    assert_eq!(
        store.all_aliases().await.unwrap(),
        vec![
            AliasEntry::new("gs", "git status"),
            AliasEntry::new("ll", "ls -lah"),
        ]
    );

    // 重复同步结果不变
    worker.run().await.unwrap();
    assert_eq!(store.all_aliases().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_all_alias_loaders_failing_is_a_load_error() {
    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    let broken: Vec<Arc<dyn Loader<Record = AliasEntry>>> = vec![Arc::new(BrokenAliasLoader)];
    let worker = AliasSyncWorker::new(store, broken);
    assert!(matches!(worker.run().await, Err(SyncError::Load(_))));
}

#[tokio::test]
async fn test_resync_after_restart_does_not_double_count() {
    let temp_dir = TempDir::new().unwrap();
    let history_file = write_bash_history(&temp_dir, &["cargo build", "cargo test"]);
    let db_path = temp_dir.path().join("ghostline.db");

    for _ in 0..2 {
        let store: Arc<dyn DataStore> =
            Arc::new(SqliteStore::open(&db_path, DatabaseOptions::default()).await.unwrap());
        let worker =
            HistorySyncWorker::new(store, Arc::new(ShellHistoryLoader::new(history_file.clone())));
        worker.run().await.unwrap();
    }

    // 追加新命令后只合并新增部分
    write_bash_history(&temp_dir, &["cargo build", "cargo test", "cargo build"]);
    let store: Arc<dyn DataStore> =
        Arc::new(SqliteStore::open(&db_path, DatabaseOptions::default()).await.unwrap());
    let worker = HistorySyncWorker::new(
        store.clone(),
        Arc::new(ShellHistoryLoader::new(history_file)),
    );
    let report = worker.run().await.unwrap();
    assert_eq!((report.loaded, report.merged, report.skipped), (3, 1, 2));

    let build = store.query_history_prefix("cargo build", None).await.unwrap();
    assert_eq!(build[0].count, 2);
    let test = store.query_history_prefix("cargo test", None).await.unwrap();
    assert_eq!(test[0].count, 1);
}

#[tokio::test]
async fn test_store_failure_keeps_cursor_for_next_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let history_file = write_bash_history(&temp_dir, &["a", "b", "c", "d", "e"]);
    let store = Arc::new(FlakyStore::failing_after(2));
    let loader = Arc::new(ShellHistoryLoader::new(history_file));
    let worker = HistorySyncWorker::new(store.clone(), loader.clone());

    assert!(matches!(worker.run().await, Err(SyncError::Store(_))));
    let cursor = store.sync_cursor(&loader.source_key()).await.unwrap();
    assert_eq!(cursor.position, 2);

    store.heal();
    let report = worker.run().await.unwrap();
    assert_eq!((report.merged, report.skipped), (3, 2));
    for command in ["a", "b", "c", "d", "e"] {
        let entries = store.query_history_prefix(command, None).await.unwrap();
        assert_eq!(entries[0].count, 1, "{command} merged more than once");
    }
}

#[tokio::test]
async fn test_missing_history_file_is_reported_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    let worker = HistorySyncWorker::new(
        store,
        Arc::new(ShellHistoryLoader::new(temp_dir.path().join("missing_history"))),
    );
    assert!(matches!(
        worker.run().await,
        Err(SyncError::Load(LoadError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_capped_history_file_keeps_syncing() {
    let temp_dir = TempDir::new().unwrap();
    let history_file = write_bash_history(&temp_dir, &["ls", "cd src", "cargo build"]);
    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    let worker = HistorySyncWorker::new(
        store.clone(),
        Arc::new(ShellHistoryLoader::new(history_file)),
    );
    worker.run().await.unwrap();

    // HISTFILESIZE=3：追加新命令时最旧的一行被丢弃，文件行数不变
    write_bash_history(&temp_dir, &["cd src", "cargo build", "docker ps"]);
    let report = worker.run().await.unwrap();
    assert_eq!((report.loaded, report.merged, report.skipped), (3, 1, 2));

    let docker = store.query_history_prefix("docker", None).await.unwrap();
    assert_eq!(docker.len(), 1);
    let build = store.query_history_prefix("cargo build", None).await.unwrap();
    assert_eq!(build[0].count, 1);
}

#[tokio::test]
async fn test_each_history_file_has_its_own_cursor() {
    let temp_dir = TempDir::new().unwrap();
    let bash = temp_dir.path().join(".bash_history");
    let zsh = temp_dir.path().join(".zsh_history");
    std::fs::write(&bash, "ls\npwd\nmake\n").unwrap();
    std::fs::write(&zsh, ": 1700000000:0;git status\n: 1700000005:0;git push\n").unwrap();

    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    HistorySyncWorker::new(store.clone(), Arc::new(ShellHistoryLoader::new(bash)))
        .run()
        .await
        .unwrap();

    let report = HistorySyncWorker::new(store.clone(), Arc::new(ShellHistoryLoader::new(zsh)))
        .run()
        .await
        .unwrap();
    assert_eq!((report.merged, report.skipped), (2, 0));
    assert_eq!(store.query_history_prefix("git", None).await.unwrap().len(), 2);
}
