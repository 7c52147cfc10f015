/*!
 * 数据存储集成测试
 *
 * 同一组场景分别在 SQLite 和内存实现上运行，两者语义必须一致。
 */

use chrono::{TimeZone, Utc};
use ghostline_lib::storage::{
    AliasEntry, DataStore, DatabaseOptions, HistoryEntry, MemoryStore, SqliteStore, SyncCursor,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn open_sqlite(temp_dir: &TempDir) -> SqliteStore {
    SqliteStore::open(&temp_dir.path().join("ghostline.db"), DatabaseOptions::default())
        .await
        .expect("打开数据库失败")
}

async fn check_history_merge(store: &dyn DataStore) {
    let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let newer = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    store
        .upsert_history(&HistoryEntry::new("git status").with_timestamp(newer))
        .await
        .unwrap();
    store
        .upsert_history(&HistoryEntry::new("git status").with_timestamp(older).with_count(2))
        .await
        .unwrap();

    let entries = store.query_history_prefix("git status", None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].count, 3);
    assert_eq!(entries[0].timestamp, Some(newer));
}

async fn check_alias_overwrite(store: &dyn DataStore) {
    store.upsert_alias(&AliasEntry::new("ll", "ls -la")).await.unwrap();
    store.upsert_alias(&AliasEntry::new("ll", "ls -lah")).await.unwrap();
    store.upsert_alias(&AliasEntry::new("gs", "git status")).await.unwrap();

    let aliases = store.all_aliases().await.unwrap();
    assert_eq!(
        aliases,
        vec![
            AliasEntry::new("gs", "git status"),
            AliasEntry::new("ll", "ls -lah"),
        ]
    );
}

async fn check_prefix_query(store: &dyn DataStore) {
    for (command, count) in [("git_x", 1), ("gitk", 4), ("Git push", 9), ("git pull", 4), ("git log", 2)] {
        store
            .upsert_history(&HistoryEntry::new(command).with_count(count))
            .await
            .unwrap();
    }

    let all_git: Vec<String> = store
        .query_history_prefix("git", None)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.command)
        .collect();
    // "git status" 来自前面的合并场景，次数为 3
    assert_eq!(all_git, vec!["git pull", "gitk", "git status", "git log", "git_x"]);

    // 通配符没有特殊含义
    let underscore = store.query_history_prefix("git_", None).await.unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].command, "git_x");

    let limited = store.query_history_prefix("git", Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
}

fn cursor(position: u64, anchor: &str) -> SyncCursor {
    SyncCursor {
        position,
        anchor: anchor.to_string(),
    }
}

async fn check_cursor_and_revision(store: &dyn DataStore) {
    assert_eq!(store.sync_cursor("history").await.unwrap(), SyncCursor::default());
    store.set_sync_cursor("history", &cursor(42, "a")).await.unwrap();
    store.set_sync_cursor("history", &cursor(43, "b")).await.unwrap();
    assert_eq!(store.sync_cursor("history").await.unwrap(), cursor(43, "b"));
    assert_eq!(store.sync_cursor("other").await.unwrap().position, 0);

    let before = store.revision();
    store.upsert_history(&HistoryEntry::new("pwd")).await.unwrap();
    assert!(store.revision() > before);
}

#[tokio::test]
async fn test_sqlite_semantics() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_sqlite(&temp_dir).await;
    check_history_merge(&store).await;
    check_alias_overwrite(&store).await;
    check_prefix_query(&store).await;
    check_cursor_and_revision(&store).await;
}

#[tokio::test]
async fn test_memory_semantics() {
    let store = MemoryStore::new();
    check_history_merge(&store).await;
    check_alias_overwrite(&store).await;
    check_prefix_query(&store).await;
    check_cursor_and_revision(&store).await;
}

#[tokio::test]
async fn test_sqlite_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = open_sqlite(&temp_dir).await;
        store.upsert_history(&HistoryEntry::new("make")).await.unwrap();
        store.set_sync_cursor("history", &cursor(7, "[]")).await.unwrap();
        store.database().close().await;
    }

    let store = open_sqlite(&temp_dir).await;
    assert_eq!(store.sync_cursor("history").await.unwrap(), cursor(7, "[]"));
    assert_eq!(store.query_history_prefix("make", None).await.unwrap()[0].count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_and_readers() {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn DataStore> = Arc::new(open_sqlite(&temp_dir).await);

    let mut tasks = Vec::new();
    for writer in 0..8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..25 {
                store
                    .upsert_history(&HistoryEntry::new("cargo test"))
                    .await
                    .unwrap();
                store
                    .upsert_alias(&AliasEntry::new("ct", format!("cargo test -- w{writer}-{i}")))
                    .await
                    .unwrap();
            }
        }));
    }
    for _ in 0..4 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                // 读取方只会看到完整的记录
                for entry in store.query_history_prefix("cargo", None).await.unwrap() {
                    assert_eq!(entry.command, "cargo test");
                    assert!(entry.count >= 1);
                }
                for alias in store.all_aliases().await.unwrap() {
                    assert!(alias.expansion.starts_with("cargo test -- w"));
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let entries = store.query_history_prefix("cargo test", None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].count, 200);
    assert_eq!(store.all_aliases().await.unwrap().len(), 1);
}
