//! 前端会话测试

use async_trait::async_trait;
use ghostline_lib::completion::{
    Candidate, ContextState, Ensemble, EnsembleConfig, ModelResult, ModelSelection,
    PredictionModel, SuggestionSession,
};
use ghostline_lib::config::AppConfig;
use ghostline_lib::setup::build_ensemble;
use ghostline_lib::storage::{DataStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct DelayedEcho {
    delay: Duration,
}

#[async_trait]
impl PredictionModel for DelayedEcho {
    fn name(&self) -> &str {
        "freq"
    }

    async fn suggest(&self, prefix: &str, _max_results: usize) -> ModelResult<Vec<Candidate>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![Candidate::new(format!("{prefix}!"), 0.5, "freq")])
    }
}

fn session_with_store(store: Arc<MemoryStore>, cwd: &TempDir) -> SuggestionSession {
    let context = Arc::new(ContextState::new(cwd.path().to_path_buf()));
    let ensemble = Arc::new(build_ensemble(&AppConfig::default(), store.clone(), context.clone()));
    SuggestionSession::new(ensemble, store, context, ModelSelection::All)
}

#[tokio::test]
async fn test_confirm_records_history_and_context() {
    let store = Arc::new(MemoryStore::new());
    let cwd = TempDir::new().unwrap();
    let session = session_with_store(store.clone(), &cwd);

    assert!(session.suggest("git st").await.is_empty());

    session.on_confirm("git status").await;
    let history = store.query_history_prefix("git", None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].count, 1);
    assert!(history[0].timestamp.is_some());

    // 历史可以补全，上下文给出后续命令
    assert_eq!(session.suggest("git st").await, vec!["git status".to_string()]);
    let follow_ups = session.suggest("git a").await;
    assert_eq!(follow_ups.first().map(String::as_str), Some("git add ."));
}

#[tokio::test]
async fn test_blank_confirm_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let cwd = TempDir::new().unwrap();
    let session = session_with_store(store.clone(), &cwd);

    session.on_confirm("   ").await;
    assert_eq!(store.history_len(), 0);
}

#[tokio::test]
async fn test_new_query_supersedes_previous() {
    let ensemble = Arc::new(Ensemble::with_models(
        EnsembleConfig {
            model_budget: Duration::from_secs(5),
            ..EnsembleConfig::default()
        },
        vec![Arc::new(DelayedEcho {
            delay: Duration::from_millis(200),
        }) as Arc<dyn PredictionModel>],
    ));
    let cwd = TempDir::new().unwrap();
    let session = Arc::new(SuggestionSession::new(
        ensemble,
        Arc::new(MemoryStore::new()),
        Arc::new(ContextState::new(cwd.path().to_path_buf())),
        ModelSelection::All,
    ));

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.suggest("gi").await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = session.suggest("git").await;

    assert!(first.await.unwrap().is_empty());
    assert_eq!(second, vec!["git!".to_string()]);
}

#[tokio::test]
async fn test_explicit_cancel() {
    let ensemble = Arc::new(Ensemble::with_models(
        EnsembleConfig::default(),
        vec![Arc::new(DelayedEcho {
            delay: Duration::from_millis(100),
        }) as Arc<dyn PredictionModel>],
    ));
    let cwd = TempDir::new().unwrap();
    let session = Arc::new(SuggestionSession::new(
        ensemble,
        Arc::new(MemoryStore::new()),
        Arc::new(ContextState::new(cwd.path().to_path_buf())),
        ModelSelection::parse("freq"),
    ));

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.suggest_ranked("ls").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.cancel();
    assert!(pending.await.unwrap().is_none());
}
