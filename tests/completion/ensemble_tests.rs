//! 集成引擎测试

use async_trait::async_trait;
use ghostline_lib::completion::models::MarkovModel;
use ghostline_lib::completion::{
    Candidate, ContextState, Ensemble, EnsembleConfig, ModelError, ModelResult, ModelSelection,
    PredictionModel,
};
use ghostline_lib::config::AppConfig;
use ghostline_lib::setup::build_ensemble;
use ghostline_lib::storage::{
    AliasEntry, DataStore, HistoryEntry, MemoryStore, StoreResult, SyncCursor,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// 返回固定候选的模型
struct FixedModel {
    name: &'static str,
    candidates: Vec<(&'static str, f64)>,
}

impl FixedModel {
    fn new(name: &'static str, candidates: &[(&'static str, f64)]) -> Arc<dyn PredictionModel> {
        Arc::new(Self {
            name,
            candidates: candidates.to_vec(),
        })
    }
}

#[async_trait]
impl PredictionModel for FixedModel {
    fn name(&self) -> &str {
        self.name
    }

    async fn suggest(&self, prefix: &str, _max_results: usize) -> ModelResult<Vec<Candidate>> {
        Ok(self
            .candidates
            .iter()
            .filter(|(text, _)| text.starts_with(prefix))
            .map(|(text, score)| Candidate::new(*text, *score, self.name))
            .collect())
    }
}

/// 总是失败的模型
struct FailingModel(&'static str);

#[async_trait]
impl PredictionModel for FailingModel {
    fn name(&self) -> &str {
        self.0
    }

    async fn suggest(&self, _prefix: &str, _max_results: usize) -> ModelResult<Vec<Candidate>> {
        Err(ModelError::backend(self.0, "connection refused"))
    }
}

/// 远超预算的慢模型
struct SlowModel {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl PredictionModel for SlowModel {
    fn name(&self) -> &str {
        self.name
    }

    async fn suggest(&self, prefix: &str, _max_results: usize) -> ModelResult<Vec<Candidate>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![Candidate::new(format!("{prefix} slow"), 1.0, self.name)])
    }
}

/// 历史查询比模型预算还慢的存储
struct SlowHistoryStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl DataStore for SlowHistoryStore {
    async fn upsert_history(&self, entry: &HistoryEntry) -> StoreResult<()> {
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
        tokio::time::sleep(self.delay).await;
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

fn config_with_budget(budget: Duration) -> EnsembleConfig {
    EnsembleConfig {
        model_budget: budget,
        ..EnsembleConfig::default()
    }
}

fn sample_ensemble() -> Ensemble {
    Ensemble::with_models(
        EnsembleConfig::default(),
        vec![
            FixedModel::new("freq", &[("git status", 0.9), ("git stash", 0.4), ("git push", 0.3)]),
            FixedModel::new("markov", &[("git stash", 0.7), ("git switch", 0.5)]),
            FixedModel::new("context", &[("git push", 0.6), ("git status", 0.2)]),
        ],
    )
}

#[tokio::test]
async fn test_output_is_sorted_and_deterministic() {
    let ensemble = sample_ensemble();
    let first = ensemble.suggest("git s", &ModelSelection::All).await;

    assert!(!first.is_empty());
    for pair in first.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    for _ in 0..5 {
        let again = ensemble.suggest("git s", &ModelSelection::All).await;
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_empty_selection_uses_all_models() {
    let ensemble = sample_ensemble();
    let ranked = ensemble.suggest("git", &ModelSelection::parse("")).await;

    let mut sources: Vec<&str> = ranked.iter().flat_map(|c| c.sources()).collect();
    sources.sort();
    sources.dedup();
    assert_eq!(sources, vec!["context", "freq", "markov"]);
}

#[tokio::test]
async fn test_selection_limits_contributors() {
    let ensemble = sample_ensemble();
    let ranked = ensemble.suggest("git", &ModelSelection::parse("markov")).await;
    let texts: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["git stash", "git switch"]);
}

#[tokio::test]
async fn test_weighted_sum_merges_duplicates() {
    let ensemble = sample_ensemble();
    let ranked = ensemble.suggest("git", &ModelSelection::All).await;

    let stash = ranked.iter().find(|c| c.text == "git stash").unwrap();
    // freq 0.4 * 1.0 + markov 0.7 * 1.0
    assert!((stash.score - 1.1).abs() < 1e-9);
    assert_eq!(stash.sources().collect::<Vec<_>>(), vec!["freq", "markov"]);
    assert_eq!(ranked.iter().filter(|c| c.text == "git stash").count(), 1);
}

#[tokio::test]
async fn test_failing_llm_does_not_block_others() {
    let budget = Duration::from_millis(200);
    let models = vec![
        FixedModel::new("freq", &[("ls -la", 0.8)]),
        Arc::new(FailingModel("llm")) as Arc<dyn PredictionModel>,
        Arc::new(SlowModel {
            name: "context",
            delay: Duration::from_secs(10),
        }) as Arc<dyn PredictionModel>,
    ];
    let model_count = models.len() as u32;
    let ensemble = Ensemble::with_models(config_with_budget(budget), models);

    let started = Instant::now();
    let ranked = ensemble.suggest("ls", &ModelSelection::All).await;
    let elapsed = started.elapsed();

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].text, "ls -la");
    assert!(elapsed < budget * model_count, "took {elapsed:?}");
}

#[tokio::test]
async fn test_tie_break_prefers_alias_then_text() {
    let ensemble = Ensemble::with_models(
        EnsembleConfig {
            weights: Default::default(),
            ..EnsembleConfig::default()
        },
        vec![
            FixedModel::new("llm", &[("b-llm", 0.5)]),
            FixedModel::new("freq", &[("c-freq", 0.5), ("a-freq", 0.5)]),
            FixedModel::new("alias", &[("z-alias", 0.5)]),
            FixedModel::new("plugin", &[("0-plugin", 0.5)]),
        ],
    );
    let ranked = ensemble.suggest("", &ModelSelection::All).await;
    let texts: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["z-alias", "a-freq", "c-freq", "b-llm", "0-plugin"]);
}

#[tokio::test]
async fn test_max_results_truncates() {
    let ensemble = Ensemble::with_models(
        EnsembleConfig {
            max_results: 2,
            ..EnsembleConfig::default()
        },
        vec![FixedModel::new("freq", &[("a", 0.1), ("b", 0.2), ("c", 0.3)])],
    );
    let ranked = ensemble.suggest("", &ModelSelection::All).await;
    let texts: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["c", "b"]);
}

#[tokio::test]
async fn test_alias_ranks_expansion_first() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_history(&HistoryEntry::new("git status").with_count(5))
        .await
        .unwrap();
    store
        .upsert_history(&HistoryEntry::new("gsutil ls").with_count(1))
        .await
        .unwrap();
    store
        .upsert_alias(&AliasEntry::new("gs", "git status"))
        .await
        .unwrap();

    let cwd = TempDir::new().unwrap();
    let context = Arc::new(ContextState::new(cwd.path().to_path_buf()));
    let ensemble = build_ensemble(&AppConfig::default(), store, context);

    let ranked = ensemble.suggest("gs", &ModelSelection::All).await;
    assert_eq!(ranked[0].text, "git status");
    assert_eq!(ranked[0].primary_source(), Some("alias"));
    assert!(ranked.iter().any(|c| c.text == "gsutil ls"));
}

#[tokio::test]
async fn test_cancelled_query_returns_none() {
    let ensemble = Ensemble::with_models(
        config_with_budget(Duration::from_secs(5)),
        vec![Arc::new(SlowModel {
            name: "llm",
            delay: Duration::from_secs(5),
        }) as Arc<dyn PredictionModel>],
    );

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let result = ensemble
        .suggest_cancellable("git", &ModelSelection::All, &token)
        .await;
    assert!(result.is_none());
    assert!(started.elapsed() < Duration::from_secs(2));

    let already = CancellationToken::new();
    already.cancel();
    assert!(ensemble
        .suggest_cancellable("git", &ModelSelection::All, &already)
        .await
        .is_none());
}

#[tokio::test]
async fn test_markov_index_outlives_budget_timeouts() {
    let config = EnsembleConfig::default();
    let store = Arc::new(SlowHistoryStore {
        inner: MemoryStore::new(),
        delay: config.model_budget + Duration::from_millis(50),
    });
    store
        .upsert_history(&HistoryEntry::new("git status").with_count(4))
        .await
        .unwrap();
    store
        .upsert_history(&HistoryEntry::new("git stash").with_count(1))
        .await
        .unwrap();

    let markov = Arc::new(MarkovModel::new(store, Duration::ZERO, 1000));
    let ensemble = Ensemble::with_models(config, vec![markov as Arc<dyn PredictionModel>]);

    // 首次构建超出预算，本次没有结果，但构建在后台继续
    let first = ensemble.suggest("git st", &ModelSelection::All).await;
    assert!(first.is_empty());

    let mut ranked = Vec::new();
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        ranked = ensemble.suggest("git st", &ModelSelection::All).await;
        if !ranked.is_empty() {
            break;
        }
    }
    let texts: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["git status", "git stash"]);
    assert_eq!(ranked[0].primary_source(), Some("markov"));
}
