//! 集成引擎
//!
//! 在调用方的任务上并发执行选中的模型，每个模型单独受时间预算约束，
//! 总等待时间约为一个预算。失败、超时或 panic 的模型本次不贡献候选。

use super::ranking::{rank_candidates, CombineRule, ModelOutput, ModelWeights};
use super::selection::ModelSelection;
use crate::completion::error::{ModelError, ModelResult};
use crate::completion::models::PredictionModel;
use crate::completion::types::{Candidate, RankedCandidate};
use crate::config::EnsembleSettings;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 集成引擎配置
#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    /// 最大返回结果数
    pub max_results: usize,
    /// 传给每个模型的结果上限
    pub per_model_limit: usize,
    /// 单个模型的时间预算
    pub model_budget: Duration,
    pub combine: CombineRule,
    pub weights: ModelWeights,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self::from_settings(&EnsembleSettings::default())
    }
}

impl EnsembleConfig {
    pub fn from_settings(settings: &EnsembleSettings) -> Self {
        Self {
            max_results: settings.max_results,
            per_model_limit: settings.per_model_limit.max(1),
            model_budget: Duration::from_millis(settings.model_budget_ms),
            combine: CombineRule::from_settings(settings.combine, settings.rank_fusion_k),
            weights: ModelWeights::new(settings.weights.clone()),
        }
    }
}

/// 单个模型一次调用的结果
struct ModelRun {
    model: String,
    result: ModelResult<Vec<Candidate>>,
    elapsed: Duration,
}

/// 集成引擎
pub struct Ensemble {
    models: Vec<Arc<dyn PredictionModel>>,
    config: EnsembleConfig,
}

impl Ensemble {
    pub fn new(config: EnsembleConfig) -> Self {
        Self {
            models: Vec::new(),
            config,
        }
    }

    pub fn with_models(config: EnsembleConfig, models: Vec<Arc<dyn PredictionModel>>) -> Self {
        let mut ensemble = Self::new(config);
        for model in models {
            ensemble.register(model);
        }
        ensemble
    }

    /// 注册模型；同名模型会被替换
    pub fn register(&mut self, model: Arc<dyn PredictionModel>) {
        match self.models.iter().position(|m| m.name() == model.name()) {
            Some(index) => self.models[index] = model,
            None => self.models.push(model),
        }
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// 获取排序后的候选
    pub async fn suggest(&self, prefix: &str, selection: &ModelSelection) -> Vec<RankedCandidate> {
        let runs = self.run_models(prefix, selection, None).await;
        self.finish(prefix, runs)
    }

    /// 可取消的查询：令牌先触发时返回 `None`，尚未完成的模型调用被丢弃
    pub async fn suggest_cancellable(
        &self,
        prefix: &str,
        selection: &ModelSelection,
        token: &CancellationToken,
    ) -> Option<Vec<RankedCandidate>> {
        if token.is_cancelled() {
            return None;
        }
        let runs = self.run_models(prefix, selection, Some(token)).await;
        if token.is_cancelled() {
            debug!(input = prefix, "completion.ensemble.cancelled");
            return None;
        }
        Some(self.finish(prefix, runs))
    }

    async fn run_models(
        &self,
        prefix: &str,
        selection: &ModelSelection,
        token: Option<&CancellationToken>,
    ) -> Vec<ModelRun> {
        let selected = self.models.iter().filter(|m| selection.includes(m.name()));
        join_all(selected.map(|model| self.run_model(model.as_ref(), prefix, token))).await
    }

    async fn run_model(
        &self,
        model: &dyn PredictionModel,
        prefix: &str,
        token: Option<&CancellationToken>,
    ) -> ModelRun {
        let started = Instant::now();
        let budget = self.config.model_budget;
        let guarded = AssertUnwindSafe(model.suggest(prefix, self.config.per_model_limit)).catch_unwind();

        let bounded = async {
            match timeout(budget, guarded).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(ModelError::backend(model.name(), "model panicked")),
                Err(_) => Err(ModelError::BudgetExceeded {
                    model: model.name().to_string(),
                    budget,
                }),
            }
        };

        let result = match token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ModelError::Cancelled),
                result = bounded => result,
            },
            None => bounded.await,
        };

        ModelRun {
            model: model.name().to_string(),
            result,
            elapsed: started.elapsed(),
        }
    }

    fn finish(&self, prefix: &str, runs: Vec<ModelRun>) -> Vec<RankedCandidate> {
        let started = Instant::now();
        let mut stats = Vec::with_capacity(runs.len());
        let mut outputs = Vec::with_capacity(runs.len());

        for run in runs {
            let elapsed_ms = run.elapsed.as_millis();
            match run.result {
                Ok(candidates) => {
                    stats.push(format!("{}({} 项, {}ms, ok)", run.model, candidates.len(), elapsed_ms));
                    outputs.push(ModelOutput {
                        model: run.model,
                        candidates,
                    });
                }
                Err(err) => {
                    debug!(model = %run.model, error = %err, "completion.model.failed");
                    stats.push(format!("{}(0 项, {}ms, {})", run.model, elapsed_ms, err.status()));
                }
            }
        }

        let ranked = rank_candidates(
            &outputs,
            self.config.combine,
            &self.config.weights,
            self.config.per_model_limit,
            self.config.max_results,
        );

        debug!(
            "补全汇总: input='{}', models=[{}], final_items={}, rank_time={}ms",
            prefix,
            stats.join(", "),
            ranked.len(),
            started.elapsed().as_millis()
        );
        ranked
    }
}
