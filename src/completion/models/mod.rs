//! 预测模型
//!
//! 所有模型实现同一个 trait，集成引擎只按名称筛选，不关心具体类型。
//! 模型输出不要求排序或去重，最终顺序由集成引擎决定。

pub mod alias;
pub mod command_pairs;
pub mod context;
pub mod frequency;
pub mod llm;
pub mod markov;

pub use alias::AliasModel;
pub use context::{ContextModel, ContextState, ProjectKind};
pub use frequency::FrequencyModel;
pub use llm::{CompletionBackend, LlmModel, OllamaBackend};
pub use markov::MarkovModel;

use crate::completion::error::ModelResult;
use crate::completion::types::Candidate;
use crate::config::AppConfig;
use crate::storage::DataStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 预测模型
#[async_trait]
pub trait PredictionModel: Send + Sync {
    /// 模型名称，用于筛选和权重
    fn name(&self) -> &str;

    /// 给出至多 `max_results` 个候选，分数取值 (0, 1]
    async fn suggest(&self, prefix: &str, max_results: usize) -> ModelResult<Vec<Candidate>>;
}

/// 按配置创建全部内置模型
///
/// `llm` 只有在配置中启用且 HTTP 客户端创建成功时才会加入。
pub fn build_models(
    config: &AppConfig,
    store: Arc<dyn DataStore>,
    context: Arc<ContextState>,
) -> Vec<Arc<dyn PredictionModel>> {
    let mut models: Vec<Arc<dyn PredictionModel>> = vec![
        Arc::new(AliasModel::new(store.clone())),
        Arc::new(FrequencyModel::new(store.clone())),
        Arc::new(MarkovModel::new(
            store,
            Duration::from_millis(config.markov.rebuild_interval_ms),
            config.markov.max_history,
        )),
        Arc::new(ContextModel::new(context.clone())),
    ];

    if config.llm.enabled {
        match OllamaBackend::new(&config.llm) {
            Ok(backend) => models.push(Arc::new(
                LlmModel::new(Arc::new(backend), config.llm.min_prefix_len).with_context(context),
            )),
            Err(err) => warn!(error = %err, "completion.llm.backend_unavailable"),
        }
    }

    models
}
