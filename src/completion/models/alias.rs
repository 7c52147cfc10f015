//! 别名模型
//!
//! - 输入的第一个词恰好是别名：给出展开后的命令（保留后面的参数）
//! - 输入是别名的一部分：给出该别名的展开
//! - 输入是某个展开的前缀：给出完整展开

use super::PredictionModel;
use crate::completion::error::ModelResult;
use crate::completion::types::{Candidate, MODEL_ALIAS};
use crate::storage::{aliases_or_empty, AliasEntry, DataStore};
use async_trait::async_trait;
use std::sync::Arc;

const EXACT_SCORE: f64 = 1.0;
const PARTIAL_NAME_BASE: f64 = 0.4;
const EXPANSION_PREFIX_BASE: f64 = 0.3;

pub struct AliasModel {
    store: Arc<dyn DataStore>,
}

impl AliasModel {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

/// 单个别名对输入的匹配结果
pub fn match_alias(alias: &AliasEntry, typed: &str) -> Option<Candidate> {
    let typed = typed.trim_start();
    if typed.is_empty() {
        return None;
    }

    let (first, rest) = match typed.find(char::is_whitespace) {
        Some(split) => (&typed[..split], &typed[split..]),
        None => (typed, ""),
    };

    if first == alias.name {
        return Some(Candidate::new(
            format!("{}{}", alias.expansion, rest),
            EXACT_SCORE,
            MODEL_ALIAS,
        ));
    }

    if rest.is_empty() && alias.name.starts_with(first) {
        let ratio = first.len() as f64 / alias.name.len() as f64;
        return Some(Candidate::new(
            alias.expansion.clone(),
            PARTIAL_NAME_BASE + 0.4 * ratio,
            MODEL_ALIAS,
        ));
    }

    if alias.expansion.starts_with(typed) && alias.expansion != typed {
        let ratio = typed.len() as f64 / alias.expansion.len() as f64;
        return Some(Candidate::new(
            alias.expansion.clone(),
            EXPANSION_PREFIX_BASE + 0.4 * ratio,
            MODEL_ALIAS,
        ));
    }

    None
}

#[async_trait]
impl PredictionModel for AliasModel {
    fn name(&self) -> &str {
        MODEL_ALIAS
    }

    async fn suggest(&self, prefix: &str, max_results: usize) -> ModelResult<Vec<Candidate>> {
        if prefix.trim().is_empty() {
            return Ok(Vec::new());
        }

        let aliases = aliases_or_empty(self.store.as_ref()).await;
        let mut candidates: Vec<Candidate> = aliases
            .iter()
            .filter_map(|alias| match_alias(alias, prefix))
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.text.cmp(&b.text)));
        candidates.truncate(max_results);
        Ok(candidates)
    }
}
