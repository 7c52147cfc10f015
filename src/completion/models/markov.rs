//! Markov 模型
//!
//! 基于历史命令的词级二元转移：开头词分布 + 前一个词到下一个词的转移，
//! 以历史次数加权。索引放在快照缓存里，数据存储版本变化后（限频）在后台重建，
//! 重建完成前继续使用旧索引。

use super::PredictionModel;
use crate::completion::command_line::TypedLine;
use crate::completion::error::ModelResult;
use crate::completion::snapshot::IndexCache;
use crate::completion::types::{Candidate, MODEL_MARKOV};
use crate::storage::{history_or_empty, DataStore, HistoryEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 词级二元转移索引
#[derive(Debug, Default)]
pub struct MarkovIndex {
    starts: HashMap<String, u64>,
    transitions: HashMap<String, HashMap<String, u64>>,
}

impl MarkovIndex {
    pub fn build(entries: &[HistoryEntry]) -> Self {
        let mut index = Self::default();
        for entry in entries {
            let weight = entry.count.max(1) as u64;
            let mut words = entry.command.split_whitespace();
            let Some(first) = words.next() else {
                continue;
            };
            *index.starts.entry(first.to_string()).or_default() += weight;

            let mut previous = first;
            for word in words {
                *index
                    .transitions
                    .entry(previous.to_string())
                    .or_default()
                    .entry(word.to_string())
                    .or_default() += weight;
                previous = word;
            }
        }
        index
    }

    /// 下一个词的分布：没有上文时用开头词分布
    fn next_words(&self, previous: Option<&str>) -> Option<&HashMap<String, u64>> {
        match previous {
            None => Some(&self.starts),
            Some(word) => self.transitions.get(word),
        }
    }

    /// 按概率给出以 `partial` 开头的下一个词，概率在匹配的词之间归一化
    pub fn predict(&self, previous: Option<&str>, partial: &str) -> Vec<(String, f64)> {
        let Some(distribution) = self.next_words(previous) else {
            return Vec::new();
        };

        let mut matching: Vec<(&String, u64)> = distribution
            .iter()
            .filter(|(word, _)| word.starts_with(partial) && word.as_str() != partial)
            .map(|(word, weight)| (word, *weight))
            .collect();
        let total: u64 = matching.iter().map(|(_, weight)| weight).sum();
        if total == 0 {
            return Vec::new();
        }

        matching.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        matching
            .into_iter()
            .map(|(word, weight)| (word.clone(), weight as f64 / total as f64))
            .collect()
    }
}

pub struct MarkovModel {
    store: Arc<dyn DataStore>,
    cache: IndexCache<MarkovIndex>,
    max_history: usize,
}

impl MarkovModel {
    pub fn new(store: Arc<dyn DataStore>, rebuild_interval: Duration, max_history: usize) -> Self {
        Self {
            store,
            cache: IndexCache::new(MODEL_MARKOV, rebuild_interval),
            max_history,
        }
    }
}

#[async_trait]
impl PredictionModel for MarkovModel {
    fn name(&self) -> &str {
        MODEL_MARKOV
    }

    async fn suggest(&self, prefix: &str, max_results: usize) -> ModelResult<Vec<Candidate>> {
        if prefix.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let revision = self.store.revision();
        let store = self.store.clone();
        let max_history = self.max_history;
        let Some(snapshot) = self
            .cache
            .get_or_rebuild(revision, move || async move {
                let entries = history_or_empty(store.as_ref(), "", Some(max_history)).await;
                MarkovIndex::build(&entries)
            })
            .await
        else {
            return Ok(Vec::new());
        };

        let typed = TypedLine::parse(prefix);
        let candidates = snapshot
            .index
            .predict(typed.words.last().copied(), typed.partial)
            .into_iter()
            .take(max_results)
            .map(|(word, probability)| {
                Candidate::new(format!("{}{}", typed.stem, word), probability, MODEL_MARKOV)
            })
            .collect();
        Ok(candidates)
    }
}
