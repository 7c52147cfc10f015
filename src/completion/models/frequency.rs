//! 频率模型
//!
//! 对前缀匹配的历史命令按 frecency 打分：使用次数（对数缩放）加上最近使用的衰减项。

use super::PredictionModel;
use crate::completion::error::ModelResult;
use crate::completion::types::{Candidate, MODEL_FREQ};
use crate::storage::{history_or_empty, DataStore, HistoryEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// 最近使用项的半衰期
const RECENCY_HALF_LIFE_DAYS: f64 = 7.0;
const COUNT_WEIGHT: f64 = 0.7;
const RECENCY_WEIGHT: f64 = 0.3;
/// 按次数取出的候选数是输出上限的倍数，给 frecency 重新排序留余量
const SCAN_FACTOR: usize = 4;

pub struct FrequencyModel {
    store: Arc<dyn DataStore>,
}

impl FrequencyModel {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

/// frecency 分数，取值 (0, 1]
pub fn frecency(entry: &HistoryEntry, max_count: i64, now: DateTime<Utc>) -> f64 {
    let count = entry.count.max(1) as f64;
    let max_count = max_count.max(1) as f64;
    let count_part = (1.0 + count).ln() / (1.0 + max_count).ln();

    let recency_part = entry
        .timestamp
        .map(|ts| {
            let age_days = (now - ts).num_seconds().max(0) as f64 / 86_400.0;
            0.5_f64.powf(age_days / RECENCY_HALF_LIFE_DAYS)
        })
        .unwrap_or(0.0);

    (COUNT_WEIGHT * count_part.min(1.0) + RECENCY_WEIGHT * recency_part).clamp(f64::MIN_POSITIVE, 1.0)
}

#[async_trait]
impl PredictionModel for FrequencyModel {
    fn name(&self) -> &str {
        MODEL_FREQ
    }

    async fn suggest(&self, prefix: &str, max_results: usize) -> ModelResult<Vec<Candidate>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let limit = max_results.saturating_mul(SCAN_FACTOR).max(max_results + 1);
        let entries = history_or_empty(self.store.as_ref(), prefix, Some(limit)).await;
        let max_count = entries.iter().map(|e| e.count).max().unwrap_or(1);
        let now = Utc::now();

        let mut candidates: Vec<Candidate> = entries
            .iter()
            .filter(|entry| entry.command != prefix)
            .map(|entry| Candidate::new(&entry.command, frecency(entry, max_count, now), MODEL_FREQ))
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.text.cmp(&b.text)));
        candidates.truncate(max_results);
        Ok(candidates)
    }
}
