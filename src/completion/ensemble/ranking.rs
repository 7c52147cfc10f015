//! 候选合并与排序
//!
//! 按文本（区分大小写）合并各模型的候选，按规则计算合并分数，再做确定性排序。
//! 全程使用有序容器，结果不依赖哈希表遍历顺序。

use crate::completion::types::{source_priority, Candidate, Contribution, RankedCandidate};
use crate::config::CombineKind;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// 分数合并规则
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum CombineRule {
    /// 加权求和
    #[default]
    WeightedSum,
    /// 取加权后的最大值
    Max,
    /// 加权倒数名次融合：Σ w / (k + rank + 1)
    RankFusion { k: f64 },
}

impl CombineRule {
    pub fn from_settings(kind: CombineKind, rank_fusion_k: f64) -> Self {
        match kind {
            CombineKind::WeightedSum => CombineRule::WeightedSum,
            CombineKind::Max => CombineRule::Max,
            CombineKind::RankFusion => CombineRule::RankFusion {
                k: if rank_fusion_k.is_finite() && rank_fusion_k >= 0.0 {
                    rank_fusion_k
                } else {
                    60.0
                },
            },
        }
    }

    fn combine(self, contributions: &[Contribution], weights: &ModelWeights) -> f64 {
        let weighted = contributions.iter().map(|c| (c, weights.weight(&c.model)));
        match self {
            CombineRule::WeightedSum => weighted.map(|(c, w)| w * c.score).sum(),
            CombineRule::Max => weighted.map(|(c, w)| w * c.score).fold(0.0, f64::max),
            CombineRule::RankFusion { k } => {
                weighted.map(|(c, w)| w / (k + c.rank as f64 + 1.0)).sum()
            }
        }
    }
}

/// 按模型名配置的权重，未配置的模型权重为 1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelWeights(BTreeMap<String, f64>);

impl ModelWeights {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self(weights)
    }

    pub fn weight(&self, model: &str) -> f64 {
        match self.0.get(model) {
            Some(weight) if weight.is_finite() => weight.max(0.0),
            _ => 1.0,
        }
    }
}

/// 一个模型本次的输出
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub model: String,
    pub candidates: Vec<Candidate>,
}

/// 规整单个模型的输出：非有限分数按 0 处理，同一文本保留最高分，
/// 按分数和文本排序后截断，名次以此为准
fn normalize(output: &ModelOutput, per_model_limit: usize) -> Vec<(String, f64)> {
    let mut best: BTreeMap<&str, f64> = BTreeMap::new();
    for candidate in &output.candidates {
        if candidate.text.is_empty() {
            continue;
        }
        let score = if candidate.score.is_finite() {
            candidate.score.max(0.0)
        } else {
            0.0
        };
        best.entry(candidate.text.as_str())
            .and_modify(|existing| *existing = existing.max(score))
            .or_insert(score);
    }

    let mut list: Vec<(String, f64)> = best
        .into_iter()
        .map(|(text, score)| (text.to_string(), score))
        .collect();
    list.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    list.truncate(per_model_limit);
    list
}

fn contribution_order(a: &Contribution, b: &Contribution) -> Ordering {
    source_priority(&a.model)
        .cmp(&source_priority(&b.model))
        .then_with(|| a.model.cmp(&b.model))
}

/// 最终排序：分数降序，其次最优来源优先级，再次贡献模型数，最后文本
fn ranked_order(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    let best_priority = |c: &RankedCandidate| c.primary_source().map_or(u8::MAX, source_priority);

    b.score
        .total_cmp(&a.score)
        .then_with(|| best_priority(a).cmp(&best_priority(b)))
        .then_with(|| b.contributions.len().cmp(&a.contributions.len()))
        .then_with(|| a.text.cmp(&b.text))
}

/// 合并并排序所有模型的输出
pub fn rank_candidates(
    outputs: &[ModelOutput],
    rule: CombineRule,
    weights: &ModelWeights,
    per_model_limit: usize,
    max_results: usize,
) -> Vec<RankedCandidate> {
    let mut merged: BTreeMap<String, Vec<Contribution>> = BTreeMap::new();

    for output in outputs {
        for (rank, (text, score)) in normalize(output, per_model_limit).into_iter().enumerate() {
            merged.entry(text).or_default().push(Contribution {
                model: output.model.clone(),
                score,
                rank,
            });
        }
    }

    let mut ranked: Vec<RankedCandidate> = merged
        .into_iter()
        .map(|(text, mut contributions)| {
            contributions.sort_by(contribution_order);
            let score = rule.combine(&contributions, weights);
            RankedCandidate {
                text,
                score,
                contributions,
            }
        })
        .collect();

    ranked.sort_by(ranked_order);
    ranked.truncate(max_results);
    ranked
}
