//! 补全候选相关的类型定义

use serde::Serialize;

/// 模型名称
pub const MODEL_MARKOV: &str = "markov";
pub const MODEL_FREQ: &str = "freq";
pub const MODEL_LLM: &str = "llm";
pub const MODEL_ALIAS: &str = "alias";
pub const MODEL_CONTEXT: &str = "context";

/// 所有内置模型，顺序与命令行帮助一致
pub const KNOWN_MODELS: [&str; 5] = [MODEL_MARKOV, MODEL_FREQ, MODEL_LLM, MODEL_ALIAS, MODEL_CONTEXT];

/// 来源优先级，数字越小越优先；未知模型排在最后
pub fn source_priority(model: &str) -> u8 {
    match model {
        MODEL_ALIAS => 0,
        MODEL_FREQ => 1,
        MODEL_MARKOV => 2,
        MODEL_CONTEXT => 3,
        MODEL_LLM => 4,
        _ => u8::MAX,
    }
}

/// 单个模型给出的候选
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// 完整的命令文本（替换用户当前输入）
    pub text: String,
    /// 模型内部分数，取值 (0, 1]
    pub score: f64,
    /// 产出该候选的模型名
    pub source: String,
}

impl Candidate {
    pub fn new(text: impl Into<String>, score: f64, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score,
            source: source.into(),
        }
    }
}

/// 某个模型对最终候选的贡献
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub model: String,
    /// 模型给出的原始分数
    pub score: f64,
    /// 在该模型输出中的名次，从 0 开始
    pub rank: usize,
}

/// 集成排序后的候选
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub text: String,
    /// 合并后的分数
    pub score: f64,
    /// 按来源优先级排序的贡献列表
    pub contributions: Vec<Contribution>,
}

impl RankedCandidate {
    /// 优先级最高的来源
    pub fn primary_source(&self) -> Option<&str> {
        self.contributions.first().map(|c| c.model.as_str())
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.contributions.iter().map(|c| c.model.as_str())
    }
}
