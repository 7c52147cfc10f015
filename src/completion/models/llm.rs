//! 语言模型
//!
//! 通过 Ollama 兼容的 `/api/generate` 接口请求补全，每行一个候选。
//! 只保留以当前输入为前缀、且比输入更长的行。后端是 trait，测试中可以替换。

use super::context::ContextState;
use super::PredictionModel;
use crate::completion::error::{ModelError, ModelResult};
use crate::completion::types::{Candidate, MODEL_LLM};
use crate::config::LlmSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const TOP_SCORE: f64 = 0.8;
const RANK_DECAY: f64 = 0.85;
/// 单次生成的最大 token 数
const MAX_TOKENS: u32 = 96;

/// 文本补全后端
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> ModelResult<String>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama `/api/generate` 后端
pub struct OllamaBackend {
    client: Client,
    url: String,
    model: String,
    temperature: f32,
}

impl OllamaBackend {
    pub fn new(settings: &LlmSettings) -> ModelResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/api/generate", settings.endpoint.trim_end_matches('/')),
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": MAX_TOKENS,
            },
        });

        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ModelError::backend(MODEL_LLM, format!("{status}: {txt}")));
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| ModelError::InvalidResponse {
            model: MODEL_LLM.to_string(),
            message: e.to_string(),
        })?;
        Ok(parsed.response)
    }
}

/// 构造提示词
pub fn build_prompt(prefix: &str, last_command: Option<&str>, count: usize) -> String {
    let mut prompt = String::from(
        "You complete shell commands. Reply with complete commands only, one per line, \
         no numbering, no explanations.\n",
    );
    if let Some(last) = last_command {
        prompt.push_str(&format!("Previous command: {last}\n"));
    }
    prompt.push_str(&format!(
        "Give up to {count} likely completions of the partial command: {prefix}\n"
    ));
    prompt
}

/// 从模型输出中提取候选行
pub fn parse_completion_lines(raw: &str, prefix: &str, max_results: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        let cleaned = clean_line(line);
        if cleaned.len() <= prefix.len() || !cleaned.starts_with(prefix) {
            continue;
        }
        if !lines.iter().any(|existing| existing == cleaned) {
            lines.push(cleaned.to_string());
        }
        if lines.len() >= max_results {
            break;
        }
    }
    lines
}

fn clean_line(line: &str) -> &str {
    let mut line = line.trim();
    if line.starts_with("```") {
        return "";
    }
    for marker in ["- ", "* ", "$ ", "> "] {
        if let Some(rest) = line.strip_prefix(marker) {
            line = rest.trim_start();
        }
    }
    // 编号列表：`1. cmd` / `2) cmd`
    if let Some(pos) = line.find(['.', ')']) {
        if pos > 0 && line[..pos].chars().all(|c| c.is_ascii_digit()) {
            line = line[pos + 1..].trim_start();
        }
    }
    line.trim_matches('`').trim()
}

pub struct LlmModel {
    backend: Arc<dyn CompletionBackend>,
    context: Option<Arc<ContextState>>,
    min_prefix_len: usize,
}

impl LlmModel {
    pub fn new(backend: Arc<dyn CompletionBackend>, min_prefix_len: usize) -> Self {
        Self {
            backend,
            context: None,
            min_prefix_len,
        }
    }

    /// 提示词中带上最近一次确认的命令
    pub fn with_context(mut self, context: Arc<ContextState>) -> Self {
        self.context = Some(context);
        self
    }
}

#[async_trait]
impl PredictionModel for LlmModel {
    fn name(&self) -> &str {
        MODEL_LLM
    }

    async fn suggest(&self, prefix: &str, max_results: usize) -> ModelResult<Vec<Candidate>> {
        if prefix.trim().chars().count() < self.min_prefix_len || max_results == 0 {
            return Ok(Vec::new());
        }

        let last_command = self.context.as_ref().and_then(|c| c.last_command());
        let prompt = build_prompt(prefix, last_command.as_deref(), max_results);
        let raw = self.backend.complete(&prompt).await?;
        let lines = parse_completion_lines(&raw, prefix, max_results);
        debug!(prefix, returned = lines.len(), "completion.llm.parsed");

        Ok(lines
            .into_iter()
            .enumerate()
            .map(|(rank, text)| Candidate::new(text, TOP_SCORE * RANK_DECAY.powi(rank as i32), MODEL_LLM))
            .collect())
    }
}
