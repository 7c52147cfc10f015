//! 预测模型错误类型

use std::time::Duration;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// 模型失败只会让该模型本次不贡献候选
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{model} backend error: {message}")]
    Backend { model: String, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid response from {model}: {message}")]
    InvalidResponse { model: String, message: String },
    #[error("{model} exceeded its {budget:?} budget")]
    BudgetExceeded { model: String, budget: Duration },
    #[error("Query cancelled")]
    Cancelled,
}

impl ModelError {
    pub fn backend(model: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::Backend {
            model: model.into(),
            message: message.into(),
        }
    }

    /// 汇总日志里使用的状态标签
    pub fn status(&self) -> &'static str {
        match self {
            ModelError::BudgetExceeded { .. } => "timeout",
            ModelError::Cancelled => "cancelled",
            _ => "error",
        }
    }
}
