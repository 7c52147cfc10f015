use sqlx::Error as SqlxError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// 数据存储错误
///
/// 写入方（同步任务）记录日志后在下一轮重试；
/// 读取方（交互查询路径）降级为空结果。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] SqlxError),
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("SQL script error in {script}: {reason}")]
    SqlScript { script: String, reason: String },
    #[error("Store is unavailable: {0}")]
    Unavailable(String),
    #[error("Storage internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        StoreError::Internal(message.into())
    }
}
