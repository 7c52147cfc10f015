//! 数据加载器模块
//!
//! 从运行环境（shell 历史文件、别名定义）读取原始数据并规范化为记录。
//! 加载器只读，不接触数据存储。

pub mod alias;
pub mod history;

pub use alias::{parse_alias_line, RcFileAliasLoader, ShellAliasLoader};
pub use history::{parse_history_content, ShellHistoryLoader, ShellType};

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type LoadResult<T> = Result<T, LoadError>;

/// 数据源缺失或不可读
///
/// 同步任务把它当作“本轮没有可同步的数据”，不会让进程失败。
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Source not found: {path}")]
    NotFound { path: PathBuf },
    #[error("No {kind} source could be detected")]
    Undetected { kind: &'static str },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command `{program}` failed: {message}")]
    Command { program: String, message: String },
    #[error("Command `{program}` timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

impl LoadError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LoadError::Io {
            context: context.into(),
            source,
        }
    }
}

/// 数据加载器
#[async_trait]
pub trait Loader: Send + Sync {
    type Record: Send;

    /// 数据源名称
    fn name(&self) -> &str;

    /// 同步游标的键
    ///
    /// 默认等于名称；读取具体文件的加载器应当带上解析后的路径，
    /// 这样切换到另一个文件时不会沿用旧文件的游标。
    fn source_key(&self) -> String {
        self.name().to_string()
    }

    /// 读取一次完整数据，记录顺序即数据源中的顺序
    async fn load(&self) -> LoadResult<Vec<Self::Record>>;
}
