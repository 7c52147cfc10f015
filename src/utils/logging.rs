//! 日志初始化
//!
//! stdout 只输出补全结果，日志一律写到 stderr。级别由 RUST_LOG 控制。

use tracing_subscriber::{fmt, EnvFilter};

/// 未设置 RUST_LOG 时的默认过滤规则
pub const DEFAULT_LOG_FILTER: &str = "info";

pub fn init_logging() -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| format!("日志系统初始化失败: {e}"))?;

    tracing::debug!(filter = DEFAULT_LOG_FILTER, "logging.initialized");
    Ok(())
}
