/*!
 * TOML配置读取器
 *
 * 文件不存在时返回默认配置；文件存在但无法解析时返回错误，
 * 由调用方决定是否退回默认配置。
 */

use crate::config::types::AppConfig;
use crate::utils::error::AppResult;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// 指定配置文件位置的环境变量
pub const CONFIG_ENV_VAR: &str = "GHOSTLINE_CONFIG";

/// 配置文件路径：显式参数优先，其次环境变量，最后平台默认位置
pub fn resolve_config_path(explicit: Option<&Path>, default_path: PathBuf) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => default_path,
    }
}

/// 从文件系统加载TOML配置
pub async fn load_config(config_path: &Path) -> AppResult<AppConfig> {
    debug!("开始加载TOML配置: {:?}", config_path);

    if !config_path.exists() {
        info!(path = %config_path.display(), "config.default_used");
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(config_path)
        .await
        .with_context(|| format!("无法读取配置文件: {}", config_path.display()))?;

    parse_toml_content(&content)
        .with_context(|| format!("TOML配置解析失败 (文件: {})", config_path.display()))
}

/// 解析TOML内容为配置结构
pub fn parse_toml_content(content: &str) -> AppResult<AppConfig> {
    Ok(toml::from_str::<AppConfig>(content)?)
}
