/*!
 * 配置模块
 *
 * 基于 TOML 的配置文件，命令行参数可以覆盖其中的部分字段。
 */

pub mod reader;
pub mod types;

pub use reader::{load_config, parse_toml_content, resolve_config_path, CONFIG_ENV_VAR};
pub use types::{
    AppConfig, CombineKind, EnsembleSettings, LlmSettings, MarkovSettings, StorageSettings,
    SyncSettings,
};
