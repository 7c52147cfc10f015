/*!
 * 配置数据类型
 *
 * 结构与 TOML 配置文件保持一致，所有字段都有默认值，
 * 配置文件只需要写出想要覆盖的部分。
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 集成排序 (对应 TOML 中的 [ensemble])
    pub ensemble: EnsembleSettings,

    /// 后台同步 (对应 TOML 中的 [sync])
    pub sync: SyncSettings,

    /// 存储 (对应 TOML 中的 [storage])
    pub storage: StorageSettings,

    /// Markov 模型 (对应 TOML 中的 [markov])
    pub markov: MarkovSettings,

    /// 语言模型 (对应 TOML 中的 [llm])
    pub llm: LlmSettings,
}

/// 分数合并规则
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CombineKind {
    #[default]
    WeightedSum,
    Max,
    RankFusion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnsembleSettings {
    /// 最终返回的最大条数
    pub max_results: usize,
    /// 每个模型最多贡献的条数
    pub per_model_limit: usize,
    /// 单个模型的时间预算
    pub model_budget_ms: u64,
    pub combine: CombineKind,
    /// RankFusion 的平滑常数
    pub rank_fusion_k: f64,
    /// 逗号分隔的模型名，空表示全部
    pub active_models: String,
    /// 按模型名配置的权重，未列出的模型权重为 1
    pub weights: BTreeMap<String, f64>,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        let weights = [
            ("alias", 2.0),
            ("freq", 1.0),
            ("markov", 1.0),
            ("context", 0.8),
            ("llm", 0.6),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            max_results: 8,
            per_model_limit: 16,
            model_budget_ms: 150,
            combine: CombineKind::WeightedSum,
            rank_fusion_k: 60.0,
            active_models: String::new(),
            weights,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncSettings {
    /// 0 表示只在启动时同步一次
    pub refresh_interval_secs: u64,
    /// 历史文件，未设置时自动检测
    pub history_file: Option<PathBuf>,
    /// 读取别名使用的 shell，未设置时使用 $SHELL
    pub shell: Option<String>,
    /// 额外解析的 rc 文件，未设置时使用常见默认文件
    pub alias_files: Option<Vec<PathBuf>>,
    pub alias_command_timeout_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            history_file: None,
            shell: None,
            alias_files: None,
            alias_command_timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    /// 数据库文件，未设置时放在平台数据目录下
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkovSettings {
    /// 两次索引重建之间的最小间隔
    pub rebuild_interval_ms: u64,
    /// 建索引时读取的历史条数上限
    pub max_history: usize,
}

impl Default for MarkovSettings {
    fn default() -> Self {
        Self {
            rebuild_interval_ms: 1000,
            max_history: 20_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    /// Ollama 兼容服务地址
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    /// 输入短于该长度时不请求
    pub min_prefix_len: usize,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "qwen2.5-coder:1.5b".to_string(),
            timeout_ms: 2000,
            min_prefix_len: 3,
            temperature: 0.2,
        }
    }
}
