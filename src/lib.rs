//! ghostline 命令建议
//!
//! 根据 shell 历史、别名和当前上下文，在用户输入命令时给出排序后的补全建议。
//! 主要组成：
//! - 数据存储与后台同步（历史、别名）
//! - 多个预测模型（频率、Markov、别名、上下文、语言模型）
//! - 集成引擎：在时间预算内合并排序各模型的候选

pub mod completion; // 预测模型与集成引擎
pub mod config; // TOML 配置
pub mod loaders; // 历史与别名加载器
pub mod setup; // 组件装配
pub mod storage; // 数据存储
pub mod sync; // 后台同步任务
pub mod utils; // 错误与日志
