//! 补全模块
//!
//! 预测模型、集成引擎以及面向终端交互层的会话接口。

pub mod command_line;
pub mod ensemble;
pub mod error;
pub mod models;
pub mod session;
pub mod snapshot;
pub mod types;

pub use ensemble::{CombineRule, Ensemble, EnsembleConfig, ModelSelection, ModelWeights};
pub use error::{ModelError, ModelResult};
pub use models::{build_models, ContextState, PredictionModel};
pub use session::SuggestionSession;
pub use types::{Candidate, Contribution, RankedCandidate};
