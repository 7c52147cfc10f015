//! 集成引擎：选择模型、并发调用、合并排序

pub mod engine;
pub mod ranking;
pub mod selection;

pub use engine::{Ensemble, EnsembleConfig};
pub use ranking::{rank_candidates, CombineRule, ModelOutput, ModelWeights};
pub use selection::ModelSelection;
