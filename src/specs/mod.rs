mod optimizer;
mod state;

pub use optimizer::{LookaheadConfig, OptimizerSpec};
pub use state::{OptimizerState, TensorRecord, VarRecord};
