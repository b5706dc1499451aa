pub mod builder;
pub mod checkpoint;
pub mod error;
pub mod optimization;
pub mod specs;
pub mod variables;

pub use builder::OptimizerBuilder;
pub use checkpoint::Checkpoint;
pub use error::{LookaheadErr, Result};
pub use optimization::{Lookahead, Optimizer};
