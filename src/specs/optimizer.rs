use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{LookaheadErr, Result};

/// The specification for the `Optimizer` trait.
///
/// A spec holds exactly the constructor arguments of an optimizer, building it again
/// through `OptimizerBuilder` yields an equivalent fresh instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        momentum: f32,
    },
    Lookahead(LookaheadConfig),
}

impl OptimizerSpec {
    /// Resolves an optimizer name into its spec with default hyperparameters.
    ///
    /// The lookup is case insensitive, recognized names are `adam`, `sgd` or
    /// `gradient_descent`, and `momentum` or `gradient_descent_with_momentum`.
    ///
    /// # Errors
    /// `UnknownOptimizer` if `name` isn't one of the above.
    pub fn from_name(name: &str) -> Result<Self> {
        let spec = match name.to_ascii_lowercase().as_str() {
            "adam" => Self::Adam {
                learning_rate: 0.001,
                beta1: 0.9,
                beta2: 0.999,
                epsilon: 1e-7,
            },
            "sgd" | "gradient_descent" => Self::GradientDescent {
                learning_rate: 0.01,
            },
            "momentum" | "gradient_descent_with_momentum" => Self::GradientDescentWithMomentum {
                learning_rate: 0.01,
                momentum: 0.9,
            },
            _ => return Err(LookaheadErr::UnknownOptimizer(name.to_string())),
        };

        Ok(spec)
    }

    /// Returns the snake case name of the optimizer this spec builds.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Adam { .. } => "adam",
            Self::GradientDescent { .. } => "gradient_descent",
            Self::GradientDescentWithMomentum { .. } => "gradient_descent_with_momentum",
            Self::Lookahead(_) => "lookahead",
        }
    }
}

impl FromStr for OptimizerSpec {
    type Err = LookaheadErr;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

fn default_sync_period() -> u64 {
    5
}

fn default_slow_step() -> f32 {
    0.5
}

/// The serialized configuration of a `Lookahead` optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookaheadConfig {
    /// The spec of the wrapped optimizer.
    pub optimizer: Box<OptimizerSpec>,
    /// The amount of steps between two synchronizations, must be positive.
    #[serde(default = "default_sync_period")]
    pub sync_period: u64,
    /// How far the slow weights move towards the fast ones when synchronizing.
    #[serde(default = "default_slow_step")]
    pub slow_step: f32,
}

impl LookaheadConfig {
    /// Creates a new `LookaheadConfig` with the default `sync_period` and `slow_step`.
    pub fn new(optimizer: OptimizerSpec) -> Self {
        Self {
            optimizer: Box::new(optimizer),
            sync_period: default_sync_period(),
            slow_step: default_slow_step(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
