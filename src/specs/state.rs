use ndarray::IxDyn;
use serde::{Deserialize, Serialize};

use crate::{
    LookaheadErr, Result,
    variables::{Tensor, VarId},
};

/// A tensor laid out as plain data, elements in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorRecord {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorRecord {
    pub fn from_tensor(tensor: &Tensor) -> Self {
        Self {
            shape: tensor.shape().to_vec(),
            data: tensor.iter().copied().collect(),
        }
    }

    /// Rebuilds the tensor.
    ///
    /// # Errors
    /// `StateMismatch` if the amount of elements doesn't match the shape.
    pub fn into_tensor(self) -> Result<Tensor> {
        Tensor::from_shape_vec(IxDyn(&self.shape), self.data)
            .map_err(|e| LookaheadErr::StateMismatch(e.to_string()))
    }
}

/// A value associated to a variable, keyed by the variable's stable identity.
///
/// For optimizer slots `var` is the parameter the slot belongs to, not the slot itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarRecord {
    pub var: VarId,
    pub value: TensorRecord,
}

/// The persisted state of an optimizer, one variant per `OptimizerSpec` variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerState {
    Adam {
        iterations: u64,
        m: Vec<VarRecord>,
        v: Vec<VarRecord>,
    },
    GradientDescent {
        iterations: u64,
    },
    GradientDescentWithMomentum {
        iterations: u64,
        velocity: Vec<VarRecord>,
    },
    Lookahead {
        slow: Vec<VarRecord>,
        inner: Box<OptimizerState>,
    },
}

impl OptimizerState {
    /// Returns the snake case name of the optimizer this state belongs to.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Adam { .. } => "adam",
            Self::GradientDescent { .. } => "gradient_descent",
            Self::GradientDescentWithMomentum { .. } => "gradient_descent_with_momentum",
            Self::Lookahead { .. } => "lookahead",
        }
    }

    /// Returns the global step counter recorded in this state.
    pub fn iterations(&self) -> u64 {
        match self {
            Self::Adam { iterations, .. }
            | Self::GradientDescent { iterations }
            | Self::GradientDescentWithMomentum { iterations, .. } => *iterations,
            Self::Lookahead { inner, .. } => inner.iterations(),
        }
    }

    /// Builds the error returned when this state is loaded into the wrong optimizer.
    pub(crate) fn mismatch(&self, expected: &str) -> LookaheadErr {
        LookaheadErr::StateMismatch(format!(
            "expected {expected} state, got {} state",
            self.name()
        ))
    }
}
