use super::{Tensor, VarId, check_shape};
use crate::Result;

/// A description of how one variable changes during a step.
///
/// Optimizers return these instead of mutating variables, so whoever drives them can
/// inspect or rewrite a step before it's applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Sets the target to a new value.
    Assign { target: VarId, value: Tensor },
    /// Adds `delta` to the target.
    Increment { target: VarId, delta: Tensor },
    /// Subtracts `delta` from the target.
    Decrement { target: VarId, delta: Tensor },
}

impl Update {
    pub fn assign(target: VarId, value: Tensor) -> Self {
        Self::Assign { target, value }
    }

    pub fn increment(target: VarId, delta: Tensor) -> Self {
        Self::Increment { target, delta }
    }

    pub fn decrement(target: VarId, delta: Tensor) -> Self {
        Self::Decrement { target, delta }
    }

    /// Returns the variable this update writes to.
    pub fn target(&self) -> VarId {
        match self {
            Self::Assign { target, .. }
            | Self::Increment { target, .. }
            | Self::Decrement { target, .. } => *target,
        }
    }

    /// Computes the value the target would hold after this update.
    ///
    /// # Arguments
    /// * `current` - The target's value before the step.
    ///
    /// # Errors
    /// `ShapeMismatch` if the update's payload doesn't have `current`'s shape.
    pub fn resolve(self, current: &Tensor) -> Result<Tensor> {
        match self {
            Self::Assign { value, .. } => {
                check_shape("assign update", value.shape(), current.shape())?;
                Ok(value)
            }
            Self::Increment { delta, .. } => {
                check_shape("increment update", delta.shape(), current.shape())?;
                Ok(current + &delta)
            }
            Self::Decrement { delta, .. } => {
                check_shape("decrement update", delta.shape(), current.shape())?;
                Ok(current - &delta)
            }
        }
    }
}
