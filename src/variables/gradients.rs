use std::collections::HashMap;

use super::{Tensor, VarId, check_shape};
use crate::{LookaheadErr, Result};

/// The gradient of the loss with respect to each trainable variable, computed by the caller.
#[derive(Debug, Clone, Default)]
pub struct Gradients {
    grads: HashMap<VarId, Tensor>,
}

impl Gradients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gradient of `id`, replacing any previous one.
    pub fn insert(&mut self, id: VarId, grad: Tensor) {
        self.grads.insert(id, grad);
    }

    pub fn get(&self, id: VarId) -> Option<&Tensor> {
        self.grads.get(&id)
    }

    /// Returns the gradient of a parameter, checking it matches the parameter's shape.
    ///
    /// # Arguments
    /// * `id` - The parameter.
    /// * `param` - The parameter's current value.
    ///
    /// # Errors
    /// `MissingGradient` if there's no gradient for `id`, `ShapeMismatch` if it has the wrong
    /// shape.
    pub fn for_param(&self, id: VarId, param: &Tensor) -> Result<&Tensor> {
        let grad = self.get(id).ok_or(LookaheadErr::MissingGradient(id))?;
        check_shape("gradient", grad.shape(), param.shape())?;
        Ok(grad)
    }
}

impl FromIterator<(VarId, Tensor)> for Gradients {
    fn from_iter<I: IntoIterator<Item = (VarId, Tensor)>>(iter: I) -> Self {
        Self {
            grads: iter.into_iter().collect(),
        }
    }
}
