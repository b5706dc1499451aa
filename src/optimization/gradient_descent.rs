use super::Optimizer;
use crate::{
    Result,
    specs::{OptimizerSpec, OptimizerState},
    variables::{Gradients, Update, VarId, VarStore},
};

/// Gradient descent optimization algorithm.
#[derive(Debug)]
pub struct GradientDescent {
    learning_rate: f32,
    iterations: u64,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            iterations: 0,
        }
    }
}

impl Optimizer for GradientDescent {
    /// Makes a step in the opposite direction of the gradient, with a length of `learning_rate`.
    fn compute_updates(
        &mut self,
        store: &mut VarStore,
        grads: &Gradients,
        params: &[VarId],
    ) -> Result<Vec<Update>> {
        let lr = self.learning_rate;

        let updates = params
            .iter()
            .map(|&id| {
                let grad = grads.for_param(id, store.get(id)?)?;
                Ok(Update::decrement(id, grad * lr))
            })
            .collect::<Result<Vec<_>>>()?;

        self.iterations += 1;
        Ok(updates)
    }

    fn iterations(&self) -> u64 {
        self.iterations
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    fn spec(&self) -> OptimizerSpec {
        OptimizerSpec::GradientDescent {
            learning_rate: self.learning_rate,
        }
    }

    fn state(&self, _store: &VarStore) -> Result<OptimizerState> {
        Ok(OptimizerState::GradientDescent {
            iterations: self.iterations,
        })
    }

    fn load_state(&mut self, _store: &mut VarStore, state: OptimizerState) -> Result<()> {
        let OptimizerState::GradientDescent { iterations } = state else {
            return Err(state.mismatch("gradient_descent"));
        };

        self.iterations = iterations;
        Ok(())
    }
}
