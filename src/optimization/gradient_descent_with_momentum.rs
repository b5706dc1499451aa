use super::{Optimizer, Slots};
use crate::{
    Result,
    specs::{OptimizerSpec, OptimizerState},
    variables::{Gradients, Tensor, Update, VarId, VarStore},
};

#[derive(Debug)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    iterations: u64,
    velocity: Slots,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            iterations: 0,
            velocity: Slots::new(),
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn compute_updates(
        &mut self,
        store: &mut VarStore,
        grads: &Gradients,
        params: &[VarId],
    ) -> Result<Vec<Update>> {
        let lr = self.learning_rate;
        let mu = self.momentum;
        let mut updates = Vec::with_capacity(2 * params.len());

        for &id in params {
            let velocity_id = self
                .velocity
                .get_or_insert(store, id, |p| Tensor::zeros(p.raw_dim()))?;

            let grad = grads.for_param(id, store.get(id)?)?;
            let velocity = store.get(velocity_id)?;
            let velocity_t = velocity * mu + grad;

            updates.push(Update::decrement(id, &velocity_t * lr));
            updates.push(Update::assign(velocity_id, velocity_t));
        }

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
        OptimizerSpec::GradientDescentWithMomentum {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
        }
    }

    fn state(&self, store: &VarStore) -> Result<OptimizerState> {
        Ok(OptimizerState::GradientDescentWithMomentum {
            iterations: self.iterations,
            velocity: self.velocity.records(store)?,
        })
    }

    fn load_state(&mut self, store: &mut VarStore, state: OptimizerState) -> Result<()> {
        let OptimizerState::GradientDescentWithMomentum {
            iterations,
            velocity,
        } = state
        else {
            return Err(state.mismatch("gradient_descent_with_momentum"));
        };

        self.velocity.load(store, velocity)?;
        self.iterations = iterations;
        Ok(())
    }
}
