use super::{Optimizer, Slots};
use crate::{
    Result,
    specs::{OptimizerSpec, OptimizerState},
    variables::{Gradients, Tensor, Update, VarId, VarStore},
};

#[derive(Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    iterations: u64,
    m: Slots,
    v: Slots,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            iterations: 0,
            m: Slots::new(),
            v: Slots::new(),
        }
    }
}

impl Optimizer for Adam {
    fn compute_updates(
        &mut self,
        store: &mut VarStore,
        grads: &Gradients,
        params: &[VarId],
    ) -> Result<Vec<Update>> {
        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        let t = (self.iterations + 1) as f32;
        let step_size = lr * (1. - b2.powf(t)).sqrt() / (1. - b1.powf(t));
        let mut updates = Vec::with_capacity(3 * params.len());

        for &id in params {
            let m_id = self.m.get_or_insert(store, id, |p| Tensor::zeros(p.raw_dim()))?;
            let v_id = self.v.get_or_insert(store, id, |p| Tensor::zeros(p.raw_dim()))?;

            let grad = grads.for_param(id, store.get(id)?)?;
            let m_t = store.get(m_id)? * b1 + grad * (1. - b1);
            let v_t = store.get(v_id)? * b2 + grad.mapv(|g| g * g) * (1. - b2);
            let delta = &m_t * step_size / (v_t.mapv(f32::sqrt) + eps);

            updates.push(Update::assign(m_id, m_t));
            updates.push(Update::assign(v_id, v_t));
            updates.push(Update::decrement(id, delta));
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
        OptimizerSpec::Adam {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
        }
    }

    fn state(&self, store: &VarStore) -> Result<OptimizerState> {
        Ok(OptimizerState::Adam {
            iterations: self.iterations,
            m: self.m.records(store)?,
            v: self.v.records(store)?,
        })
    }

    fn load_state(&mut self, store: &mut VarStore, state: OptimizerState) -> Result<()> {
        let OptimizerState::Adam { iterations, m, v } = state else {
            return Err(state.mismatch("adam"));
        };

        self.m.load(store, m)?;
        self.v.load(store, v)?;
        self.iterations = iterations;
        Ok(())
    }
}
