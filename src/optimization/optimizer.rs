use std::fmt::Debug;

use crate::{
    Result,
    specs::{OptimizerSpec, OptimizerState},
    variables::{Gradients, Update, VarId, VarStore},
};

/// Defines the strategy for updating model parameters based on calculated gradients.
///
/// Implementors never write to existing variables themselves, a step is described as a list
/// of `Update`s which the caller applies with `VarStore::apply`.
pub trait Optimizer: Debug {
    /// Computes this step's updates.
    ///
    /// New state variables may be added to `store`, but every change to a variable that
    /// already exists must be returned as an `Update`. The global step counter is
    /// incremented once per successful call.
    ///
    /// # Arguments
    /// * `store` - The store holding the parameters and this optimizer's state.
    /// * `grads` - The gradient of the loss with respect to each parameter.
    /// * `params` - The parameters to optimize.
    ///
    /// # Returns
    /// The updates of this step, or an error if a gradient is missing or misshapen.
    fn compute_updates(
        &mut self,
        store: &mut VarStore,
        grads: &Gradients,
        params: &[VarId],
    ) -> Result<Vec<Update>>;

    /// Returns the global step counter, the amount of steps computed so far.
    fn iterations(&self) -> u64;

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, learning_rate: f32);

    /// Returns the spec this optimizer can be rebuilt from.
    fn spec(&self) -> OptimizerSpec;

    /// Exports every piece of state needed to reproduce this optimizer's future steps.
    fn state(&self, store: &VarStore) -> Result<OptimizerState>;

    /// Restores a state exported by `state`, allocating state variables in `store` as needed.
    fn load_state(&mut self, store: &mut VarStore, state: OptimizerState) -> Result<()>;

    /// Computes this step's updates and applies them onto `store`.
    fn apply_gradients(
        &mut self,
        store: &mut VarStore,
        grads: &Gradients,
        params: &[VarId],
    ) -> Result<()> {
        let updates = self.compute_updates(store, grads, params)?;
        store.apply(updates)
    }
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn compute_updates(
        &mut self,
        store: &mut VarStore,
        grads: &Gradients,
        params: &[VarId],
    ) -> Result<Vec<Update>> {
        (**self).compute_updates(store, grads, params)
    }

    fn iterations(&self) -> u64 {
        (**self).iterations()
    }

    fn learning_rate(&self) -> f32 {
        (**self).learning_rate()
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        (**self).set_learning_rate(learning_rate);
    }

    fn spec(&self) -> OptimizerSpec {
        (**self).spec()
    }

    fn state(&self, store: &VarStore) -> Result<OptimizerState> {
        (**self).state(store)
    }

    fn load_state(&mut self, store: &mut VarStore, state: OptimizerState) -> Result<()> {
        (**self).load_state(store, state)
    }

    fn apply_gradients(
        &mut self,
        store: &mut VarStore,
        grads: &Gradients,
        params: &[VarId],
    ) -> Result<()> {
        (**self).apply_gradients(store, grads, params)
    }
}
