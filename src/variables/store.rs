use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};

use super::{Tensor, Update, check_shape};
use crate::{LookaheadErr, Result};

/// A stable handle to a variable inside a `VarStore`.
///
/// Handles are arena indices, they stay valid for the lifetime of the store that issued
/// them and are reproduced when a store is rebuilt by adding the same variables in the
/// same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(usize);

impl VarId {
    /// Returns the arena index of this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Variable {
    value: Tensor,
    trainable: bool,
}

/// The arena owning every variable of a training session: the model's parameters and
/// whatever state the optimizers allocate next to them.
///
/// Variables are only ever created or rewritten as a whole, either through `assign` or by
/// applying a step's `Update`s with `apply`.
#[derive(Debug, Clone, Default)]
pub struct VarStore {
    vars: Vec<Variable>,
}

impl VarStore {
    /// Creates a new empty `VarStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new variable to the store.
    ///
    /// # Arguments
    /// * `value` - The initial value of the variable.
    /// * `trainable` - Whether the variable is a model parameter.
    ///
    /// # Returns
    /// The handle of the new variable.
    pub fn add(&mut self, value: Tensor, trainable: bool) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(Variable { value, trainable });
        id
    }

    /// Adds a new trainable variable to the store.
    pub fn param(&mut self, value: Tensor) -> VarId {
        self.add(value, true)
    }

    /// Returns the current value of a variable.
    ///
    /// # Errors
    /// `UnknownVariable` if `id` wasn't issued by this store.
    pub fn get(&self, id: VarId) -> Result<&Tensor> {
        self.vars
            .get(id.0)
            .map(|var| &var.value)
            .ok_or(LookaheadErr::UnknownVariable(id))
    }

    /// Returns the handles of every trainable variable, in creation order.
    pub fn trainable_ids(&self) -> Vec<VarId> {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, var)| var.trainable)
            .map(|(i, _)| VarId(i))
            .collect()
    }

    /// Overwrites the value of a variable.
    ///
    /// # Errors
    /// `UnknownVariable` if `id` isn't in the store, `ShapeMismatch` if `value` doesn't have
    /// the variable's shape.
    pub fn assign(&mut self, id: VarId, value: Tensor) -> Result<()> {
        let var = self
            .vars
            .get_mut(id.0)
            .ok_or(LookaheadErr::UnknownVariable(id))?;

        check_shape("assign", value.shape(), var.value.shape())?;
        var.value = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Applies a step's updates with simultaneous semantics.
    ///
    /// Every update is resolved against the values the store holds before the call, only then
    /// are the results written. Several updates to the same variable are folded in order,
    /// each one resolving against the result of the previous. If any update fails to resolve
    /// nothing is written.
    ///
    /// # Arguments
    /// * `updates` - The operations of one step.
    pub fn apply<I>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = Update>,
    {
        let mut resolved: Vec<(VarId, Tensor)> = Vec::new();
        let mut positions = HashMap::new();

        for update in updates {
            let target = update.target();
            match positions.get(&target) {
                Some(&i) => {
                    let (_, value) = &mut resolved[i];
                    *value = update.resolve(value)?;
                }
                None => {
                    let value = update.resolve(self.get(target)?)?;
                    positions.insert(target, resolved.len());
                    resolved.push((target, value));
                }
            }
        }

        for (target, value) in resolved {
            self.vars[target.0].value = value;
        }

        Ok(())
    }
}
