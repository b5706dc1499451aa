use std::collections::BTreeMap;

use crate::{
    Result,
    specs::{TensorRecord, VarRecord},
    variables::{Tensor, VarId, VarStore, check_shape},
};

/// A set of non-trainable state variables, one per parameter, owned by an optimizer.
#[derive(Debug, Clone, Default)]
pub(crate) struct Slots {
    slots: BTreeMap<VarId, VarId>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot of `param`, if it has one.
    pub fn get(&self, param: VarId) -> Option<VarId> {
        self.slots.get(&param).copied()
    }

    /// Returns the slot of `param`, allocating it in `store` if it doesn't exist yet.
    ///
    /// # Arguments
    /// * `store` - The store holding `param`.
    /// * `param` - The parameter the slot belongs to.
    /// * `init` - Builds the slot's initial value from the parameter's current value.
    pub fn get_or_insert<F>(&mut self, store: &mut VarStore, param: VarId, init: F) -> Result<VarId>
    where
        F: FnOnce(&Tensor) -> Tensor,
    {
        if let Some(slot) = self.get(param) {
            return Ok(slot);
        }

        let value = init(store.get(param)?);
        let slot = store.add(value, false);
        self.slots.insert(param, slot);
        Ok(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Exports the value of every slot keyed by its parameter, in parameter order.
    pub fn records(&self, store: &VarStore) -> Result<Vec<VarRecord>> {
        self.slots
            .iter()
            .map(|(&param, &slot)| {
                Ok(VarRecord {
                    var: param,
                    value: TensorRecord::from_tensor(store.get(slot)?),
                })
            })
            .collect()
    }

    /// Restores slot values exported by `records`.
    ///
    /// Existing slots are overwritten, missing ones are allocated. Every value must have the
    /// shape of the parameter it belongs to, and every record is checked before `store` is
    /// written to, so a failed load leaves it untouched.
    pub fn load(&mut self, store: &mut VarStore, records: Vec<VarRecord>) -> Result<()> {
        let values = records
            .into_iter()
            .map(|VarRecord { var: param, value }| {
                let value = value.into_tensor()?;
                check_shape("slot", value.shape(), store.get(param)?.shape())?;
                Ok((param, value))
            })
            .collect::<Result<Vec<_>>>()?;

        for (param, value) in values {
            match self.get(param) {
                Some(slot) => store.assign(slot, value)?,
                None => {
                    let slot = store.add(value, false);
                    self.slots.insert(param, slot);
                }
            }
        }

        Ok(())
    }
}
