use std::{fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    builder::OptimizerBuilder,
    optimization::Optimizer,
    specs::{OptimizerSpec, OptimizerState, TensorRecord, VarRecord},
    variables::VarStore,
};

/// A snapshot of a training session: the model's trainable parameters together with the
/// optimizer driving them, enough to resume training exactly where it was left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub params: Vec<VarRecord>,
    pub optimizer: OptimizerSpec,
    pub state: OptimizerState,
}

impl Checkpoint {
    /// Takes a snapshot of every trainable variable of `store` and of `optimizer`.
    pub fn capture<O: Optimizer + ?Sized>(store: &VarStore, optimizer: &O) -> Result<Self> {
        let params = store
            .trainable_ids()
            .into_iter()
            .map(|id| {
                Ok(VarRecord {
                    var: id,
                    value: TensorRecord::from_tensor(store.get(id)?),
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            params,
            optimizer: optimizer.spec(),
            state: optimizer.state(store)?,
        })
    }

    /// Restores this snapshot onto `store`.
    ///
    /// `store` must hold the same parameters, with the same shapes and handles, as the store
    /// the snapshot was captured from, which is the case when the model is built again the
    /// same way. Parameter values are overwritten and the optimizer is rebuilt from its spec
    /// with its state loaded back. The restore happens on a copy of `store` which replaces it
    /// only once every step succeeded.
    ///
    /// # Returns
    /// The restored optimizer or an error if the snapshot doesn't fit `store`, in which case
    /// `store` is left untouched.
    pub fn restore(self, store: &mut VarStore) -> Result<Box<dyn Optimizer>> {
        let mut staged = store.clone();

        for VarRecord { var, value } in self.params {
            staged.assign(var, value.into_tensor()?)?;
        }

        let mut optimizer = OptimizerBuilder::new().build(self.optimizer)?;
        optimizer.load_state(&mut staged, self.state)?;

        *store = staged;
        Ok(optimizer)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes this snapshot to `path` as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;

        info!(iterations = self.state.iterations(); "checkpoint saved to {}", path.display());
        Ok(())
    }

    /// Reads a snapshot written by `save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let checkpoint = Self::from_json(&fs::read_to_string(path)?)?;

        info!(
            iterations = checkpoint.state.iterations();
            "checkpoint loaded from {}",
            path.display()
        );
        Ok(checkpoint)
    }
}
