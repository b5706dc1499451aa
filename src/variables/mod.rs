mod gradients;
mod store;
mod update;

pub use gradients::Gradients;
pub use store::{VarId, VarStore};
pub use update::Update;

use ndarray::ArrayD;

use crate::{LookaheadErr, Result};

/// The numeric value held by every variable.
pub type Tensor = ArrayD<f32>;

/// Fails with a `ShapeMismatch` unless both shapes are equal.
///
/// Tensor arithmetic in this crate never relies on broadcasting, every operand must match
/// its target exactly.
pub(crate) fn check_shape(what: &'static str, got: &[usize], expected: &[usize]) -> Result<()> {
    if got != expected {
        return Err(LookaheadErr::ShapeMismatch {
            what,
            got: got.to_vec(),
            expected: expected.to_vec(),
        });
    }

    Ok(())
}
