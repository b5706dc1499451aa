use crate::{
    Result,
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Lookahead, Optimizer},
    specs::{LookaheadConfig, OptimizerSpec},
};

/// Builds new `Optimizer`s given a specification.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptimizerBuilder;

impl OptimizerBuilder {
    /// Creates a new `OptimizerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a fresh optimizer following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the optimizer, a `Lookahead` spec builds its inner
    ///   optimizer recursively.
    ///
    /// # Returns
    /// A new boxed optimizer or an error if the spec holds an invalid configuration.
    pub fn build(&self, spec: OptimizerSpec) -> Result<Box<dyn Optimizer>> {
        let optimizer: Box<dyn Optimizer> = match spec {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(learning_rate, beta1, beta2, epsilon)),
            OptimizerSpec::GradientDescent { learning_rate } => {
                Box::new(GradientDescent::new(learning_rate))
            }
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => Box::new(GradientDescentWithMomentum::new(learning_rate, momentum)),
            OptimizerSpec::Lookahead(LookaheadConfig {
                optimizer,
                sync_period,
                slow_step,
            }) => {
                let inner = self.build(*optimizer)?;
                Box::new(Lookahead::new(inner, sync_period, slow_step)?)
            }
        };

        Ok(optimizer)
    }

    /// Builds the optimizer registered under `name` with its default hyperparameters.
    pub fn build_named(&self, name: &str) -> Result<Box<dyn Optimizer>> {
        self.build(OptimizerSpec::from_name(name)?)
    }
}
