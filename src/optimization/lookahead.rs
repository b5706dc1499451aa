use std::collections::HashMap;

use log::{debug, warn};

use super::{Optimizer, Slots};
use crate::{
    LookaheadErr, Result,
    builder::OptimizerBuilder,
    specs::{LookaheadConfig, OptimizerSpec, OptimizerState},
    variables::{Gradients, Tensor, Update, VarId, VarStore, check_shape},
};

/// The lookahead mechanism for optimizers: *k steps forward, 1 step back*.
///
/// Wraps an inner optimizer and keeps a slow copy of every parameter it sees. The inner
/// optimizer's updates go through unchanged except every `sync_period` steps, when both the
/// slow and the fast weights are set to `slow + slow_step * (fast - slow)`, where `fast` is
/// what the inner optimizer would have produced on that step.
///
/// The step counter belongs to the inner optimizer, this wrapper reads it but never
/// increments it on its own.
#[derive(Debug)]
pub struct Lookahead<O: Optimizer = Box<dyn Optimizer>> {
    optimizer: O,
    sync_period: u64,
    slow_step: f32,
    slow: Slots,
}

impl<O: Optimizer> Lookahead<O> {
    pub const DEFAULT_SYNC_PERIOD: u64 = 5;
    pub const DEFAULT_SLOW_STEP: f32 = 0.5;

    /// Creates a new `Lookahead` optimizer.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer whose updates are wrapped.
    /// * `sync_period` - The amount of steps between two synchronizations.
    /// * `slow_step` - The step size of the slow weights, expected in (0, 1). Values outside
    ///   of it are accepted and make the fast weights undershoot or overshoot.
    ///
    /// # Returns
    /// A new `Lookahead` instance or an `InvalidConfig` error if `sync_period` is zero.
    pub fn new(optimizer: O, sync_period: u64, slow_step: f32) -> Result<Self> {
        if sync_period == 0 {
            return Err(LookaheadErr::InvalidConfig(
                "sync_period must be greater than 0".into(),
            ));
        }

        if !(slow_step > 0. && slow_step < 1.) {
            warn!(slow_step = slow_step; "slow_step is outside of (0, 1)");
        }

        Ok(Self {
            optimizer,
            sync_period,
            slow_step,
            slow: Slots::new(),
        })
    }

    /// Creates a new `Lookahead` optimizer synchronizing every 5 steps with a slow step of 0.5.
    pub fn with_defaults(optimizer: O) -> Self {
        Self {
            optimizer,
            sync_period: Self::DEFAULT_SYNC_PERIOD,
            slow_step: Self::DEFAULT_SLOW_STEP,
            slow: Slots::new(),
        }
    }

    pub fn inner(&self) -> &O {
        &self.optimizer
    }

    pub fn inner_mut(&mut self) -> &mut O {
        &mut self.optimizer
    }

    pub fn into_inner(self) -> O {
        self.optimizer
    }

    pub fn sync_period(&self) -> u64 {
        self.sync_period
    }

    pub fn slow_step(&self) -> f32 {
        self.slow_step
    }

    /// Returns the slow weight tracking `param`, if it was already seen.
    pub fn slow_weight(&self, param: VarId) -> Option<VarId> {
        self.slow.get(param)
    }

    /// Returns the amount of parameters with a slow weight.
    pub fn tracked(&self) -> usize {
        self.slow.len()
    }

    /// Whether the next call to `compute_updates` synchronizes the slow weights.
    pub fn is_sync_step(&self) -> bool {
        is_sync_step(self.optimizer.iterations(), self.sync_period)
    }

    pub fn to_config(&self) -> LookaheadConfig {
        LookaheadConfig {
            optimizer: Box::new(self.optimizer.spec()),
            sync_period: self.sync_period,
            slow_step: self.slow_step,
        }
    }

    /// Returns the interpolated value both weights take on a synchronization step.
    fn interpolate(&self, slow: &Tensor, fast: &Tensor) -> Result<Tensor> {
        check_shape("slow weight", fast.shape(), slow.shape())?;
        Ok(slow + &((fast - slow) * self.slow_step))
    }
}

impl Lookahead {
    /// Builds a `Lookahead` from its serialized configuration, resolving the inner optimizer
    /// from its spec.
    ///
    /// # Errors
    /// `UnknownOptimizer` or `InvalidConfig` if the inner optimizer can't be built, and
    /// `InvalidConfig` if `sync_period` is zero.
    pub fn from_config(config: LookaheadConfig) -> Result<Self> {
        let LookaheadConfig {
            optimizer,
            sync_period,
            slow_step,
        } = config;

        let optimizer = OptimizerBuilder::new().build(*optimizer)?;
        Self::new(optimizer, sync_period, slow_step)
    }

    /// Builds a `Lookahead` wrapping the optimizer registered under `name` with its default
    /// hyperparameters.
    pub fn from_name(name: &str, sync_period: u64, slow_step: f32) -> Result<Self> {
        let optimizer = OptimizerBuilder::new().build_named(name)?;
        Self::new(optimizer, sync_period, slow_step)
    }
}

/// Whether the step following `iterations` completes a synchronization period.
///
/// Uses the floor division test `(n / k) * k == n` on the 1-based step number.
fn is_sync_step(iterations: u64, sync_period: u64) -> bool {
    let step = iterations + 1;
    (step / sync_period) * sync_period == step
}

impl<O: Optimizer> Optimizer for Lookahead<O> {
    fn compute_updates(
        &mut self,
        store: &mut VarStore,
        grads: &Gradients,
        params: &[VarId],
    ) -> Result<Vec<Update>> {
        let iterations = self.optimizer.iterations();
        let sync = is_sync_step(iterations, self.sync_period);

        for &param in params {
            if self.slow.get(param).is_none() {
                let slow = self.slow.get_or_insert(store, param, Tensor::clone)?;
                debug!(param = param.index(), slow = slow.index(); "tracking new slow weight");
            }
        }

        let proposed = self.optimizer.compute_updates(store, grads, params)?;

        let mut updates = Vec::with_capacity(proposed.len());
        let mut fast_updates = Vec::new();

        // every proposal for a tracked target folds into a single fast candidate
        let mut candidates: Vec<(VarId, VarId, Tensor)> = Vec::new();
        let mut positions = HashMap::new();

        for update in proposed {
            let target = update.target();
            let Some(slow_id) = self.slow.get(target) else {
                updates.push(update);
                continue;
            };

            if !sync {
                fast_updates.push(update);
                continue;
            }

            match positions.get(&target) {
                Some(&i) => {
                    let (_, _, fast) = &mut candidates[i];
                    *fast = update.resolve(fast)?;
                }
                None => {
                    let fast = update.resolve(store.get(target)?)?;
                    positions.insert(target, candidates.len());
                    candidates.push((target, slow_id, fast));
                }
            }
        }

        let mut slow_updates = Vec::with_capacity(candidates.len());
        for (target, slow_id, fast) in candidates {
            let slow = self.interpolate(store.get(slow_id)?, &fast)?;

            fast_updates.push(Update::assign(target, slow.clone()));
            slow_updates.push(Update::assign(slow_id, slow));
        }

        if sync {
            debug!(
                iterations = iterations,
                synced = slow_updates.len();
                "synchronizing slow weights"
            );
        }

        updates.extend(fast_updates);
        updates.extend(slow_updates);
        Ok(updates)
    }

    fn iterations(&self) -> u64 {
        self.optimizer.iterations()
    }

    fn learning_rate(&self) -> f32 {
        self.optimizer.learning_rate()
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.optimizer.set_learning_rate(learning_rate);
    }

    fn spec(&self) -> OptimizerSpec {
        OptimizerSpec::Lookahead(self.to_config())
    }

    fn state(&self, store: &VarStore) -> Result<OptimizerState> {
        Ok(OptimizerState::Lookahead {
            slow: self.slow.records(store)?,
            inner: Box::new(self.optimizer.state(store)?),
        })
    }

    fn load_state(&mut self, store: &mut VarStore, state: OptimizerState) -> Result<()> {
        let OptimizerState::Lookahead { slow, inner } = state else {
            return Err(state.mismatch("lookahead"));
        };

        self.slow.load(store, slow)?;
        self.optimizer.load_state(store, *inner)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use super::*;
    use crate::optimization::{Adam, GradientDescent};

    fn tensor(values: &[f32]) -> Tensor {
        arr1(values).into_dyn()
    }

    /// Proposes the same update kind every step, bumping its own counter like any optimizer.
    #[derive(Debug)]
    struct Fixed {
        kind: fn(VarId) -> Update,
        iterations: u64,
        learning_rate: f32,
    }

    impl Fixed {
        fn new(kind: fn(VarId) -> Update) -> Self {
            Self {
                kind,
                iterations: 0,
                learning_rate: 1.,
            }
        }
    }

    impl Optimizer for Fixed {
        fn compute_updates(
            &mut self,
            _store: &mut VarStore,
            _grads: &Gradients,
            params: &[VarId],
        ) -> Result<Vec<Update>> {
            self.iterations += 1;
            Ok(params.iter().map(|&id| (self.kind)(id)).collect())
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

        fn load_state(&mut self, _store: &mut VarStore, _state: OptimizerState) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sync_condition() {
        let syncs: Vec<u64> = (0..12).filter(|&it| is_sync_step(it, 4)).collect();
        assert_eq!(syncs, vec![3, 7, 11]);
        assert!((0..5).all(|it| is_sync_step(it, 1)));
    }

    #[test]
    fn test_zero_sync_period_is_rejected() {
        let err = Lookahead::new(GradientDescent::new(0.1), 0, 0.5).unwrap_err();
        assert!(matches!(err, LookaheadErr::InvalidConfig(_)));
    }

    #[test]
    fn test_out_of_range_slow_step_is_accepted() {
        let lookahead = Lookahead::new(GradientDescent::new(0.1), 3, 1.5).unwrap();
        assert_eq!(lookahead.slow_step(), 1.5);
    }

    #[test]
    fn test_every_update_kind_is_interpolated() {
        let kinds: [fn(VarId) -> Update; 3] = [
            |id| Update::assign(id, tensor(&[3.])),
            |id| Update::increment(id, tensor(&[2.])),
            |id| Update::decrement(id, tensor(&[-2.])),
        ];

        for kind in kinds {
            let mut store = VarStore::new();
            let w = store.param(tensor(&[1.]));
            let mut lookahead = Lookahead::new(Fixed::new(kind), 1, 0.5).unwrap();

            let updates = lookahead
                .compute_updates(&mut store, &Gradients::new(), &[w])
                .unwrap();
            let slow = lookahead.slow_weight(w).unwrap();

            // fast candidate is 3 and the slow weight starts at 1
            assert_eq!(
                updates,
                vec![
                    Update::assign(w, tensor(&[2.])),
                    Update::assign(slow, tensor(&[2.])),
                ]
            );
        }
    }

    #[test]
    fn test_non_sync_steps_pass_updates_through() {
        let mut store = VarStore::new();
        let w = store.param(tensor(&[1.]));
        let grads = Gradients::from_iter([(w, tensor(&[1.]))]);
        let mut lookahead = Lookahead::new(GradientDescent::new(0.1), 3, 0.5).unwrap();

        for _ in 0..2 {
            let updates = lookahead.compute_updates(&mut store, &grads, &[w]).unwrap();
            let slow = lookahead.slow_weight(w).unwrap();

            assert_eq!(updates.len(), 1);
            assert!(matches!(&updates[0], Update::Decrement { target, .. } if *target == w));
            store.apply(updates).unwrap();
            assert_eq!(store.get(slow).unwrap(), &tensor(&[1.]));
        }

        assert!(lookahead.is_sync_step());
    }

    #[test]
    fn test_slot_updates_pass_through_on_sync() {
        let mut store = VarStore::new();
        let w = store.param(tensor(&[1., 1.]));
        let grads = Gradients::from_iter([(w, tensor(&[1., 1.]))]);
        let mut lookahead = Lookahead::new(Adam::new(0.1, 0.9, 0.999, 1e-7), 1, 0.5).unwrap();

        let updates = lookahead.compute_updates(&mut store, &grads, &[w]).unwrap();
        let slow = lookahead.slow_weight(w).unwrap();

        // m and v go first untouched, then the rewritten fast weight and the slow weight
        assert_eq!(updates.len(), 4);
        assert!(updates[..2].iter().all(|u| u.target() != w && u.target() != slow));
        assert!(matches!(&updates[2], Update::Assign { target, .. } if *target == w));
        assert!(matches!(&updates[3], Update::Assign { target, .. } if *target == slow));
    }

    #[test]
    fn test_untracked_targets_pass_through() {
        let mut store = VarStore::new();
        let w = store.param(tensor(&[1.]));
        let other = store.param(tensor(&[5.]));

        let kind: fn(VarId) -> Update = |id| Update::increment(id, tensor(&[1.]));
        let mut lookahead = Lookahead::new(Fixed::new(kind), 1, 0.5).unwrap();

        // `other` isn't part of `params`, so the wrapper never tracks it
        let mut updates = lookahead
            .compute_updates(&mut store, &Gradients::new(), &[w])
            .unwrap();
        updates.push(Update::increment(other, tensor(&[1.])));
        store.apply(updates).unwrap();

        assert_eq!(lookahead.tracked(), 1);
        assert!(lookahead.slow_weight(other).is_none());
        assert_eq!(store.get(other).unwrap(), &tensor(&[6.]));
        assert_eq!(store.get(w).unwrap(), &tensor(&[1.5]));
    }

    #[test]
    fn test_repeated_params_fold_into_one_candidate() {
        let mut store = VarStore::new();
        let w = store.param(tensor(&[1.]));
        let kind: fn(VarId) -> Update = |id| Update::increment(id, tensor(&[1.]));
        let mut lookahead = Lookahead::new(Fixed::new(kind), 1, 0.5).unwrap();

        let updates = lookahead
            .compute_updates(&mut store, &Gradients::new(), &[w, w])
            .unwrap();
        let slow = lookahead.slow_weight(w).unwrap();

        // both increments land on the fast candidate, 1 + 1 + 1
        assert_eq!(lookahead.tracked(), 1);
        assert_eq!(
            updates,
            vec![
                Update::assign(w, tensor(&[2.])),
                Update::assign(slow, tensor(&[2.])),
            ]
        );
    }

    #[test]
    fn test_repeated_params_keep_every_step() {
        let mut store = VarStore::new();
        let w = store.param(tensor(&[1.]));
        let grads = Gradients::from_iter([(w, tensor(&[1.]))]);
        let mut lookahead = Lookahead::new(GradientDescent::new(0.1), 2, 0.5).unwrap();

        lookahead.apply_gradients(&mut store, &grads, &[w, w]).unwrap();
        let slow = lookahead.slow_weight(w).unwrap();
        assert!((store.get(w).unwrap().sum() - 0.8).abs() < 1e-6);
        assert_eq!(store.get(slow).unwrap(), &tensor(&[1.]));

        // the fast candidate is 0.6, halfway back to the slow weight is 0.8
        lookahead.apply_gradients(&mut store, &grads, &[w, w]).unwrap();
        assert!((store.get(w).unwrap().sum() - 0.8).abs() < 1e-6);
        assert_eq!(store.get(w).unwrap(), store.get(slow).unwrap());
    }

    #[test]
    fn test_learning_rate_passthrough() {
        let mut lookahead = Lookahead::with_defaults(GradientDescent::new(0.1));
        assert_eq!(lookahead.learning_rate(), 0.1);

        lookahead.set_learning_rate(0.25);
        assert_eq!(lookahead.inner().learning_rate(), 0.25);
        assert_eq!(lookahead.into_inner().learning_rate(), 0.25);
    }

    #[test]
    fn test_iterations_belong_to_the_inner_optimizer() {
        let mut store = VarStore::new();
        let w = store.param(tensor(&[1.]));
        let grads = Gradients::from_iter([(w, tensor(&[1.]))]);
        let mut lookahead = Lookahead::new(GradientDescent::new(0.1), 2, 0.5).unwrap();

        for _ in 0..3 {
            lookahead.apply_gradients(&mut store, &grads, &[w]).unwrap();
        }

        assert_eq!(lookahead.iterations(), 3);
        assert_eq!(lookahead.inner().iterations(), 3);
    }

    #[test]
    fn test_config_round_trip() {
        let lookahead = Lookahead::new(Adam::new(0.01, 0.8, 0.99, 1e-8), 7, 0.3).unwrap();
        let config = lookahead.to_config();
        let rebuilt = Lookahead::from_config(config.clone()).unwrap();

        assert_eq!(rebuilt.sync_period(), 7);
        assert_eq!(rebuilt.slow_step(), 0.3);
        assert_eq!(rebuilt.inner().spec(), lookahead.inner().spec());
        assert_eq!(rebuilt.to_config(), config);
    }

    #[test]
    fn test_from_config_rejects_zero_sync_period() {
        let mut config = LookaheadConfig::new(OptimizerSpec::from_name("sgd").unwrap());
        config.sync_period = 0;

        assert!(matches!(
            Lookahead::from_config(config),
            Err(LookaheadErr::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_name() {
        let lookahead = Lookahead::from_name("adam", 10, 0.5).unwrap();
        assert_eq!(lookahead.inner().spec().name(), "adam");
        assert!(Lookahead::from_name("adagrad", 10, 0.5).is_err());
    }
}
