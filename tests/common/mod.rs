#![allow(dead_code)]

use lookahead::{
    Optimizer,
    variables::{Gradients, VarId, VarStore},
};
use ndarray::{Array1, Array2, ArrayView2, Axis, Ix1, Ix2, s};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use rand_distr::StandardNormal;

pub const INPUTS: usize = 5;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Samples a matrix of standard normal values.
pub fn standard_normal<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_simple_fn((rows, cols), || rng.sample(StandardNormal))
}

/// Generates `len` samples of `y = x w + noise`, with a tiny amount of noise.
///
/// # Returns
/// The inputs, the targets and the true weights.
pub fn dataset<R: Rng>(
    rng: &mut R,
    len: usize,
    w: Option<Array2<f32>>,
) -> (Array2<f32>, Array2<f32>, Array2<f32>) {
    let x = standard_normal(rng, len, INPUTS);
    let w = w.unwrap_or_else(|| standard_normal(rng, INPUTS, 1));
    let y = x.dot(&w) + standard_normal(rng, len, 1) * 1e-6;
    (x, y, w)
}

/// A single dense layer without activation trained with the mean squared error.
#[derive(Debug, Clone, Copy)]
pub struct Linear {
    pub w: VarId,
    pub b: VarId,
}

impl Linear {
    /// Adds the layer's parameters to `store`, the bias starts at zero.
    pub fn new(store: &mut VarStore, w: Array2<f32>) -> Self {
        let w = store.param(w.into_dyn());
        let b = store.param(Array1::<f32>::zeros(1).into_dyn());
        Self { w, b }
    }

    pub fn params(&self) -> [VarId; 2] {
        [self.w, self.b]
    }

    pub fn weights(&self, store: &VarStore) -> Array2<f32> {
        store
            .get(self.w)
            .unwrap()
            .view()
            .into_dimensionality::<Ix2>()
            .unwrap()
            .to_owned()
    }

    pub fn bias(&self, store: &VarStore) -> Array1<f32> {
        store
            .get(self.b)
            .unwrap()
            .view()
            .into_dimensionality::<Ix1>()
            .unwrap()
            .to_owned()
    }

    pub fn predict(&self, store: &VarStore, x: ArrayView2<f32>) -> Array2<f32> {
        x.dot(&self.weights(store)) + &self.bias(store)
    }

    /// Computes the gradient of the mean squared error over a batch.
    pub fn gradients(&self, store: &VarStore, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Gradients {
        let scale = 2. / x.nrows() as f32;
        let err = self.predict(store, x) - &y;

        let dw = x.t().dot(&err) * scale;
        let db = err.sum_axis(Axis(0)) * scale;

        Gradients::from_iter([(self.w, dw.into_dyn()), (self.b, db.into_dyn())])
    }

    /// Runs one optimizer step over the `batch`-th batch of the data, batches taken in order.
    pub fn step<O: Optimizer + ?Sized>(
        &self,
        store: &mut VarStore,
        optimizer: &mut O,
        x: &Array2<f32>,
        y: &Array2<f32>,
        batch: usize,
        batch_size: usize,
    ) {
        let nbatches = x.nrows().div_ceil(batch_size);
        let start = (batch % nbatches) * batch_size;
        let end = (start + batch_size).min(x.nrows());

        let grads = self.gradients(
            store,
            x.slice(s![start..end, ..]),
            y.slice(s![start..end, ..]),
        );
        optimizer
            .apply_gradients(store, &grads, &self.params())
            .unwrap();
    }

    /// Trains for `epochs` epochs, shuffling the samples before each one.
    pub fn fit<O: Optimizer + ?Sized, R: Rng>(
        &self,
        store: &mut VarStore,
        optimizer: &mut O,
        x: &Array2<f32>,
        y: &Array2<f32>,
        epochs: usize,
        batch_size: usize,
        rng: &mut R,
    ) {
        let mut order: Vec<usize> = (0..x.nrows()).collect();

        for _ in 0..epochs {
            order.shuffle(rng);

            for batch in order.chunks(batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                let grads = self.gradients(store, xb.view(), yb.view());

                optimizer
                    .apply_gradients(store, &grads, &self.params())
                    .unwrap();
            }
        }
    }
}

/// Largest absolute difference between two arrays of the same shape.
pub fn max_abs_diff(a: &Array2<f32>, b: &Array2<f32>) -> f32 {
    (a - b).iter().fold(0., |acc, d| acc.max(d.abs()))
}
