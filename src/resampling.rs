// Bootstrap and jackknife resampling of observation rows

use ndarray::{Array2, ArrayView2, Axis};
use rand::Rng;

/// Source of bootstrap samples for the alignment loop.
///
/// The production implementation is [`UniformRowSampler`]; tests substitute
/// fixed samples to pin down a draw.
pub trait RowSampler {
    /// Returns a new matrix with as many rows as `observations`.
    fn draw(&mut self, observations: ArrayView2<f64>) -> Array2<f64>;
}

/// Draws rows uniformly with replacement from an owned random generator.
#[derive(Debug, Clone)]
pub struct UniformRowSampler<R: Rng> {
    rng: R,
}

impl<R: Rng> UniformRowSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: Rng> RowSampler for UniformRowSampler<R> {
    fn draw(&mut self, observations: ArrayView2<f64>) -> Array2<f64> {
        bootstrap_sample(&mut self.rng, observations)
    }
}

/// Draws `observations.nrows()` row indices uniformly from `[0, nrows)` with
/// replacement and returns the selected rows in draw order.
pub fn bootstrap_sample<R: Rng + ?Sized>(rng: &mut R, observations: ArrayView2<f64>) -> Array2<f64> {
    let n_rows = observations.nrows();
    if n_rows == 0 {
        return observations.to_owned();
    }
    let indices: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
    observations.select(Axis(0), &indices)
}

/// Returns the `n` leave-one-out samples of an `n`-row matrix.
/// Sample `i` omits row `i` and keeps the remaining rows in order.
pub fn jackknife_samples(observations: ArrayView2<f64>) -> Vec<Array2<f64>> {
    let n_rows = observations.nrows();
    (0..n_rows)
        .map(|omitted| {
            let kept: Vec<usize> = (0..n_rows).filter(|&row| row != omitted).collect();
            observations.select(Axis(0), &kept)
        })
        .collect()
}
