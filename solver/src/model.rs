use ndarray::prelude::*;

use crate::{
    error::{Result, SolverErr},
    linalg,
    stats::Stats,
};

/// A forward model `H` ready to be solved against.
///
/// Holds the z-score normalized matrix, a contiguous copy of its transpose and the
/// statistics of the raw values. It's never mutated after construction, so it can be
/// shared between any amount of concurrent solves.
#[derive(Debug)]
pub struct ForwardModel {
    h: Array2<f32>,
    ht: Array2<f32>,
    stats: Stats,
    operator_norm: f64,
}

impl ForwardModel {
    /// Creates a new `ForwardModel` from the raw matrix, normalizing it in place.
    ///
    /// This is expensive, besides the normalization and the transposition the operator
    /// norm of `HᵗH` is estimated here once, so it never has to be computed again.
    ///
    /// # Arguments
    /// * `raw` - The raw forward model matrix of shape `(m, n)`.
    ///
    /// # Returns
    /// A new `ForwardModel` or an error if the matrix is empty or has non finite values.
    pub fn new(mut raw: Array2<f32>) -> Result<Self> {
        let (rows, cols) = raw.dim();
        if rows == 0 || cols == 0 {
            return Err(SolverErr::EmptyModel { rows, cols });
        }

        if let Some(((row, col), _)) = raw.indexed_iter().find(|(_, x)| !x.is_finite()) {
            return Err(SolverErr::NonFiniteModel { row, col });
        }

        let stats = Stats::of(raw.iter());
        raw.par_mapv_inplace(|x| stats.zscore(x));

        let h = if raw.is_standard_layout() {
            raw
        } else {
            raw.as_standard_layout().into_owned()
        };
        let ht = h.t().as_standard_layout().into_owned();
        let operator_norm = linalg::operator_norm(h.view(), ht.view());

        Ok(Self {
            h,
            ht,
            stats,
            operator_norm,
        })
    }

    /// The amount of rows of `H`, that is, the expected signal length.
    pub fn rows(&self) -> usize {
        self.h.nrows()
    }

    /// The amount of columns of `H`, that is, the length of the solution.
    pub fn cols(&self) -> usize {
        self.h.ncols()
    }

    /// The statistics of the raw matrix.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Diagnostic estimate of the operator 2-norm of `HᵗH` for the normalized matrix.
    ///
    /// Only reported, the solvers don't use it.
    pub fn operator_norm(&self) -> f64 {
        self.operator_norm
    }

    /// A view of the normalized matrix.
    pub fn h(&self) -> ArrayView2<'_, f32> {
        self.h.view()
    }

    /// A view of the transpose of the normalized matrix.
    pub fn ht(&self) -> ArrayView2<'_, f32> {
        self.ht.view()
    }

    /// Computes `out = H · x`.
    ///
    /// # Arguments
    /// * `x` - A vector of length `cols`.
    /// * `out` - Where to write the result, of length `rows`.
    pub fn apply(&self, x: ArrayView1<f32>, out: ArrayViewMut1<f32>) {
        linalg::mat_vec(self.h.view(), x, out);
    }

    /// Computes `out = Hᵗ · r`.
    ///
    /// # Arguments
    /// * `r` - A vector of length `rows`.
    /// * `out` - Where to write the result, of length `cols`.
    pub fn apply_transpose(&self, r: ArrayView1<f32>, out: ArrayViewMut1<f32>) {
        linalg::mat_vec(self.ht.view(), r, out);
    }

    /// Brings a solution computed against the normalized pair back to the signal's scale.
    ///
    /// The solution is multiplied by `signal_std / h_std` unless the model's standard
    /// deviation is degenerate, in which case it's left untouched.
    ///
    /// # Arguments
    /// * `solution` - The solution to rescale in place.
    /// * `signal` - The statistics of the raw signal.
    pub fn rescale(&self, solution: &mut [f32], signal: Stats) {
        if self.stats.is_degenerate() {
            return;
        }

        let factor = signal.std() / self.stats.std();
        solution
            .iter_mut()
            .for_each(|x| *x = (*x as f64 * factor) as f32);
    }
}
