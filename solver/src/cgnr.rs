use log::debug;
use ndarray::prelude::*;

use crate::{
    algorithm::{self, DIRECTION_EPSILON, RESIDUAL_EPSILON, Solution, Solver, SolverConfig},
    error::Result,
    linalg,
    model::ForwardModel,
};

/// Conjugate gradient on the normal equations of the first kind, minimizes the residual
/// iterating over `z = Hᵗr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cgnr {
    config: SolverConfig,
}

impl Cgnr {
    /// Creates a new `Cgnr` solver.
    ///
    /// # Arguments
    /// * `config` - The bounds of the solve.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl Solver for Cgnr {
    fn solve(&self, model: &ForwardModel, g: ArrayView1<f32>) -> Result<Solution> {
        algorithm::check_signal(model, g)?;

        let (m, n) = (model.rows(), model.cols());
        let mut f = Array1::zeros(n);

        // r = g - H·f, with f starting at zero
        let mut r = g.to_owned();
        let mut z = Array1::zeros(n);
        model.apply_transpose(r.view(), z.view_mut());
        let mut p = z.clone();
        let mut w = Array1::zeros(m);

        let mut r_norm = linalg::norm(r.view());
        let mut z_norm_sq = linalg::norm_sq(z.view());
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            model.apply(p.view(), w.view_mut());

            let w_norm_sq = linalg::norm_sq(w.view());
            if w_norm_sq < DIRECTION_EPSILON {
                debug!(iterations = iterations; "cgnr: degenerate search direction");
                break;
            }

            let alpha = z_norm_sq / w_norm_sq;
            linalg::axpy(alpha, p.view(), f.view_mut());
            linalg::axpy(-alpha, w.view(), r.view_mut());
            iterations += 1;

            let r_new_norm = linalg::norm(r.view());
            if self.config.converged(r_norm, r_new_norm) {
                break;
            }

            if z_norm_sq < RESIDUAL_EPSILON {
                debug!(iterations = iterations; "cgnr: degenerate gradient");
                break;
            }

            model.apply_transpose(r.view(), z.view_mut());
            let z_new_norm_sq = linalg::norm_sq(z.view());
            let beta = z_new_norm_sq / z_norm_sq;
            linalg::conjugate(z.view(), beta, p.view_mut());

            r_norm = r_new_norm;
            z_norm_sq = z_new_norm_sq;
        }

        debug!(iterations = iterations; "cgnr finished");
        Solution::new(f, iterations)
    }
}
