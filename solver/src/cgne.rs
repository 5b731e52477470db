use log::debug;
use ndarray::prelude::*;

use crate::{
    algorithm::{self, DIRECTION_EPSILON, RESIDUAL_EPSILON, Solution, Solver, SolverConfig},
    error::Result,
    linalg,
    model::ForwardModel,
};

/// Conjugate gradient on the normal equations of the second kind, minimizes the error
/// over the range of `Hᵗ`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cgne {
    config: SolverConfig,
}

impl Cgne {
    /// Creates a new `Cgne` solver.
    ///
    /// # Arguments
    /// * `config` - The bounds of the solve.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl Solver for Cgne {
    fn solve(&self, model: &ForwardModel, g: ArrayView1<f32>) -> Result<Solution> {
        algorithm::check_signal(model, g)?;

        let (m, n) = (model.rows(), model.cols());
        let mut f = Array1::zeros(n);
        let mut r = g.to_owned();
        let mut p = Array1::zeros(n);
        let mut hp = Array1::zeros(m);
        let mut ht_r = Array1::zeros(n);

        model.apply_transpose(r.view(), p.view_mut());
        let mut r_norm_sq = linalg::norm_sq(r.view());
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            let p_norm_sq = linalg::norm_sq(p.view());
            if p_norm_sq < DIRECTION_EPSILON {
                debug!(iterations = iterations; "cgne: degenerate search direction");
                break;
            }

            let alpha = r_norm_sq / p_norm_sq;
            linalg::axpy(alpha, p.view(), f.view_mut());
            model.apply(p.view(), hp.view_mut());
            linalg::axpy(-alpha, hp.view(), r.view_mut());
            iterations += 1;

            let r_new_norm_sq = linalg::norm_sq(r.view());
            if self
                .config
                .converged(r_norm_sq.sqrt(), r_new_norm_sq.sqrt())
            {
                break;
            }

            if r_norm_sq < RESIDUAL_EPSILON {
                debug!(iterations = iterations; "cgne: degenerate residual");
                break;
            }

            let beta = r_new_norm_sq / r_norm_sq;
            model.apply_transpose(r.view(), ht_r.view_mut());
            linalg::conjugate(ht_r.view(), beta, p.view_mut());

            r_norm_sq = r_new_norm_sq;
        }

        debug!(iterations = iterations; "cgne finished");
        Solution::new(f, iterations)
    }
}
