use std::{
    fmt::{self, Display},
    str::FromStr,
};

use ndarray::prelude::*;

use crate::{
    Cgne, Cgnr,
    error::{Result, SolverErr},
    model::ForwardModel,
};

/// The default upper bound of iterations, a latency bound rather than an accuracy one.
pub const MAX_ITERATIONS: usize = 10;

/// The default tolerance of both stopping criteria.
pub const TOLERANCE: f64 = 1e-4;

/// Search directions with a squared norm below this value end the iteration.
pub(crate) const DIRECTION_EPSILON: f64 = 1e-15;

/// Conjugation denominators below this value end the iteration.
pub(crate) const RESIDUAL_EPSILON: f64 = 1e-20;

/// Bounds of an iterative solve.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            tolerance: TOLERANCE,
        }
    }
}

impl SolverConfig {
    /// Checks both stopping criteria.
    ///
    /// # Arguments
    /// * `prev_norm` - The residual norm before this iteration's update.
    /// * `norm` - The residual norm after this iteration's update.
    ///
    /// # Returns
    /// Whether the residual is small enough or stopped changing.
    pub(crate) fn converged(&self, prev_norm: f64, norm: f64) -> bool {
        norm < self.tolerance || (norm - prev_norm).abs() < self.tolerance
    }
}

/// The outcome of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    values: Array1<f32>,
    iterations: usize,
}

impl Solution {
    /// Creates a new `Solution`, checking that every value is finite.
    ///
    /// # Arguments
    /// * `values` - The solution vector.
    /// * `iterations` - The amount of updates applied to the solution.
    pub(crate) fn new(values: Array1<f32>, iterations: usize) -> Result<Self> {
        if values.iter().any(|x| !x.is_finite()) {
            return Err(SolverErr::NonFiniteSolution { iterations });
        }

        Ok(Self { values, iterations })
    }

    pub fn values(&self) -> &[f32] {
        // Owned one dimensional arrays are always contiguous.
        self.values.as_slice().unwrap_or_default()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values.into_raw_vec_and_offset().0
    }
}

/// Solves the normal equations of `H · f = g` for a normalized forward model.
pub trait Solver {
    /// Runs the iterative method until convergence or the iteration cap.
    ///
    /// # Arguments
    /// * `model` - The normalized forward model.
    /// * `g` - The normalized signal, of length `model.rows()`.
    ///
    /// # Returns
    /// The best iterate found, of length `model.cols()`, or an error if the signal's length
    /// doesn't match the model or the iterate stopped being finite.
    fn solve(&self, model: &ForwardModel, g: ArrayView1<f32>) -> Result<Solution>;
}

/// Checks that `g` can be solved against `model`.
pub(crate) fn check_signal(model: &ForwardModel, g: ArrayView1<f32>) -> Result<()> {
    if g.len() != model.rows() {
        return Err(SolverErr::SizeMismatch {
            what: "signal",
            got: g.len(),
            expected: model.rows(),
        });
    }

    Ok(())
}

/// The available reconstruction algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Cgne,
    Cgnr,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Cgne, Algorithm::Cgnr];

    /// The canonical name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Cgne => "CGNE",
            Algorithm::Cgnr => "CGNR",
        }
    }

    /// Solves with the default bounds.
    ///
    /// # Arguments
    /// * `model` - The normalized forward model.
    /// * `g` - The normalized signal.
    pub fn solve(self, model: &ForwardModel, g: ArrayView1<f32>) -> Result<Solution> {
        self.solve_with(SolverConfig::default(), model, g)
    }

    /// Solves with custom bounds.
    ///
    /// # Arguments
    /// * `config` - The bounds of the solve.
    /// * `model` - The normalized forward model.
    /// * `g` - The normalized signal.
    pub fn solve_with(
        self,
        config: SolverConfig,
        model: &ForwardModel,
        g: ArrayView1<f32>,
    ) -> Result<Solution> {
        match self {
            Algorithm::Cgne => Cgne::new(config).solve(model, g),
            Algorithm::Cgnr => Cgnr::new(config).solve(model, g),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = SolverErr;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("cgne") {
            Ok(Algorithm::Cgne)
        } else if s.eq_ignore_ascii_case("cgnr") {
            Ok(Algorithm::Cgnr)
        } else {
            Err(SolverErr::UnknownAlgorithm(s.to_string()))
        }
    }
}
