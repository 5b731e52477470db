use std::collections::HashMap;

use log::{info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use solver::{Algorithm, ForwardModel, Stats};

use super::ResourceGauge;

/// The estimated CPU percentage of an algorithm that was never measured.
pub const DEFAULT_COST: f32 = 20.;

const CALIBRATION_SEED: u64 = 0x5eed;

/// Estimated marginal CPU percentage of running each algorithm, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CostTable {
    costs: HashMap<Algorithm, f32>,
}

impl Default for CostTable {
    fn default() -> Self {
        Self::uniform(DEFAULT_COST)
    }
}

impl CostTable {
    /// Creates a `CostTable` assigning the same cost to every algorithm.
    pub fn uniform(cost: f32) -> Self {
        Self::with_costs(Algorithm::ALL.map(|algorithm| (algorithm, cost)))
    }

    /// Creates a `CostTable` from known costs, missing algorithms use `DEFAULT_COST`.
    ///
    /// # Arguments
    /// * `costs` - Pairs of algorithm and estimated CPU percentage.
    pub fn with_costs<I>(costs: I) -> Self
    where
        I: IntoIterator<Item = (Algorithm, f32)>,
    {
        Self {
            costs: costs.into_iter().collect(),
        }
    }

    /// The estimated CPU percentage of running `algorithm`.
    pub fn cost(&self, algorithm: Algorithm) -> f32 {
        self.costs.get(&algorithm).copied().unwrap_or(DEFAULT_COST)
    }
}

/// Measures the cost of each algorithm by running it once.
///
/// Every algorithm is solved against `model` with a seeded synthetic signal and the CPU
/// gauge is read right after. Without a model, or if a run fails, the default cost is
/// used instead.
///
/// # Arguments
/// * `model` - A representative model, usually the largest one loaded.
/// * `gauge` - The CPU measurement source.
///
/// # Returns
/// The calibrated cost table.
pub fn calibrate(model: Option<&ForwardModel>, gauge: &dyn ResourceGauge) -> CostTable {
    let Some(model) = model else {
        warn!("no model loaded, every algorithm costs {DEFAULT_COST}%");
        return CostTable::default();
    };

    let signal = synthetic_signal(model.rows());
    let mut costs = Vec::with_capacity(Algorithm::ALL.len());

    for algorithm in Algorithm::ALL {
        let cost = match algorithm.solve(model, signal.view()) {
            Ok(_) => gauge.cpu_percent(),
            Err(e) => {
                warn!("calibration of {algorithm} failed: {e}");
                DEFAULT_COST
            }
        };

        let cost = if cost.is_finite() && cost >= 0. {
            cost
        } else {
            DEFAULT_COST
        };

        info!("calibrated {algorithm}: {cost:.1}% cpu");
        costs.push((algorithm, cost));
    }

    CostTable::with_costs(costs)
}

fn synthetic_signal(len: usize) -> ndarray::Array1<f32> {
    let mut rng = StdRng::seed_from_u64(CALIBRATION_SEED);
    let mut samples: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();

    Stats::of(&samples).normalize(&mut samples);
    samples.into()
}
