pub mod algorithm;
mod cgne;
mod cgnr;
pub mod error;
pub mod linalg;
pub mod model;
pub mod stats;
mod test;

pub use algorithm::{Algorithm, Solution, Solver, SolverConfig};
pub use cgne::Cgne;
pub use cgnr::Cgnr;
pub use error::{Result, SolverErr};
pub use model::ForwardModel;
pub use stats::Stats;
