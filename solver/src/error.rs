use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire solver crate.
pub type Result<T> = std::result::Result<T, SolverErr>;

/// The solver crate's error type.
#[derive(Debug)]
pub enum SolverErr {
    EmptyModel {
        rows: usize,
        cols: usize,
    },
    NonFiniteModel {
        row: usize,
        col: usize,
    },
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    NonFiniteSolution {
        iterations: usize,
    },
    UnknownAlgorithm(String),
}

impl Display for SolverErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverErr::EmptyModel { rows, cols } => {
                write!(f, "the forward model must not be empty, got {rows}x{cols}")
            }
            SolverErr::NonFiniteModel { row, col } => {
                write!(f, "the forward model has a non finite value at ({row}, {col})")
            }
            SolverErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "size mismatch for {what}, got {got} and expected {expected}"
            ),
            SolverErr::NonFiniteSolution { iterations } => write!(
                f,
                "the solution became non finite after {iterations} iterations"
            ),
            SolverErr::UnknownAlgorithm(name) => {
                write!(f, "unknown algorithm '{name}', expected CGNE or CGNR")
            }
        }
    }
}

impl Error for SolverErr {}
