use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use solver::SolverErr;

/// The storage module's result type.
pub type Result<T> = std::result::Result<T, StoreErr>;

/// The errors that can happen while resolving a model.
#[derive(Debug)]
pub enum StoreErr {
    NotFound(String),
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Parse {
        line: usize,
        col: usize,
        value: String,
    },
    Ragged {
        line: usize,
        got: usize,
        expected: usize,
    },
    Corrupt {
        path: PathBuf,
        reason: &'static str,
    },
    Model(SolverErr),
}

impl StoreErr {
    pub(super) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for StoreErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErr::NotFound(id) => write!(f, "model '{id}' not found"),
            StoreErr::Io { path, source } => {
                write!(f, "io error on {}: {source}", path.display())
            }
            StoreErr::Parse { line, col, value } => write!(
                f,
                "invalid number '{value}' at line {line}, column {col}"
            ),
            StoreErr::Ragged {
                line,
                got,
                expected,
            } => write!(
                f,
                "line {line} has {got} values, expected {expected} like the first row"
            ),
            StoreErr::Corrupt { path, reason } => {
                write!(f, "corrupt model cache {}: {reason}", path.display())
            }
            StoreErr::Model(e) => write!(f, "invalid model: {e}"),
        }
    }
}

impl Error for StoreErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreErr::Io { source, .. } => Some(source),
            StoreErr::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SolverErr> for StoreErr {
    fn from(value: SolverErr) -> Self {
        Self::Model(value)
    }
}
