use std::{
    error::Error,
    fmt::{self, Display},
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use codec::{DecodeErr, EncodeErr};
use log::{debug, error};
use solver::SolverErr;

use crate::storage::StoreErr;

/// The service module's result type.
pub type Result<T> = std::result::Result<T, ServiceErr>;

/// A failed request, classified by who is to blame.
#[derive(Debug)]
pub enum ServiceErr {
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl ServiceErr {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceErr::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceErr::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceErr::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ServiceErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErr::Validation(msg) => write!(f, "invalid request: {msg}"),
            ServiceErr::NotFound(msg) => write!(f, "not found: {msg}"),
            ServiceErr::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl Error for ServiceErr {}

impl IntoResponse for ServiceErr {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ServiceErr::Internal(_) => error!("{self}"),
            _ => debug!("{self}"),
        }

        (status, self.to_string()).into_response()
    }
}

impl From<StoreErr> for ServiceErr {
    fn from(value: StoreErr) -> Self {
        match value {
            StoreErr::NotFound(_) => Self::NotFound(value.to_string()),
            _ => Self::Internal(value.to_string()),
        }
    }
}

impl From<DecodeErr> for ServiceErr {
    fn from(value: DecodeErr) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<EncodeErr> for ServiceErr {
    fn from(value: EncodeErr) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<SolverErr> for ServiceErr {
    fn from(value: SolverErr) -> Self {
        match value {
            SolverErr::SizeMismatch { .. } | SolverErr::UnknownAlgorithm(_) => {
                Self::Validation(value.to_string())
            }
            _ => Self::Internal(value.to_string()),
        }
    }
}
