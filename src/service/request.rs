use axum::http::{HeaderMap, HeaderValue};
use solver::Algorithm;

use super::error::{Result, ServiceErr};
use crate::admission::ResourceId;

pub const MODEL_HEADER: &str = "x-modelo";
pub const ALGORITHM_HEADER: &str = "x-alg";
pub const ALGORITHM_FALLBACK_HEADER: &str = "x-algoritmo";
pub const LENGTH_HEADER: &str = "x-tamanho";
pub const GAIN_HEADER: &str = "x-ganho";

/// The metadata of a reconstruction request, read from its headers.
#[derive(Debug, Clone)]
pub struct ReconstructRequest {
    pub model: String,
    pub algorithm: Algorithm,
    pub declared_len: Option<usize>,
    pub gain: Option<HeaderValue>,
}

impl ReconstructRequest {
    /// Reads and validates the request headers.
    ///
    /// # Arguments
    /// * `headers` - The request's headers.
    ///
    /// # Returns
    /// The request metadata or a validation error naming the offending header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let model = text(headers, MODEL_HEADER)?
            .ok_or_else(|| missing(MODEL_HEADER))?
            .to_string();

        let algorithm: Algorithm = match text(headers, ALGORITHM_HEADER)? {
            Some(name) => Some(name),
            None => text(headers, ALGORITHM_FALLBACK_HEADER)?,
        }
        .ok_or_else(|| missing(ALGORITHM_HEADER))?
        .parse()?;

        let declared_len = text(headers, LENGTH_HEADER)?
            .map(|len| {
                len.parse::<usize>().map_err(|_| {
                    ServiceErr::Validation(format!("{LENGTH_HEADER} must be a length, got '{len}'"))
                })
            })
            .transpose()?;

        Ok(Self {
            model,
            algorithm,
            declared_len,
            gain: headers.get(GAIN_HEADER).cloned(),
        })
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.model.clone(), self.algorithm)
    }
}

/// A header's trimmed value, blank values count as missing.
fn text<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| ServiceErr::Validation(format!("{name} must be visible ascii")))?
        .trim();

    Ok((!value.is_empty()).then_some(value))
}

fn missing(name: &str) -> ServiceErr {
    ServiceErr::Validation(format!("missing the {name} header"))
}
