use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
};
use log::debug;

use super::{
    error::Result,
    pipeline::{ComputePool, Reconstructor},
    request::ReconstructRequest,
    response::{self, ResponseBuilder},
};
use crate::{
    admission::{AdmissionController, ResourceGauge},
    storage::ModelHandle,
};

/// The largest accepted signal body.
pub const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Everything a request needs, shared between all of them.
#[derive(Clone)]
pub struct AppState {
    pub models: ModelHandle,
    pub admission: Arc<AdmissionController>,
    pub pool: Arc<ComputePool>,
    pub gauge: Arc<dyn ResourceGauge>,
    pub reconstructor: Reconstructor,
}

/// Creates the service's router.
///
/// # Arguments
/// * `state` - The shared state.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/reconstruct", post(reconstruct))
        .route("/interpretedServer/reconstruct", post(reconstruct))
        .route("/compiledServer/reconstruct", post(reconstruct))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

async fn ping() -> &'static str {
    "OK"
}

async fn reconstruct(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let request = ReconstructRequest::from_headers(&headers)?;
    let id = request.resource_id();
    debug!(len = body.len(); "reconstruct request for {id}");

    // Unknown models never reach the lock registry.
    let model = state.models.get(&id.model).await?;
    let permit = state.admission.acquire(id).await;

    let ReconstructRequest {
        algorithm,
        declared_len,
        gain,
        ..
    } = request;
    let builder = ResponseBuilder::start(algorithm, gain);
    let reconstructor = state.reconstructor;

    let reconstruction = state
        .pool
        .run(move || {
            let _permit = permit;
            reconstructor.reconstruct(&model, algorithm, &body, declared_len)
        })
        .await??;

    let metrics = builder.finish(
        reconstruction.iterations,
        reconstruction.image.side,
        state.admission.cpu(),
        state.gauge.mem_percent(),
    );

    Ok(response::image_response(&metrics, reconstruction.image.png))
}
