mod builder;
mod error;
mod pipeline;
pub mod request;
pub mod response;
mod router;

pub use builder::ServiceBuilder;
pub use error::{Result, ServiceErr};
pub use pipeline::{ComputePool, Reconstruction, Reconstructor};
pub use request::ReconstructRequest;
pub use response::{Metrics, ResponseBuilder};
pub use router::{AppState, MAX_BODY_SIZE, create_router};
