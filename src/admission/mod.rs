mod calibration;
mod controller;
mod gauge;
mod registry;
mod sampler;

pub use calibration::{CostTable, DEFAULT_COST, calibrate};
pub use controller::{AdmissionController, AdmissionPermit, CAP_TOLERANCE, Snapshot};
pub use gauge::{ResourceGauge, StaticGauge, SystemGauge};
pub use registry::{LockRegistry, ResourceId};
pub use sampler::spawn_sampler;
