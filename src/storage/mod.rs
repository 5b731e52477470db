mod error;
mod handle;
pub mod persist;
mod store;

pub use error::{Result, StoreErr};
pub use handle::ModelHandle;
pub use store::ModelStore;
