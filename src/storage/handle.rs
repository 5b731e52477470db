use std::{ops::Deref, sync::Arc};

use solver::ForwardModel;
use tokio::task;

use super::{ModelStore, Result};

/// The async interface to a shared `ModelStore`.
///
/// It bridges the async runtime with the blocking loads of the `ModelStore`, so it must be
/// used from a multi threaded runtime.
#[derive(Debug, Clone)]
pub struct ModelHandle(Arc<ModelStore>);

impl Deref for ModelHandle {
    type Target = ModelStore;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ModelHandle {
    /// Creates a new `ModelHandle`.
    ///
    /// # Arguments
    /// * `store` - The underlying model store.
    pub fn new(store: ModelStore) -> Self {
        Self(Arc::new(store))
    }

    /// Async call to the synchronous implementation of `ModelStore::get`.
    ///
    /// # Arguments
    /// * `id` - The model's file name.
    pub async fn get(&self, id: &str) -> Result<Arc<ForwardModel>> {
        task::block_in_place(|| self.0.get(id))
    }

    /// Async call to the synchronous implementation of `ModelStore::preload`.
    ///
    /// # Arguments
    /// * `ids` - The models to load.
    pub async fn preload<S: AsRef<str>>(&self, ids: &[S]) -> usize {
        task::block_in_place(|| self.0.preload(ids))
    }
}
