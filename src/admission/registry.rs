use std::{
    collections::HashMap,
    fmt::{self, Display},
    sync::Arc,
};

use parking_lot::Mutex;
use solver::Algorithm;
use tokio::sync::Mutex as ResourceLock;

/// The unit of mutual exclusion, at most one solve runs per resource at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub model: String,
    pub algorithm: Algorithm,
}

impl ResourceId {
    pub fn new(model: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            model: model.into(),
            algorithm,
        }
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.algorithm)
    }
}

/// Lazily created exclusive locks, one per resource.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<ResourceId, Arc<ResourceLock<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock of `id`, created on first use.
    pub fn lock_for(&self, id: &ResourceId) -> Arc<ResourceLock<()>> {
        let mut locks = self.locks.lock();

        if let Some(lock) = locks.get(id) {
            return Arc::clone(lock);
        }

        let lock = Arc::new(ResourceLock::new(()));
        locks.insert(id.clone(), Arc::clone(&lock));
        lock
    }

    /// Forgets the lock of `id` once nobody holds or waits on it.
    pub fn prune(&self, id: &ResourceId) {
        let mut locks = self.locks.lock();

        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }

    /// The amount of resources currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
