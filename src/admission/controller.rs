use std::{sync::Arc, time::Duration};

use log::debug;
use parking_lot::Mutex;
use tokio::sync::{Notify, OwnedMutexGuard, watch};

use super::{CostTable, LockRegistry, ResourceGauge, ResourceId, sampler};

/// The CPU cap can be exceeded by this factor before new work is held back.
pub const CAP_TOLERANCE: f32 = 1.3;

/// A point in time view of the admission counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub active: usize,
    pub waiting: usize,
}

/// Decides when a reconstruction may start.
///
/// A request first takes the exclusive lock of its resource, then waits until either
/// nothing else is running or the latest CPU sample plus the algorithm's estimated cost
/// stays under the tolerated cap. Waiters are woken by new CPU samples and by releases.
#[derive(Debug)]
pub struct AdmissionController {
    registry: LockRegistry,
    counters: Mutex<Snapshot>,
    costs: CostTable,
    cpu_cap: f32,
    cpu: watch::Receiver<f32>,
    released: Notify,
}

impl AdmissionController {
    /// Creates a new `AdmissionController` fed by an existing CPU sample channel.
    ///
    /// # Arguments
    /// * `costs` - The estimated cost of each algorithm.
    /// * `cpu_cap` - The CPU cap percentage.
    /// * `cpu` - The latest CPU samples.
    pub fn new(costs: CostTable, cpu_cap: f32, cpu: watch::Receiver<f32>) -> Self {
        Self {
            registry: LockRegistry::new(),
            counters: Mutex::new(Snapshot::default()),
            costs,
            cpu_cap,
            cpu,
            released: Notify::new(),
        }
    }

    /// Creates a new `AdmissionController` along with its CPU sampler task.
    ///
    /// The sampler stops when the controller is dropped.
    ///
    /// # Arguments
    /// * `gauge` - The CPU measurement source.
    /// * `interval` - The sampling period.
    /// * `costs` - The estimated cost of each algorithm.
    /// * `cpu_cap` - The CPU cap percentage.
    pub fn with_sampler(
        gauge: Arc<dyn ResourceGauge>,
        interval: Duration,
        costs: CostTable,
        cpu_cap: f32,
    ) -> Self {
        Self::new(costs, cpu_cap, sampler::spawn_sampler(gauge, interval))
    }

    /// The CPU percentage that running work plus a new one must stay under.
    pub fn threshold(&self) -> f32 {
        self.cpu_cap * CAP_TOLERANCE
    }

    pub fn costs(&self) -> &CostTable {
        &self.costs
    }

    pub fn snapshot(&self) -> Snapshot {
        *self.counters.lock()
    }

    /// The latest CPU sample.
    pub fn cpu(&self) -> f32 {
        *self.cpu.borrow()
    }

    /// The amount of resources with a lock currently held or awaited.
    pub fn resources(&self) -> usize {
        self.registry.len()
    }

    /// Waits until a computation on `id` may start.
    ///
    /// # Arguments
    /// * `id` - The resource the computation uses.
    ///
    /// # Returns
    /// The permit that holds the slot until dropped.
    pub async fn acquire(self: &Arc<Self>, id: ResourceId) -> AdmissionPermit {
        let mut waiting = WaitingGuard::new(self);
        let lock = self.registry.lock_for(&id).lock_owned().await;

        let cost = self.costs.cost(id.algorithm);
        let mut cpu = self.cpu.clone();
        let mut sampling = true;

        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let sample = *cpu.borrow_and_update();
            if let Some(snapshot) = self.try_admit(sample, cost) {
                waiting.disarm();
                debug!(
                    active = snapshot.active,
                    waiting = snapshot.waiting,
                    cpu = sample;
                    "admitted {id}"
                );

                return AdmissionPermit {
                    controller: Arc::clone(self),
                    id,
                    lock: Some(lock),
                };
            }

            debug!(cpu = sample, cost = cost; "holding back {id}");

            tokio::select! {
                changed = cpu.changed(), if sampling => {
                    sampling = changed.is_ok();
                }
                _ = &mut released => {}
            }
        }
    }

    /// Whether a new computation fits next to `active` running ones.
    fn admits(&self, active: usize, cpu: f32, cost: f32) -> bool {
        active == 0 || cpu + cost < self.threshold()
    }

    fn try_admit(&self, cpu: f32, cost: f32) -> Option<Snapshot> {
        let mut counters = self.counters.lock();

        if self.admits(counters.active, cpu, cost) {
            counters.active += 1;
            counters.waiting -= 1;
            return Some(*counters);
        }

        None
    }

    fn release(&self, id: &ResourceId) {
        self.registry.prune(id);
        self.counters.lock().active -= 1;
        self.released.notify_waiters();
    }
}

/// Counts a request as waiting until it's admitted or gives up.
struct WaitingGuard<'a> {
    controller: &'a AdmissionController,
    armed: bool,
}

impl<'a> WaitingGuard<'a> {
    fn new(controller: &'a AdmissionController) -> Self {
        controller.counters.lock().waiting += 1;

        Self {
            controller,
            armed: true,
        }
    }

    /// The waiting counter was already decremented by the admission.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.counters.lock().waiting -= 1;
        }
    }
}

/// An admitted computation's slot, released on drop.
#[derive(Debug)]
pub struct AdmissionPermit {
    controller: Arc<AdmissionController>,
    id: ResourceId,
    lock: Option<OwnedMutexGuard<()>>,
}

impl AdmissionPermit {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        // The guard's own reference to the lock must be gone before pruning.
        drop(self.lock.take());
        self.controller.release(&self.id);
        debug!("released {}", self.id);
    }
}
