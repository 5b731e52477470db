use std::{io, sync::Arc};

use log::info;
use tokio::sync::watch;

use super::{
    pipeline::{ComputePool, Reconstructor},
    router::AppState,
};
use crate::{
    admission::{self, AdmissionController, CostTable, ResourceGauge, SystemGauge},
    config::ServerConfig,
    storage::{ModelHandle, ModelStore},
};

/// Wires the service's state from a configuration.
///
/// Every collaborator can be replaced before building, otherwise it's created from the
/// configuration.
pub struct ServiceBuilder {
    config: ServerConfig,
    store: Option<ModelStore>,
    gauge: Option<Arc<dyn ResourceGauge>>,
    costs: Option<CostTable>,
    cpu: Option<watch::Receiver<f32>>,
}

impl ServiceBuilder {
    /// Creates a new `ServiceBuilder`.
    ///
    /// # Arguments
    /// * `config` - The server's configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            store: None,
            gauge: None,
            costs: None,
            cpu: None,
        }
    }

    /// Uses `store` instead of one reading the configured directories.
    pub fn store(mut self, store: ModelStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses `gauge` instead of the host's resource usage.
    pub fn gauge(mut self, gauge: Arc<dyn ResourceGauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }

    /// Uses fixed algorithm costs, skipping the calibration.
    pub fn costs(mut self, costs: CostTable) -> Self {
        self.costs = Some(costs);
        self
    }

    /// Feeds the admission control from `cpu` instead of sampling the gauge.
    pub fn cpu_samples(mut self, cpu: watch::Receiver<f32>) -> Self {
        self.cpu = Some(cpu);
        self
    }

    /// Builds the state, preloading the configured models and calibrating the costs.
    ///
    /// Must be called from a multi threaded runtime.
    ///
    /// # Returns
    /// The shared state or an io error if the compute pool can't be created.
    pub async fn build(self) -> io::Result<AppState> {
        let Self {
            config,
            store,
            gauge,
            costs,
            cpu,
        } = self;

        let store = store.unwrap_or_else(|| {
            ModelStore::new(&config.model_dir, Some(config.cache_dir.clone()))
        });
        let models = ModelHandle::new(store);

        let loaded = models.preload(&config.models).await;
        info!("preloaded {loaded} of {} models", config.models.len());

        let gauge: Arc<dyn ResourceGauge> = match gauge {
            Some(gauge) => gauge,
            None => Arc::new(SystemGauge::new()),
        };
        let pool = Arc::new(ComputePool::new(config.compute_threads).map_err(io::Error::other)?);
        info!("compute pool running {} threads", pool.threads());

        let costs = match costs {
            Some(costs) => costs,
            None => {
                let largest = models.largest();
                if let Some((id, _)) = &largest {
                    info!("calibrating against {id}");
                }

                let gauge = Arc::clone(&gauge);
                pool.run(move || {
                    admission::calibrate(largest.as_ref().map(|(_, model)| &**model), &*gauge)
                })
                .await
                .map_err(io::Error::other)?
            }
        };

        let admission = match cpu {
            Some(cpu) => AdmissionController::new(costs, config.cpu_cap, cpu),
            None => AdmissionController::with_sampler(
                Arc::clone(&gauge),
                config.sample_interval,
                costs,
                config.cpu_cap,
            ),
        };

        Ok(AppState {
            models,
            admission: Arc::new(admission),
            pool,
            gauge,
            reconstructor: Reconstructor::new(),
        })
    }
}
