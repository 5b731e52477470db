use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::Arc,
};

use log::{info, warn};
use ndarray::Array2;
use parking_lot::{Mutex, RwLock};
use solver::ForwardModel;

use super::{
    error::{Result, StoreErr},
    persist,
};

/// Lazily loaded, never evicted, forward models keyed by their file name.
///
/// Lookups of loaded models only take a read lock. Loads are serialized, so concurrent
/// first references to the same model parse it once.
#[derive(Debug)]
pub struct ModelStore {
    model_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    models: RwLock<HashMap<String, Arc<ForwardModel>>>,
    loading: Mutex<()>,
}

impl ModelStore {
    /// Creates a new `ModelStore`.
    ///
    /// # Arguments
    /// * `model_dir` - Where the raw `csv` models live.
    /// * `cache_dir` - Where to persist the binary form of parsed models, if anywhere.
    pub fn new(model_dir: impl Into<PathBuf>, cache_dir: Option<PathBuf>) -> Self {
        Self {
            model_dir: Some(model_dir.into()),
            cache_dir,
            models: RwLock::new(HashMap::new()),
            loading: Mutex::new(()),
        }
    }

    /// Creates a `ModelStore` that never touches the filesystem, models must be inserted.
    pub fn in_memory() -> Self {
        Self {
            model_dir: None,
            cache_dir: None,
            models: RwLock::new(HashMap::new()),
            loading: Mutex::new(()),
        }
    }

    /// Resolves a model, loading it on first reference.
    ///
    /// This blocks while the model is parsed and normalized.
    ///
    /// # Arguments
    /// * `id` - The model's file name, for example `H_30x30.csv`.
    ///
    /// # Returns
    /// The shared model or an error if it doesn't exist or can't be loaded.
    pub fn get(&self, id: &str) -> Result<Arc<ForwardModel>> {
        if let Some(model) = self.models.read().get(id) {
            return Ok(Arc::clone(model));
        }

        if !is_valid_id(id) {
            return Err(StoreErr::NotFound(id.to_string()));
        }

        let _loading = self.loading.lock();
        if let Some(model) = self.models.read().get(id) {
            return Ok(Arc::clone(model));
        }

        let raw = self.load_raw(id)?;
        self.insert(id, raw)
    }

    /// Normalizes a raw matrix and registers it under `id`.
    ///
    /// # Arguments
    /// * `id` - The model's identifier.
    /// * `raw` - The raw forward model matrix.
    ///
    /// # Returns
    /// The shared model or an error if the matrix is invalid.
    pub fn insert(&self, id: &str, raw: Array2<f32>) -> Result<Arc<ForwardModel>> {
        let model = Arc::new(ForwardModel::new(raw)?);
        let stats = model.stats();

        info!(
            rows = model.rows(),
            cols = model.cols(),
            mean = stats.mean(),
            std = stats.std(),
            operator_norm = model.operator_norm();
            "loaded model {id}"
        );

        if stats.is_degenerate() {
            warn!("model {id} has a degenerate variance, only its mean was subtracted");
        }

        self.models
            .write()
            .insert(id.to_string(), Arc::clone(&model));

        Ok(model)
    }

    /// Loads every model of `ids`, logging the ones that fail.
    ///
    /// # Arguments
    /// * `ids` - The models to load.
    ///
    /// # Returns
    /// The amount of models that were loaded.
    pub fn preload<S: AsRef<str>>(&self, ids: &[S]) -> usize {
        let mut loaded = 0;

        for id in ids {
            let id: &str = id.as_ref();

            match self.get(id) {
                Ok(_) => loaded += 1,
                Err(e) => warn!("failed to preload model {id}: {e}"),
            }
        }

        loaded
    }

    /// The loaded model with the most entries, if any.
    pub fn largest(&self) -> Option<(String, Arc<ForwardModel>)> {
        self.models
            .read()
            .iter()
            .max_by(|(a_id, a), (b_id, b)| {
                (a.rows() * a.cols())
                    .cmp(&(b.rows() * b.cols()))
                    .then_with(|| b_id.cmp(a_id))
            })
            .map(|(id, model)| (id.clone(), Arc::clone(model)))
    }

    /// The identifiers of every loaded model, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.models.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn load_raw(&self, id: &str) -> Result<Array2<f32>> {
        let Some(model_dir) = &self.model_dir else {
            return Err(StoreErr::NotFound(id.to_string()));
        };

        let bin_path = self.bin_path(id);

        if let Some(path) = &bin_path {
            match persist::read_binary(path) {
                Ok(Some(raw)) => {
                    info!("read model {id} from {}", path.display());
                    return Ok(raw);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("discarding model cache: {e}");
                    if let Err(e) = fs::remove_file(path) {
                        warn!("failed to remove {}: {e}", path.display());
                    }
                }
            }
        }

        let csv_path = model_dir.join(id);
        let text = match fs::read_to_string(&csv_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreErr::NotFound(id.to_string()));
            }
            Err(e) => return Err(StoreErr::io(csv_path, e)),
        };

        info!("parsing model {id} from {}", csv_path.display());
        let raw = persist::parse_csv(&text)?;

        if let Some(path) = &bin_path {
            if let Err(e) = persist::write_binary(path, &raw) {
                warn!("failed to persist model {id}: {e}");
            }
        }

        Ok(raw)
    }

    /// Named after the whole id, so an id can only ever read back its own cache.
    fn bin_path(&self, id: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{id}.bin")))
    }
}

/// Identifiers are plain file names, anything that could escape the model directory is
/// rejected.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && !id.contains("..")
}
