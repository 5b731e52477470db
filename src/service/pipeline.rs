use std::num::NonZeroUsize;

use codec::{EncodedImage, ImageEncoder, SignalDecoder};
use log::{debug, error};
use ndarray::ArrayView1;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use solver::{Algorithm, ForwardModel};
use tokio::sync::oneshot;

use super::error::{Result, ServiceErr};

/// A dedicated thread pool for the CPU bound part of the requests.
///
/// The solvers' parallel kernels run inside this pool too, so reconstructions never
/// compete with the async runtime's workers.
pub struct ComputePool {
    pool: ThreadPool,
}

impl ComputePool {
    /// Creates a new `ComputePool`.
    ///
    /// # Arguments
    /// * `threads` - The amount of compute threads.
    pub fn new(threads: NonZeroUsize) -> std::result::Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.get())
            .thread_name(|i| format!("recon-compute-{i}"))
            .panic_handler(|_| error!("a compute job panicked"))
            .build()?;

        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `job` in the pool and waits for its result without blocking the runtime.
    ///
    /// # Arguments
    /// * `job` - The work to run.
    ///
    /// # Returns
    /// The job's output or an internal error if the job panicked.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        self.pool.spawn(move || {
            // The receiver is gone if the client disconnected, the result is discarded.
            let _ = tx.send(job());
        });

        rx.await
            .map_err(|_| ServiceErr::Internal("the compute job didn't finish".to_string()))
    }
}

/// The outcome of a reconstruction.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub image: EncodedImage,
    pub iterations: usize,
}

/// Decodes a signal, solves it against a model and renders the solution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconstructor {
    decoder: SignalDecoder,
    encoder: ImageEncoder,
}

impl Reconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the whole CPU bound part of a request.
    ///
    /// # Arguments
    /// * `model` - The forward model.
    /// * `algorithm` - The solver to use.
    /// * `body` - The raw little-endian signal.
    /// * `declared_len` - The amount of samples the client claims to have sent, if any.
    ///
    /// # Returns
    /// The rendered image and the solver's iteration count.
    pub fn reconstruct(
        &self,
        model: &ForwardModel,
        algorithm: Algorithm,
        body: &[u8],
        declared_len: Option<usize>,
    ) -> Result<Reconstruction> {
        let signal = self.decoder.decode(body, declared_len)?;

        if signal.len() != model.rows() {
            return Err(ServiceErr::Validation(format!(
                "the signal has {} samples but the model expects {}",
                signal.len(),
                model.rows()
            )));
        }

        let solution = algorithm.solve(model, ArrayView1::from(signal.samples()))?;
        let iterations = solution.iterations();

        let mut values = solution.into_vec();
        model.rescale(&mut values, signal.stats());

        let image = self.encoder.encode(&values)?;
        debug!(iterations = iterations, side = image.side; "reconstructed with {algorithm}");

        Ok(Reconstruction { image, iterations })
    }
}
