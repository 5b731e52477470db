use std::{
    env,
    error::Error,
    fmt::{self, Display},
    num::NonZeroUsize,
    path::PathBuf,
    thread,
    time::Duration,
};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MODEL_DIR: &str = ".";
const DEFAULT_CACHE_DIR: &str = "model_cache";
const DEFAULT_MODELS: &str = "H_60x60.csv,H_30x30.csv";
const DEFAULT_CPU_CAP: f32 = 90.;
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 250;

/// The configuration module's result type.
pub type Result<T> = std::result::Result<T, ConfigErr>;

/// An environment variable holding a value that can't be used.
#[derive(Debug)]
pub struct ConfigErr {
    var: &'static str,
    value: String,
    reason: &'static str,
}

impl Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value '{}' for {}: {}",
            self.value, self.var, self.reason
        )
    }
}

impl Error for ConfigErr {}

/// Process wide settings of the reconstruction server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub models: Vec<String>,
    pub cpu_cap: f32,
    pub sample_interval: Duration,
    pub compute_threads: NonZeroUsize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            models: parse_models(DEFAULT_MODELS),
            cpu_cap: DEFAULT_CPU_CAP,
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            compute_threads: default_threads(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the environment, falling back to defaults for
    /// every unset variable.
    ///
    /// # Returns
    /// The configuration or an error naming the first invalid variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// # Arguments
    /// * `lookup` - Resolves a variable name to its value, if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", port, "expected a port number")?;
        }

        if let Some(dir) = lookup("RECON_MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("RECON_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }

        if let Some(models) = lookup("RECON_MODELS") {
            config.models = parse_models(&models);
        }

        if let Some(cap) = lookup("RECON_CPU_CAP") {
            let reason = "expected a positive percentage";
            let cpu_cap: f32 = parse("RECON_CPU_CAP", cap.clone(), reason)?;

            if !cpu_cap.is_finite() || cpu_cap <= 0. {
                return Err(ConfigErr {
                    var: "RECON_CPU_CAP",
                    value: cap,
                    reason,
                });
            }

            config.cpu_cap = cpu_cap;
        }

        if let Some(interval) = lookup("RECON_SAMPLE_INTERVAL_MS") {
            let reason = "expected a positive amount of milliseconds";
            let ms: u64 = parse("RECON_SAMPLE_INTERVAL_MS", interval.clone(), reason)?;

            if ms == 0 {
                return Err(ConfigErr {
                    var: "RECON_SAMPLE_INTERVAL_MS",
                    value: interval,
                    reason,
                });
            }

            config.sample_interval = Duration::from_millis(ms);
        }

        if let Some(threads) = lookup("RECON_COMPUTE_THREADS") {
            config.compute_threads = parse(
                "RECON_COMPUTE_THREADS",
                threads,
                "expected a positive amount of threads",
            )?;
        }

        Ok(config)
    }

    /// The address to bind the listener to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(var: &'static str, value: String, reason: &'static str) -> Result<T>
where
    T: std::str::FromStr,
{
    value
        .trim()
        .parse()
        .map_err(|_| ConfigErr { var, value, reason })
}

fn parse_models(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

fn default_threads() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
