use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::Response,
};
use chrono::{DateTime, Local};
use solver::Algorithm;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const ELAPSED_HEADER: &str = "x-tempo";
pub const ALGORITHM_HEADER: &str = "x-algoritmo";
pub const ITERATIONS_HEADER: &str = "x-iteracoes";
pub const STARTED_HEADER: &str = "x-inicio";
pub const FINISHED_HEADER: &str = "x-fim";
pub const SIZE_HEADER: &str = "x-tamanho";
pub const CPU_HEADER: &str = "x-cpu";
pub const MEM_HEADER: &str = "x-mem";
pub const GAIN_HEADER: &str = "x-ganho";

/// Timing and resource metrics of a single reconstruction.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub algorithm: Algorithm,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    pub elapsed: Duration,
    pub iterations: usize,
    pub side: usize,
    pub cpu: f32,
    pub mem: f32,
    pub gain: Option<HeaderValue>,
}

impl Metrics {
    /// Renders the metrics as response headers.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let mut put = |name: &'static str, value: String| {
            // Every value is ascii, formatted from numbers and fixed names.
            if let Ok(value) = HeaderValue::try_from(value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        };

        put(ELAPSED_HEADER, format!("{:.4}", self.elapsed.as_secs_f64()));
        put(ALGORITHM_HEADER, self.algorithm.to_string());
        put(ITERATIONS_HEADER, self.iterations.to_string());
        put(STARTED_HEADER, self.started.format(TIME_FORMAT).to_string());
        put(FINISHED_HEADER, self.finished.format(TIME_FORMAT).to_string());
        put(SIZE_HEADER, format!("{0}x{0}", self.side));
        put(CPU_HEADER, format!("{:.1}", self.cpu));
        put(MEM_HEADER, format!("{:.1}", self.mem));

        if let Some(gain) = &self.gain {
            headers.insert(HeaderName::from_static(GAIN_HEADER), gain.clone());
        }

        headers
    }
}

/// Measures a reconstruction from admission to completion and builds its response.
#[derive(Debug)]
pub struct ResponseBuilder {
    algorithm: Algorithm,
    gain: Option<HeaderValue>,
    started: DateTime<Local>,
    clock: Instant,
}

impl ResponseBuilder {
    /// Starts measuring.
    ///
    /// # Arguments
    /// * `algorithm` - The solver in use.
    /// * `gain` - The client's gain tag, echoed back untouched.
    pub fn start(algorithm: Algorithm, gain: Option<HeaderValue>) -> Self {
        Self {
            algorithm,
            gain,
            started: Local::now(),
            clock: Instant::now(),
        }
    }

    /// Stops measuring.
    ///
    /// # Arguments
    /// * `iterations` - The solver's iteration count.
    /// * `side` - The side of the rendered image.
    /// * `cpu` - The CPU usage at completion.
    /// * `mem` - The memory usage at completion.
    pub fn finish(self, iterations: usize, side: usize, cpu: f32, mem: f32) -> Metrics {
        Metrics {
            algorithm: self.algorithm,
            started: self.started,
            finished: Local::now(),
            elapsed: self.clock.elapsed(),
            iterations,
            side,
            cpu,
            mem,
            gain: self.gain,
        }
    }
}

/// Builds the successful response of a reconstruction.
///
/// # Arguments
/// * `metrics` - The reconstruction's metrics.
/// * `png` - The rendered image.
pub fn image_response(metrics: &Metrics, png: Vec<u8>) -> Response {
    let mut headers = metrics.headers();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));

    let mut response = Response::new(Body::from(png));
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers() {
        let started = Local::now();
        let metrics = Metrics {
            algorithm: Algorithm::Cgnr,
            started,
            finished: started,
            elapsed: Duration::from_millis(1234),
            iterations: 7,
            side: 30,
            cpu: 42.26,
            mem: 13.,
            gain: Some(HeaderValue::from_static("1.5e3")),
        };

        let headers = metrics.headers();
        assert_eq!(headers[ELAPSED_HEADER], "1.2340");
        assert_eq!(headers[ALGORITHM_HEADER], "CGNR");
        assert_eq!(headers[ITERATIONS_HEADER], "7");
        assert_eq!(headers[SIZE_HEADER], "30x30");
        assert_eq!(headers[CPU_HEADER], "42.3");
        assert_eq!(headers[MEM_HEADER], "13.0");
        assert_eq!(headers[GAIN_HEADER], "1.5e3");

        let started = headers[STARTED_HEADER].to_str().unwrap();
        assert_eq!(started, metrics.started.format(TIME_FORMAT).to_string());
        assert_eq!(started.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_gain_is_optional() {
        let metrics = ResponseBuilder::start(Algorithm::Cgne, None).finish(0, 1, 0., 0.);
        assert!(!metrics.headers().contains_key(GAIN_HEADER));
        assert_eq!(metrics.headers()[ITERATIONS_HEADER], "0");
    }

    #[test]
    fn test_image_response() {
        let metrics = ResponseBuilder::start(Algorithm::Cgne, None).finish(3, 2, 1., 2.);
        let response = image_response(&metrics, vec![1, 2, 3]);

        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[SIZE_HEADER], "2x2");
    }
}
