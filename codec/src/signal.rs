use log::debug;
use solver::Stats;

use crate::{SAMPLE_SIZE, SampleType, error::DecodeErr};

pub type Result<T> = std::result::Result<T, DecodeErr>;

/// A decoded and normalized signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    stats: Stats,
}

impl Signal {
    /// The z-score normalized samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// The statistics of the raw samples, needed to rescale the solution.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Turns raw request bodies into normalized signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalDecoder;

impl SignalDecoder {
    /// Creates a new `SignalDecoder`.
    pub fn new() -> Self {
        Self
    }

    /// Decodes a buffer of little-endian `f32` samples and normalizes it.
    ///
    /// # Arguments
    /// * `bytes` - The raw body.
    /// * `declared` - The amount of samples the client claims to have sent, if any.
    ///
    /// # Returns
    /// The normalized signal or an error if the buffer is malformed.
    pub fn decode(&self, bytes: &[u8], declared: Option<usize>) -> Result<Signal> {
        if bytes.is_empty() {
            return Err(DecodeErr::Empty);
        }

        if bytes.len() % SAMPLE_SIZE != 0 {
            return Err(DecodeErr::Misaligned { len: bytes.len() });
        }

        let decoded = bytes.len() / SAMPLE_SIZE;
        if let Some(declared) = declared.filter(|&declared| declared != decoded) {
            return Err(DecodeErr::LengthMismatch { declared, decoded });
        }

        let mut samples = Vec::with_capacity(decoded);
        for (index, chunk) in bytes.chunks_exact(SAMPLE_SIZE).enumerate() {
            let mut buf = [0; SAMPLE_SIZE];
            buf.copy_from_slice(chunk);

            let sample = SampleType::from_le_bytes(buf);
            if !sample.is_finite() {
                return Err(DecodeErr::NonFinite { index });
            }

            samples.push(sample);
        }

        let stats = Stats::of(&samples);
        stats.normalize(&mut samples);

        debug!(len = decoded, mean = stats.mean(), std = stats.std(); "decoded signal");
        Ok(Signal { samples, stats })
    }
}

/// Serializes samples the way `SignalDecoder` expects them.
///
/// # Arguments
/// * `samples` - The raw samples.
///
/// # Returns
/// The little-endian byte representation of `samples`.
pub fn to_le_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|x| x.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_normalizes() {
        let bytes = to_le_bytes(&[1., 2., 3., 4.]);
        let signal = SignalDecoder::new().decode(&bytes, Some(4)).unwrap();

        assert_eq!(signal.len(), 4);
        assert_eq!(signal.stats().mean(), 2.5);
        assert!(signal.samples()[0] < 0. && signal.samples()[3] > 0.);

        let sum: f32 = signal.samples().iter().sum();
        assert!(sum.abs() < 1e-6);
    }

    #[test]
    fn test_decode_is_little_endian() {
        let bytes = [0x00, 0x00, 0x80, 0x3f, 0x00, 0x00, 0x00, 0x40];
        let signal = SignalDecoder::new().decode(&bytes, None).unwrap();

        assert_eq!(signal.stats().mean(), 1.5);
        assert_eq!(signal.stats().std(), 0.5);
        assert_eq!(signal.samples(), [-1., 1.]);
    }

    #[test]
    fn test_constant_signal_is_centered() {
        let bytes = to_le_bytes(&[3.; 5]);
        let signal = SignalDecoder::new().decode(&bytes, None).unwrap();

        assert!(signal.stats().is_degenerate());
        assert!(signal.samples().iter().all(|&x| x == 0.));
    }

    #[test]
    fn test_rejects_malformed_bodies() {
        let decoder = SignalDecoder::new();

        assert!(matches!(decoder.decode(&[], None), Err(DecodeErr::Empty)));
        assert!(matches!(
            decoder.decode(&[0; 7], None),
            Err(DecodeErr::Misaligned { len: 7 })
        ));
        assert!(matches!(
            decoder.decode(&to_le_bytes(&[1., 2.]), Some(3)),
            Err(DecodeErr::LengthMismatch {
                declared: 3,
                decoded: 2
            })
        ));
        assert!(matches!(
            decoder.decode(&to_le_bytes(&[1., f32::NAN, 2.]), None),
            Err(DecodeErr::NonFinite { index: 1 })
        ));
        assert!(matches!(
            decoder.decode(&to_le_bytes(&[f32::INFINITY]), None),
            Err(DecodeErr::NonFinite { index: 0 })
        ));
    }
}
