pub mod error;
pub mod raster;
pub mod signal;

pub use error::{DecodeErr, EncodeErr};
pub use raster::{EncodedImage, ImageEncoder};
pub use signal::{Signal, SignalDecoder};

type SampleType = f32;
const SAMPLE_SIZE: usize = size_of::<SampleType>();
