use std::{
    error::Error,
    fmt::{self, Display},
};

/// The errors that can happen while decoding a raw signal body.
#[derive(Debug)]
pub enum DecodeErr {
    Empty,
    Misaligned { len: usize },
    LengthMismatch { declared: usize, decoded: usize },
    NonFinite { index: usize },
}

impl Display for DecodeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErr::Empty => write!(f, "the signal body is empty"),
            DecodeErr::Misaligned { len } => write!(
                f,
                "the signal body has {len} bytes, which is not a multiple of 4"
            ),
            DecodeErr::LengthMismatch { declared, decoded } => write!(
                f,
                "the declared signal length is {declared} but the body holds {decoded} samples"
            ),
            DecodeErr::NonFinite { index } => {
                write!(f, "the signal sample at {index} is not finite")
            }
        }
    }
}

impl Error for DecodeErr {}

/// The errors that can happen while encoding a solution into an image.
#[derive(Debug)]
pub enum EncodeErr {
    Empty,
    Png(image::ImageError),
}

impl Display for EncodeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeErr::Empty => write!(f, "can't encode an empty solution"),
            EncodeErr::Png(e) => write!(f, "png encoding failed: {e}"),
        }
    }
}

impl Error for EncodeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EncodeErr::Png(e) => Some(e),
            EncodeErr::Empty => None,
        }
    }
}

impl From<image::ImageError> for EncodeErr {
    fn from(value: image::ImageError) -> Self {
        Self::Png(value)
    }
}
