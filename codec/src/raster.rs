use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use log::debug;

use crate::error::EncodeErr;

pub type Result<T> = std::result::Result<T, EncodeErr>;

/// Maximums at or below this value produce an all black image.
pub const MAX_EPSILON: f32 = 1e-9;

/// A PNG encoded reconstruction.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub png: Vec<u8>,
    pub side: usize,
}

/// Renders solution vectors into square 8-bit grayscale images.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEncoder;

impl ImageEncoder {
    /// Creates a new `ImageEncoder`.
    pub fn new() -> Self {
        Self
    }

    /// Maps a solution to pixel intensities.
    ///
    /// Negative values are clipped to zero and the rest are scaled so the maximum is 255,
    /// a maximum too close to zero yields all zeros.
    ///
    /// # Arguments
    /// * `solution` - The solution vector.
    ///
    /// # Returns
    /// One intensity per value of `solution`.
    pub fn intensities(&self, solution: &[f32]) -> Vec<u8> {
        let max = solution.iter().fold(0f32, |max, &x| max.max(x));

        if max <= MAX_EPSILON {
            return vec![0; solution.len()];
        }

        let scale = 255. / max;
        solution
            .iter()
            .map(|&x| (x.max(0.) * scale).round().clamp(0., 255.) as u8)
            .collect()
    }

    /// Lays intensities out in a square grid, column by column.
    ///
    /// Only the first `side²` intensities are used, the rest are dropped.
    ///
    /// # Arguments
    /// * `intensities` - The pixel values.
    ///
    /// # Returns
    /// The image or an error if there are no intensities.
    pub fn grid(&self, intensities: &[u8]) -> Result<GrayImage> {
        let side = side_for(intensities.len());
        if side == 0 {
            return Err(EncodeErr::Empty);
        }

        let img = GrayImage::from_fn(side as u32, side as u32, |col, row| {
            Luma([intensities[col as usize * side + row as usize]])
        });

        Ok(img)
    }

    /// Renders a solution as a PNG.
    ///
    /// # Arguments
    /// * `solution` - The rescaled solution vector.
    ///
    /// # Returns
    /// The PNG bytes and the side of the image.
    pub fn encode(&self, solution: &[f32]) -> Result<EncodedImage> {
        let img = self.grid(&self.intensities(solution))?;
        let side = img.width() as usize;

        if side * side != solution.len() {
            debug!(len = solution.len(), side = side; "truncating solution to a square");
        }

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        Ok(EncodedImage { png, side })
    }
}

/// The side of the largest square that fits `len` values.
pub fn side_for(len: usize) -> usize {
    let mut side = (len as f64).sqrt() as usize;

    // Correct float rounding for very large lengths.
    while side * side > len {
        side -= 1;
    }
    while (side + 1) * (side + 1) <= len {
        side += 1;
    }

    side
}

/// Reads an image back column by column, the inverse of `ImageEncoder::grid`.
///
/// # Arguments
/// * `img` - The image to flatten.
///
/// # Returns
/// The pixel values in column-major order.
pub fn flatten_column_major(img: &GrayImage) -> Vec<u8> {
    let (width, height) = img.dimensions();

    (0..width)
        .flat_map(|col| (0..height).map(move |row| img.get_pixel(col, row).0[0]))
        .collect()
}
