//! Owned raster type and pixel-format conversion.
//!
//! ## Bit Depth Support
//!
//! - **u8 (8-bit)**: Values 0-255, standard for decoded photos
//! - **f32 (float)**: Values 0.0-1.0, for linear/HDR workflows
//!
//! A [`Raster`] is always stored as a standard-layout ndarray of shape
//! (height, width, channels), so it can be handed to the filters as a view
//! or flattened back into an interleaved buffer for encoders.

use ndarray::{Array3, ArrayView3};

use super::core::Sample;
use crate::error::FilterError;

/// Check image dimensions and channel count.
///
/// Filters accept grayscale (1), RGB (3) and RGBA (4) images with non-zero
/// width and height.
pub fn validate_dims(height: usize, width: usize, channels: usize) -> Result<(), FilterError> {
    if width == 0 || height == 0 {
        return Err(FilterError::InvalidImage(format!(
            "image must not be empty, got {}x{}",
            width, height
        )));
    }
    if !matches!(channels, 1 | 3 | 4) {
        return Err(FilterError::InvalidImage(format!(
            "expected 1, 3 or 4 channels, got {}",
            channels
        )));
    }
    Ok(())
}

/// A validated, exclusively owned image buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    data: Array3<T>,
}

impl<T: Sample> Raster<T> {
    /// Wrap an interleaved, row-major buffer.
    ///
    /// Fails with [`FilterError::InvalidImage`] when a dimension is zero, the
    /// channel count is unsupported, or `data.len()` differs from
    /// `width * height * channels`.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<T>,
    ) -> Result<Self, FilterError> {
        validate_dims(height, width, channels)?;

        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| {
                FilterError::InvalidImage(format!(
                    "{}x{}x{} overflows the address space",
                    width, height, channels
                ))
            })?;
        if data.len() != expected {
            return Err(FilterError::InvalidImage(format!(
                "buffer length {} does not match {}x{}x{} = {}",
                data.len(),
                width,
                height,
                channels,
                expected
            )));
        }

        let data = Array3::from_shape_vec((height, width, channels), data)?;
        Ok(Raster { data })
    }

    /// Adopt an ndarray of shape (height, width, channels).
    pub fn from_array(array: Array3<T>) -> Result<Self, FilterError> {
        let (height, width, channels) = array.dim();
        validate_dims(height, width, channels)?;

        let data = if array.is_standard_layout() {
            array
        } else {
            array.as_standard_layout().into_owned()
        };
        Ok(Raster { data })
    }

    /// Create a raster filled with a single pixel value.
    pub fn filled(
        width: usize,
        height: usize,
        pixel: &[T],
    ) -> Result<Self, FilterError> {
        let channels = pixel.len();
        validate_dims(height, width, channels)?;
        let data = Array3::from_shape_fn((height, width, channels), |(_, _, c)| pixel[c]);
        Ok(Raster { data })
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn has_alpha(&self) -> bool {
        self.channels() == 4
    }

    /// Sample at column `x`, row `y`, channel `c`.
    ///
    /// Returns `None` outside the image.
    pub fn get(&self, x: usize, y: usize, c: usize) -> Option<T> {
        self.data.get([y, x, c]).copied()
    }

    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    /// Interleaved samples in row-major order.
    pub fn as_slice(&self) -> &[T] {
        // Construction keeps the array in standard layout.
        self.data.as_slice().unwrap_or(&[])
    }

    pub fn into_array(self) -> Array3<T> {
        self.data
    }

    /// Interleaved samples in row-major order.
    pub fn into_vec(self) -> Vec<T> {
        self.data.into_raw_vec_and_offset().0
    }
}

impl Raster<u8> {
    /// Convert to normalized floats (0.0-1.0).
    pub fn to_f32(&self) -> Raster<f32> {
        Raster {
            data: u8_to_f32(self.view()),
        }
    }
}

impl Raster<f32> {
    /// Convert to 8-bit, clamping to 0.0-1.0 and rounding.
    pub fn to_u8(&self) -> Raster<u8> {
        Raster {
            data: f32_to_u8(self.view()),
        }
    }
}

/// Convert u8 image (0-255) to f32 (0.0-1.0)
pub fn u8_to_f32(input: ArrayView3<u8>) -> Array3<f32> {
    input.mapv(|v| v as f32 / 255.0)
}

/// Convert f32 image (0.0-1.0) to u8 (0-255)
pub fn f32_to_u8(input: ArrayView3<f32>) -> Array3<u8> {
    input.mapv(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}
