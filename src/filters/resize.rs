//! Resampling and working-size bounding.
//!
//! Neighborhood filters cost `O(r^2)` per pixel, so previews are computed on
//! a copy whose longer side is bounded (1000 px by default). Aspect ratio is
//! preserved and images are never upsampled.
//!
//! Small reductions use bilinear interpolation. Reductions by more than
//! [`AREA_SCALE_THRESHOLD`] on either axis average every covered source
//! pixel instead, so fine detail does not alias.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use super::core::{try_alloc, try_to_owned, Sample};
use super::raster::validate_dims;
use crate::error::FilterError;

/// Longest side of the working copy used for previews.
pub const DEFAULT_MAX_DIMENSION: usize = 1000;

/// Downscale factor above which [`resize_to_fit`] switches to area averaging.
pub const AREA_SCALE_THRESHOLD: f64 = 2.0;

/// Interpolation mode for the resize operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    /// 2x2 taps around the mapped pixel center.
    Bilinear,
    /// Coverage-weighted mean of every source pixel under the target pixel.
    Area,
}

/// Compute the (height, width) that fits inside `max_dimension`.
///
/// Returns the input size unchanged when both sides already fit.
pub fn fit_within(height: usize, width: usize, max_dimension: usize) -> (usize, usize) {
    if width <= max_dimension && height <= max_dimension {
        return (height, width);
    }

    let scale = f64::min(
        max_dimension as f64 / width as f64,
        max_dimension as f64 / height as f64,
    );
    let new_height = ((height as f64 * scale).round() as usize).clamp(1, max_dimension);
    let new_width = ((width as f64 * scale).round() as usize).clamp(1, max_dimension);
    (new_height, new_width)
}

/// Resize an image to `new_height` x `new_width` with the given mode.
pub fn resize<T: Sample>(
    input: ArrayView3<T>,
    new_height: usize,
    new_width: usize,
    interpolation: InterpolationMode,
) -> Result<Array3<T>, FilterError> {
    match interpolation {
        InterpolationMode::Bilinear => resize_bilinear(input, new_height, new_width),
        InterpolationMode::Area => resize_area(input, new_height, new_width),
    }
}

fn check_target(new_height: usize, new_width: usize) -> Result<(), FilterError> {
    if new_height == 0 || new_width == 0 {
        return Err(FilterError::invalid_parameter(
            "size",
            format!("target size must be non-zero, got {}x{}", new_width, new_height),
        ));
    }
    Ok(())
}

fn alloc_output<T: Sample>(
    new_height: usize,
    new_width: usize,
    channels: usize,
) -> Result<Vec<T>, FilterError> {
    let len = new_width
        .checked_mul(channels)
        .and_then(|n| n.checked_mul(new_height))
        .ok_or(FilterError::OutOfMemory { bytes: usize::MAX })?;
    try_alloc::<T>(len)
}

/// Resize with bilinear interpolation.
///
/// Pixel centers are aligned (`src = (dst + 0.5) * scale - 0.5`) and
/// coordinates are clamped to the image, so edges are not darkened. All
/// channels, including alpha, are interpolated.
///
/// # Arguments
/// * `input` - Image with 1, 3, or 4 channels (height, width, channels)
/// * `new_height`, `new_width` - Target size, both non-zero
pub fn resize_bilinear<T: Sample>(
    input: ArrayView3<T>,
    new_height: usize,
    new_width: usize,
) -> Result<Array3<T>, FilterError> {
    let (height, width, channels) = input.dim();
    validate_dims(height, width, channels)?;
    check_target(new_height, new_width)?;

    let scale_x = width as f64 / new_width as f64;
    let scale_y = height as f64 / new_height as f64;
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;

    let row_len = new_width * channels;
    let mut output = alloc_output::<T>(new_height, new_width, channels)?;

    output
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, out_row)| {
            let v = ((y as f64 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
            let y0 = v.floor() as usize;
            let y1 = (y0 + 1).min(height - 1);
            let fy = v - y0 as f64;

            for x in 0..new_width {
                let u = ((x as f64 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
                let x0 = u.floor() as usize;
                let x1 = (x0 + 1).min(width - 1);
                let fx = u - x0 as f64;

                for c in 0..channels {
                    let val00 = input[[y0, x0, c]].to_f64();
                    let val01 = input[[y0, x1, c]].to_f64();
                    let val10 = input[[y1, x0, c]].to_f64();
                    let val11 = input[[y1, x1, c]].to_f64();

                    let top = val00 * (1.0 - fx) + val01 * fx;
                    let bottom = val10 * (1.0 - fx) + val11 * fx;
                    out_row[x * channels + c] = T::from_f64(top * (1.0 - fy) + bottom * fy);
                }
            }
        });

    Ok(Array3::from_shape_vec((new_height, new_width, channels), output)?)
}

/// Source pixels under each target pixel with their coverage weights.
///
/// Target pixel `i` spans `[i * scale, (i + 1) * scale)` in source
/// coordinates; weights of each span sum to 1.
fn area_spans(len: usize, new_len: usize) -> Vec<Vec<(usize, f64)>> {
    let scale = len as f64 / new_len as f64;

    (0..new_len)
        .map(|i| {
            let start = i as f64 * scale;
            let end = ((i + 1) as f64 * scale).min(len as f64);
            let first = (start.floor() as usize).min(len - 1);
            let last = (end.ceil() as usize).clamp(first + 1, len);

            let mut span: Vec<(usize, f64)> = (first..last)
                .map(|s| (s, end.min((s + 1) as f64) - start.max(s as f64)))
                .filter(|&(_, w)| w > 0.0)
                .collect();
            if span.is_empty() {
                span.push((first, 1.0));
            }

            let total: f64 = span.iter().map(|&(_, w)| w).sum();
            for (_, w) in span.iter_mut() {
                *w /= total;
            }
            span
        })
        .collect()
}

/// Resize by area averaging.
///
/// Every target pixel is the coverage-weighted mean of the source pixels it
/// overlaps, which acts as a box prefilter for large reductions. All
/// channels, including alpha, are averaged.
///
/// # Arguments
/// * `input` - Image with 1, 3, or 4 channels (height, width, channels)
/// * `new_height`, `new_width` - Target size, both non-zero
pub fn resize_area<T: Sample>(
    input: ArrayView3<T>,
    new_height: usize,
    new_width: usize,
) -> Result<Array3<T>, FilterError> {
    let (height, width, channels) = input.dim();
    validate_dims(height, width, channels)?;
    check_target(new_height, new_width)?;

    let x_spans = area_spans(width, new_width);
    let y_spans = area_spans(height, new_height);

    let row_len = new_width * channels;
    let mut output = alloc_output::<T>(new_height, new_width, channels)?;

    output
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (x, x_span) in x_spans.iter().enumerate() {
                for c in 0..channels {
                    let mut acc = 0.0f64;
                    for &(sy, wy) in &y_spans[y] {
                        for &(sx, wx) in x_span {
                            acc += wy * wx * input[[sy, sx, c]].to_f64();
                        }
                    }
                    out_row[x * channels + c] = T::from_f64(acc);
                }
            }
        });

    Ok(Array3::from_shape_vec((new_height, new_width, channels), output)?)
}

/// Interpolation used to shrink `(height, width)` to `(new_height, new_width)`.
pub fn interpolation_for(
    (height, width): (usize, usize),
    (new_height, new_width): (usize, usize),
) -> InterpolationMode {
    let factor = f64::max(
        height as f64 / new_height as f64,
        width as f64 / new_width as f64,
    );
    if factor > AREA_SCALE_THRESHOLD {
        InterpolationMode::Area
    } else {
        InterpolationMode::Bilinear
    }
}

/// Shrink an image so its longer side is at most `max_dimension`.
///
/// Returns an owned copy when no resize is needed. Reductions by more than
/// [`AREA_SCALE_THRESHOLD`] use [`InterpolationMode::Area`].
pub fn resize_to_fit<T: Sample>(
    input: ArrayView3<T>,
    max_dimension: usize,
) -> Result<Array3<T>, FilterError> {
    if max_dimension == 0 {
        return Err(FilterError::invalid_parameter(
            "max_dimension",
            "must be greater than zero",
        ));
    }

    let (height, width, channels) = input.dim();
    validate_dims(height, width, channels)?;

    let (new_height, new_width) = fit_within(height, width, max_dimension);
    if (new_height, new_width) == (height, width) {
        return try_to_owned(input);
    }

    let interpolation = interpolation_for((height, width), (new_height, new_width));
    log::debug!(
        "resizing {}x{} to {}x{} (max dimension {}, {:?})",
        width,
        height,
        new_width,
        new_height,
        max_dimension,
        interpolation
    );
    resize(input, new_height, new_width, interpolation)
}
