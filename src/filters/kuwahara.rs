//! Kuwahara filter ("Oil Paint" effect).
//!
//! Edge-preserving smoothing: every output pixel takes the mean color of the
//! most homogeneous of four quadrants around it.
//!
//! ## Quadrants
//!
//! For radius `r` and offsets `dx, dy` in `[-r, r]`:
//!
//! | Quadrant | Offsets |
//! |----------|---------|
//! | A | `dx <= 0 && dy <= 0` |
//! | B | `dx >= 0 && dy <= 0` |
//! | C | `dx <= 0 && dy >= 0` |
//! | D | `dx >= 0 && dy >= 0` |
//!
//! The center row and column belong to more than one quadrant, so each
//! quadrant holds `(r + 1)^2` samples and the quadrants overlap along the
//! axes through the pixel. Per quadrant the per-channel variance is
//! `|E[v^2] - E[v]^2|` and the dispersion is the sum over color channels.
//! The first quadrant (in A, B, C, D order) with the lowest dispersion wins.
//!
//! Samples outside the image are clamped to the nearest edge pixel.
//!
//! ## Supported Formats
//!
//! - **Grayscale**: (height, width, 1) - dispersion over the single channel
//! - **RGB**: (height, width, 3) - dispersion over R, G, B
//! - **RGBA**: (height, width, 4) - RGB filtered, alpha copied unchanged
//!
//! Both u8 (0-255) and f32 (0.0-1.0) samples are supported. Statistics are
//! accumulated in f64; u8 sums stay exact integers.
//!
//! ## Methods
//!
//! - [`KuwaharaMethod::Direct`] scans the full window for every pixel,
//!   `O(width * height * r^2)`.
//! - [`KuwaharaMethod::SlidingWindow`] keeps running column sums for the
//!   upper and lower half windows and slides them down a band of rows,
//!   so each pixel costs O(1) after the band is primed. Output is
//!   bit-identical to `Direct` for u8 images. For f32 images, pixels whose
//!   two best quadrants are within rounding distance of each other are
//!   rescanned directly, so both methods pick the same quadrant.
//!
//! Non-finite f32 samples (NaN, infinity) are rejected with
//! [`FilterError::InvalidImage`].
//!
//! Rows (or row bands) are processed in parallel with rayon.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use super::core::{
    clamp_coord, color_channels, contiguous_samples, try_alloc, CancelToken, Sample,
};
use super::raster::{validate_dims, Raster};
use crate::error::FilterError;

/// Radius used by the oil paint preset.
pub const DEFAULT_RADIUS: u32 = 15;

/// Largest supported radius (129x129 window).
pub const MAX_RADIUS: u32 = 64;

/// Radius at intensity 1.0.
const INTENSITY_RADIUS_SCALE: f32 = 15.0;

/// Rows per work item for the sliding window method.
const BAND_ROWS: usize = 32;

/// Dispersion gap, relative to the peak sample energy, below which two
/// quadrants are treated as tied and the pixel is rescanned directly.
const TIE_TOLERANCE: f64 = 1e-9;

/// How the quadrant statistics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KuwaharaMethod {
    /// Scan every window sample for every pixel.
    #[default]
    Direct,
    /// Incremental column sums with per-row prefix sums.
    SlidingWindow,
}

impl KuwaharaMethod {
    /// Parse `"direct"` or `"sliding_window"` (also `"sliding"`).
    pub fn from_name(name: &str) -> Result<Self, FilterError> {
        match name {
            "direct" => Ok(KuwaharaMethod::Direct),
            "sliding_window" | "sliding" => Ok(KuwaharaMethod::SlidingWindow),
            other => Err(FilterError::invalid_parameter(
                "method",
                format!("expected \"direct\" or \"sliding_window\", got {:?}", other),
            )),
        }
    }
}

/// Validated Kuwahara parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KuwaharaParams {
    radius: u32,
    method: KuwaharaMethod,
}

impl Default for KuwaharaParams {
    fn default() -> Self {
        KuwaharaParams {
            radius: DEFAULT_RADIUS,
            method: KuwaharaMethod::default(),
        }
    }
}

impl KuwaharaParams {
    /// Create parameters for the given window half-width.
    ///
    /// # Arguments
    /// * `radius` - Half-width of the square window (0-64). 0 is the identity.
    ///
    /// # Errors
    /// [`FilterError::InvalidParameter`] for negative radii or radii above
    /// [`MAX_RADIUS`].
    pub fn new(radius: i64) -> Result<Self, FilterError> {
        if radius < 0 {
            return Err(FilterError::invalid_parameter(
                "radius",
                format!("must not be negative, got {}", radius),
            ));
        }
        if radius > MAX_RADIUS as i64 {
            return Err(FilterError::invalid_parameter(
                "radius",
                format!("must be at most {}, got {}", MAX_RADIUS, radius),
            ));
        }
        Ok(KuwaharaParams {
            radius: radius as u32,
            method: KuwaharaMethod::default(),
        })
    }

    /// Derive the radius from an effect intensity.
    ///
    /// Intensity 1.0 maps to radius 15; fractional radii are truncated.
    pub fn from_intensity(intensity: f32) -> Result<Self, FilterError> {
        if !intensity.is_finite() || intensity < 0.0 {
            return Err(FilterError::invalid_parameter(
                "intensity",
                format!("must be a finite, non-negative number, got {}", intensity),
            ));
        }
        Self::new((INTENSITY_RADIUS_SCALE * intensity).trunc() as i64)
    }

    pub fn with_method(mut self, method: KuwaharaMethod) -> Self {
        self.method = method;
        self
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn method(&self) -> KuwaharaMethod {
        self.method
    }

    /// Side length of the square window.
    pub fn window_size(&self) -> usize {
        2 * self.radius as usize + 1
    }
}

// ============================================================================
// Quadrant statistics
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct Quadrant {
    count: u32,
    sum: [f64; 3],
    sum_sq: [f64; 3],
}

impl Quadrant {
    #[inline]
    fn add(&mut self, color: &[f64; 3], color_channels: usize) {
        self.count += 1;
        for c in 0..color_channels {
            self.sum[c] += color[c];
            self.sum_sq[c] += color[c] * color[c];
        }
    }
}

/// Winning quadrant mean and its margin over the runner-up.
struct Selection {
    mean: [f64; 3],
    gap: f64,
}

/// Mean color of the quadrant with the lowest dispersion.
///
/// Strict comparison keeps the first minimum in A, B, C, D order.
#[inline]
fn select_mean(quadrants: &[Quadrant; 4], color_channels: usize) -> Selection {
    let mut best = [0.0f64; 3];
    let mut min_dispersion = f64::INFINITY;
    let mut runner_up = f64::INFINITY;

    for quadrant in quadrants {
        let n = quadrant.count as f64;
        let mut mean = [0.0f64; 3];
        let mut dispersion = 0.0f64;
        for c in 0..color_channels {
            mean[c] = quadrant.sum[c] / n;
            dispersion += (quadrant.sum_sq[c] / n - mean[c] * mean[c]).abs();
        }
        if dispersion < min_dispersion {
            runner_up = min_dispersion;
            min_dispersion = dispersion;
            best = mean;
        } else if dispersion < runner_up {
            runner_up = dispersion;
        }
    }

    Selection {
        mean: best,
        gap: runner_up - min_dispersion,
    }
}

/// Read-only view of the source image shared by all workers.
struct Frame<'a, T> {
    src: &'a [T],
    width: usize,
    height: usize,
    channels: usize,
    color_channels: usize,
    radius: usize,
    /// Gap under which sliding window selections are rescanned; `None`
    /// when sums are exact or the direct method is used.
    tie_tolerance: Option<f64>,
}

impl<T: Sample> Frame<'_, T> {
    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.channels
    }

    #[inline]
    fn color(&self, x: usize, y: usize) -> [f64; 3] {
        let base = self.offset(x, y);
        let mut color = [0.0f64; 3];
        for c in 0..self.color_channels {
            color[c] = self.src[base + c].to_f64();
        }
        color
    }

    /// Write the selected mean for column `x` of row `y` into `out_row`.
    #[inline]
    fn store(&self, x: usize, y: usize, mean: &[f64; 3], out_row: &mut [T]) {
        let o = x * self.channels;
        for c in 0..self.color_channels {
            out_row[o + c] = T::from_f64(mean[c]);
        }
        if self.channels == 4 {
            out_row[o + 3] = self.src[self.offset(x, y) + 3];
        }
    }
}

// ============================================================================
// Direct method
// ============================================================================

fn direct_pixel<T: Sample>(frame: &Frame<'_, T>, x: usize, y: usize) -> [f64; 3] {
    let r = frame.radius as isize;
    let cc = frame.color_channels;
    let mut quadrants = [Quadrant::default(); 4];

    for dy in -r..=r {
        let sy = clamp_coord(y, dy, frame.height);

        for dx in -r..=r {
            let sx = clamp_coord(x, dx, frame.width);
            let color = frame.color(sx, sy);

            if dx <= 0 && dy <= 0 {
                quadrants[0].add(&color, cc);
            }
            if dx >= 0 && dy <= 0 {
                quadrants[1].add(&color, cc);
            }
            if dx <= 0 && dy >= 0 {
                quadrants[2].add(&color, cc);
            }
            if dx >= 0 && dy >= 0 {
                quadrants[3].add(&color, cc);
            }
        }
    }

    select_mean(&quadrants, cc).mean
}

fn direct_row<T: Sample>(frame: &Frame<'_, T>, y: usize, out_row: &mut [T]) {
    for x in 0..frame.width {
        frame.store(x, y, &direct_pixel(frame, x, y), out_row);
    }
}

// ============================================================================
// Sliding window method
// ============================================================================

/// Per-column sums over a vertical half window.
///
/// Column `p` of the padded row maps to source column `clamp(p - r)`, so
/// windows that hang over the left or right edge are plain ranges of `p`.
struct ColumnSums {
    color_channels: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl ColumnSums {
    fn new(padded_width: usize, color_channels: usize) -> Self {
        ColumnSums {
            color_channels,
            sum: vec![0.0; padded_width * color_channels],
            sum_sq: vec![0.0; padded_width * color_channels],
        }
    }

    /// Add (`sign = 1.0`) or remove (`sign = -1.0`) source row `sy`.
    fn add_row<T: Sample>(&mut self, frame: &Frame<'_, T>, sy: usize, sign: f64) {
        let cc = self.color_channels;
        let r = frame.radius as isize;
        let padded_width = self.sum.len() / cc;

        for p in 0..padded_width {
            let color = frame.color(clamp_coord(p, -r, frame.width), sy);
            for c in 0..cc {
                let v = sign * color[c];
                self.sum[p * cc + c] += v;
                self.sum_sq[p * cc + c] += v * color[c];
            }
        }
    }
}

/// Running totals of [`ColumnSums`] along the padded row.
struct PrefixSums {
    color_channels: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl PrefixSums {
    fn new(padded_width: usize, color_channels: usize) -> Self {
        PrefixSums {
            color_channels,
            sum: vec![0.0; (padded_width + 1) * color_channels],
            sum_sq: vec![0.0; (padded_width + 1) * color_channels],
        }
    }

    fn rebuild(&mut self, columns: &ColumnSums) {
        let cc = self.color_channels;
        let padded_width = columns.sum.len() / cc;

        for p in 0..padded_width {
            for c in 0..cc {
                let i = p * cc + c;
                self.sum[i + cc] = self.sum[i] + columns.sum[i];
                self.sum_sq[i + cc] = self.sum_sq[i] + columns.sum_sq[i];
            }
        }
    }

    /// Statistics for padded columns `first..=last`.
    #[inline]
    fn quadrant(&self, first: usize, last: usize, count: u32) -> Quadrant {
        let cc = self.color_channels;
        let mut quadrant = Quadrant {
            count,
            ..Quadrant::default()
        };
        for c in 0..cc {
            let hi = (last + 1) * cc + c;
            let lo = first * cc + c;
            quadrant.sum[c] = self.sum[hi] - self.sum[lo];
            quadrant.sum_sq[c] = self.sum_sq[hi] - self.sum_sq[lo];
        }
        quadrant
    }
}

fn sliding_band<T: Sample>(
    frame: &Frame<'_, T>,
    first_row: usize,
    band: &mut [T],
    cancel: &CancelToken,
) -> Result<(), FilterError> {
    let r = frame.radius;
    let ri = r as isize;
    let cc = frame.color_channels;
    let row_len = frame.width * frame.channels;
    let padded_width = frame.width + 2 * r;
    let count = ((r + 1) * (r + 1)) as u32;

    // Upper half window covers rows y-r..=y, lower half y..=y+r.
    let mut upper = ColumnSums::new(padded_width, cc);
    let mut lower = ColumnSums::new(padded_width, cc);
    for d in 0..=ri {
        upper.add_row(frame, clamp_coord(first_row, -d, frame.height), 1.0);
        lower.add_row(frame, clamp_coord(first_row, d, frame.height), 1.0);
    }

    let mut upper_prefix = PrefixSums::new(padded_width, cc);
    let mut lower_prefix = PrefixSums::new(padded_width, cc);

    for (i, out_row) in band.chunks_mut(row_len).enumerate() {
        cancel.check()?;
        let y = first_row + i;

        if i > 0 {
            upper.add_row(frame, y, 1.0);
            upper.add_row(frame, clamp_coord(y, -ri - 1, frame.height), -1.0);
            lower.add_row(frame, clamp_coord(y, ri, frame.height), 1.0);
            lower.add_row(frame, y - 1, -1.0);
        }

        upper_prefix.rebuild(&upper);
        lower_prefix.rebuild(&lower);

        for x in 0..frame.width {
            // Padded columns x..=x+r hold dx <= 0, x+r..=x+2r hold dx >= 0.
            let quadrants = [
                upper_prefix.quadrant(x, x + r, count),
                upper_prefix.quadrant(x + r, x + 2 * r, count),
                lower_prefix.quadrant(x, x + r, count),
                lower_prefix.quadrant(x + r, x + 2 * r, count),
            ];
            let selection = select_mean(&quadrants, cc);
            let mean = match frame.tie_tolerance {
                Some(tolerance) if selection.gap <= tolerance => direct_pixel(frame, x, y),
                _ => selection.mean,
            };
            frame.store(x, y, &mean, out_row);
        }
    }

    Ok(())
}

// ============================================================================
// Public API
// ============================================================================

/// Apply the Kuwahara filter.
///
/// # Arguments
/// * `input` - Image with 1, 3, or 4 channels (height, width, channels)
/// * `params` - Radius and method
/// * `cancel` - Polled once per output row
///
/// # Returns
/// Filtered image with the same shape; alpha (if present) is copied
/// unchanged.
///
/// # Errors
/// - [`FilterError::InvalidImage`] for empty images, unsupported channel
///   counts or non-finite samples
/// - [`FilterError::Cancelled`] when `cancel` fires; no partial output is returned
/// - [`FilterError::OutOfMemory`] when the output cannot be allocated
pub fn kuwahara<T: Sample>(
    input: ArrayView3<T>,
    params: &KuwaharaParams,
    cancel: &CancelToken,
) -> Result<Array3<T>, FilterError> {
    let (height, width, channels) = input.dim();
    validate_dims(height, width, channels)?;

    log::trace!(
        "kuwahara {}x{}x{} radius={} method={:?}",
        width,
        height,
        channels,
        params.radius,
        params.method
    );

    let samples = contiguous_samples(&input)?;
    let src: &[T] = &samples;
    if src.par_iter().any(|v| !v.is_finite()) {
        return Err(FilterError::InvalidImage(
            "image contains NaN or infinite samples".to_string(),
        ));
    }

    let color_channels = color_channels(channels);
    let tie_tolerance = if T::EXACT_SUMS || params.method == KuwaharaMethod::Direct {
        None
    } else {
        let peak = src
            .par_iter()
            .map(|v| v.to_f64().abs())
            .reduce(|| 0.0, f64::max);
        Some(TIE_TOLERANCE * peak * peak * color_channels as f64)
    };

    let frame = Frame {
        src,
        width,
        height,
        channels,
        color_channels,
        radius: params.radius as usize,
        tie_tolerance,
    };

    let row_len = width * channels;
    let mut output = try_alloc::<T>(row_len * height)?;

    match params.method {
        KuwaharaMethod::Direct => {
            output
                .par_chunks_mut(row_len)
                .enumerate()
                .try_for_each(|(y, out_row)| {
                    cancel.check()?;
                    direct_row(&frame, y, out_row);
                    Ok::<(), FilterError>(())
                })?;
        }
        KuwaharaMethod::SlidingWindow => {
            output
                .par_chunks_mut(row_len * BAND_ROWS)
                .enumerate()
                .try_for_each(|(band, chunk)| {
                    sliding_band(&frame, band * BAND_ROWS, chunk, cancel)
                })?;
        }
    }

    Ok(Array3::from_shape_vec((height, width, channels), output)?)
}

/// Apply the Kuwahara filter - u8 version.
pub fn kuwahara_u8(
    input: ArrayView3<u8>,
    params: &KuwaharaParams,
) -> Result<Array3<u8>, FilterError> {
    kuwahara(input, params, &CancelToken::new())
}

/// Apply the Kuwahara filter - f32 version.
///
/// Input/output values are 0.0-1.0.
pub fn kuwahara_f32(
    input: ArrayView3<f32>,
    params: &KuwaharaParams,
) -> Result<Array3<f32>, FilterError> {
    kuwahara(input, params, &CancelToken::new())
}

/// Apply the Kuwahara filter to a [`Raster`], producing a new raster.
pub fn kuwahara_raster<T: Sample>(
    raster: &Raster<T>,
    params: &KuwaharaParams,
    cancel: &CancelToken,
) -> Result<Raster<T>, FilterError> {
    Raster::from_array(kuwahara(raster.view(), params, cancel)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const METHODS: [KuwaharaMethod; 2] = [KuwaharaMethod::Direct, KuwaharaMethod::SlidingWindow];

    fn params(radius: i64, method: KuwaharaMethod) -> KuwaharaParams {
        KuwaharaParams::new(radius).unwrap().with_method(method)
    }

    fn rgba_from_fn(
        width: usize,
        height: usize,
        f: impl Fn(usize, usize) -> [u8; 4],
    ) -> Array3<u8> {
        Array3::from_shape_fn((height, width, 4), |(y, x, c)| f(x, y)[c])
    }

    fn random_u8(width: usize, height: usize, channels: usize, seed: u64) -> Array3<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array3::from_shape_simple_fn((height, width, channels), || rng.random::<u8>())
    }

    fn random_f32(width: usize, height: usize, channels: usize, seed: u64) -> Array3<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array3::from_shape_simple_fn((height, width, channels), || rng.random::<f32>())
    }

    /// Gray 5x5 test card with alpha 255.
    ///
    /// ```text
    /// 10 20 30 90 90
    /// 10 20 30 90 90
    /// 40 40 50 60 60
    /// 40 40 50 60 60
    /// 40 40 50 60 60
    /// ```
    fn test_card() -> Array3<u8> {
        const ROWS: [[u8; 5]; 5] = [
            [10, 20, 30, 90, 90],
            [10, 20, 30, 90, 90],
            [40, 40, 50, 60, 60],
            [40, 40, 50, 60, 60],
            [40, 40, 50, 60, 60],
        ];
        rgba_from_fn(5, 5, |x, y| {
            let v = ROWS[y][x];
            [v, v, v, 255]
        })
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    #[test]
    fn test_params_reject_negative_radius() {
        let err = KuwaharaParams::new(-1).unwrap_err();
        assert!(matches!(
            err,
            FilterError::InvalidParameter { name: "radius", .. }
        ));
    }

    #[test]
    fn test_params_radius_range() {
        assert_eq!(KuwaharaParams::new(0).unwrap().radius(), 0);
        assert_eq!(KuwaharaParams::new(64).unwrap().window_size(), 129);
        assert!(KuwaharaParams::new(65).is_err());
        assert!(KuwaharaParams::new(i64::MAX).is_err());
    }

    #[test]
    fn test_params_default() {
        let params = KuwaharaParams::default();
        assert_eq!(params.radius(), 15);
        assert_eq!(params.method(), KuwaharaMethod::Direct);
        assert_eq!(params.window_size(), 31);
    }

    #[test]
    fn test_params_from_intensity() {
        assert_eq!(KuwaharaParams::from_intensity(1.0).unwrap().radius(), 15);
        assert_eq!(KuwaharaParams::from_intensity(0.5).unwrap().radius(), 7);
        assert_eq!(KuwaharaParams::from_intensity(0.0).unwrap().radius(), 0);
        assert_eq!(KuwaharaParams::from_intensity(2.0).unwrap().radius(), 30);
        assert!(KuwaharaParams::from_intensity(-0.1).is_err());
        assert!(KuwaharaParams::from_intensity(f32::NAN).is_err());
        assert!(KuwaharaParams::from_intensity(f32::INFINITY).is_err());
        assert!(KuwaharaParams::from_intensity(5.0).is_err());
    }

    #[test]
    fn test_method_from_name() {
        assert_eq!(KuwaharaMethod::from_name("direct"), Ok(KuwaharaMethod::Direct));
        assert_eq!(
            KuwaharaMethod::from_name("sliding_window"),
            Ok(KuwaharaMethod::SlidingWindow)
        );
        assert!(KuwaharaMethod::from_name("fast").is_err());
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn test_rejects_empty_image() {
        let img = Array3::<u8>::zeros((0, 4, 4));
        let err = kuwahara_u8(img.view(), &KuwaharaParams::default()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_two_channel_image() {
        let img = Array3::<u8>::zeros((4, 4, 2));
        let err = kuwahara_u8(img.view(), &KuwaharaParams::default()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidImage(_)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let img = random_u8(16, 16, 4, 1);
        let cancel = CancelToken::new();
        cancel.cancel();

        for method in METHODS {
            let result = kuwahara(img.view(), &params(2, method), &cancel);
            assert_eq!(result, Err(FilterError::Cancelled));
        }
    }

    // ========================================================================
    // Properties
    // ========================================================================

    #[test]
    fn test_radius_zero_is_identity() {
        let img = random_u8(9, 7, 4, 2);
        for method in METHODS {
            let result = kuwahara_u8(img.view(), &params(0, method)).unwrap();
            assert_eq!(result, img);
        }

        let img = random_f32(9, 7, 3, 3);
        for method in METHODS {
            let result = kuwahara_f32(img.view(), &params(0, method)).unwrap();
            assert_eq!(result, img);
        }
    }

    #[test]
    fn test_flat_region_invariance_u8() {
        let img = rgba_from_fn(13, 11, |_, _| [173, 41, 99, 200]);
        for method in METHODS {
            for radius in [1, 2, 5, 15, 64] {
                let result = kuwahara_u8(img.view(), &params(radius, method)).unwrap();
                assert_eq!(result, img, "radius {} {:?}", radius, method);
            }
        }
    }

    #[test]
    fn test_flat_region_invariance_f32() {
        let img = Array3::from_shape_fn((10, 12, 4), |(_, _, c)| [0.3f32, 0.7, 0.1, 0.9][c]);
        for method in METHODS {
            for radius in [1, 3, 15] {
                let result = kuwahara_f32(img.view(), &params(radius, method)).unwrap();
                assert_eq!(result, img, "radius {} {:?}", radius, method);
            }
        }
    }

    #[test]
    fn test_dimensions_and_alpha_preserved() {
        let img = random_u8(17, 9, 4, 4);
        for method in METHODS {
            for radius in [1, 3, 8] {
                let result = kuwahara_u8(img.view(), &params(radius, method)).unwrap();
                assert_eq!(result.dim(), img.dim());
                for y in 0..9 {
                    for x in 0..17 {
                        assert_eq!(result[[y, x, 3]], img[[y, x, 3]]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let img = random_u8(31, 23, 4, 5);
        for method in METHODS {
            let p = params(4, method);
            let first = kuwahara_u8(img.view(), &p).unwrap();
            let second = kuwahara_u8(img.view(), &p).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_does_not_mutate_input() {
        let img = random_u8(8, 8, 4, 6);
        let copy = img.clone();
        let _ = kuwahara_u8(img.view(), &params(2, KuwaharaMethod::Direct)).unwrap();
        assert_eq!(img, copy);
    }

    // ========================================================================
    // Hand-computed samples (radius 1)
    // ========================================================================

    #[test]
    fn test_card_corners_clamp_to_edge() {
        let img = test_card();
        for method in METHODS {
            let result = kuwahara_u8(img.view(), &params(1, method)).unwrap();
            // The quadrant pointing out of the image collapses onto the corner
            // pixel itself. Zero padding would give 15 at (0, 0).
            assert_eq!(result[[0, 0, 0]], 10, "{:?}", method);
            assert_eq!(result[[0, 4, 0]], 90, "{:?}", method);
            assert_eq!(result[[4, 0, 0]], 40, "{:?}", method);
            assert_eq!(result[[4, 4, 0]], 60, "{:?}", method);
        }
    }

    #[test]
    fn test_card_edge_midpoints() {
        let img = test_card();
        for method in METHODS {
            let result = kuwahara_u8(img.view(), &params(1, method)).unwrap();
            // Top (2, 0): A = {20, 30, 20, 30}, variance 25, beats B/D (900); A before C.
            assert_eq!(result[[0, 2, 0]], 25, "{:?}", method);
            // Left (0, 2): C = four 40s, variance 0.
            assert_eq!(result[[2, 0, 0]], 40, "{:?}", method);
            // Bottom (2, 4): all quadrants have variance 25, A wins the tie.
            assert_eq!(result[[4, 2, 0]], 45, "{:?}", method);
            // Right (4, 1): A = four 90s.
            assert_eq!(result[[1, 4, 0]], 90, "{:?}", method);
        }
    }

    #[test]
    fn test_card_center() {
        let img = test_card();
        for method in METHODS {
            let result = kuwahara_u8(img.view(), &params(1, method)).unwrap();
            // A = 125, B = 468.75, C = D = 25 per channel; C comes first.
            assert_eq!(result[[2, 2, 0]], 45, "{:?}", method);
            assert_eq!(result[[2, 2, 1]], 45);
            assert_eq!(result[[2, 2, 2]], 45);
            assert_eq!(result[[2, 2, 3]], 255);
        }
    }

    #[test]
    fn test_card_f32() {
        let img = test_card().mapv(|v| v as f32 / 255.0);
        for method in METHODS {
            let result = kuwahara_f32(img.view(), &params(1, method)).unwrap();
            assert_abs_diff_eq!(result[[0, 0, 0]], 10.0 / 255.0, epsilon = 1e-6);
            assert_abs_diff_eq!(result[[0, 2, 0]], 25.0 / 255.0, epsilon = 1e-6);
            assert_abs_diff_eq!(result[[2, 0, 0]], 40.0 / 255.0, epsilon = 1e-6);
            assert_abs_diff_eq!(result[[0, 2, 3]], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_red_block_keeps_pure_quadrant() {
        // 2x2 red block in the top-left corner of a green 4x4 image.
        let img = rgba_from_fn(4, 4, |x, y| {
            if x < 2 && y < 2 {
                [255, 0, 0, 255]
            } else {
                [0, 255, 0, 255]
            }
        });

        for method in METHODS {
            let result = kuwahara_u8(img.view(), &params(1, method)).unwrap();
            assert_eq!(
                [result[[1, 1, 0]], result[[1, 1, 1]], result[[1, 1, 2]]],
                [255, 0, 0],
                "{:?}",
                method
            );
        }
    }

    #[test]
    fn test_step_edge_is_not_blended() {
        let left = [200u8, 30, 30, 255];
        let right = [20u8, 40, 220, 255];
        let img = rgba_from_fn(16, 8, |x, _| if x < 8 { left } else { right });

        for method in METHODS {
            for radius in [2, 3, 5] {
                let result = kuwahara_u8(img.view(), &params(radius, method)).unwrap();
                for y in 0..8 {
                    for x in 0..16 {
                        let px = [
                            result[[y, x, 0]],
                            result[[y, x, 1]],
                            result[[y, x, 2]],
                            result[[y, x, 3]],
                        ];
                        assert!(
                            px == left || px == right,
                            "blended pixel {:?} at ({}, {})",
                            px,
                            x,
                            y
                        );
                        if x + (radius as usize) < 8 || x > 7 + radius as usize {
                            let expected = if x < 8 { left } else { right };
                            assert_eq!(px, expected);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_grayscale_channel() {
        let img = Array3::from_shape_fn((6, 6, 1), |(_, x, _)| if x < 3 { 10u8 } else { 250 });
        for method in METHODS {
            let result = kuwahara_u8(img.view(), &params(2, method)).unwrap();
            assert!(result.iter().all(|&v| v == 10 || v == 250));
            assert_eq!(result[[3, 0, 0]], 10);
            assert_eq!(result[[3, 5, 0]], 250);
        }
    }

    #[test]
    fn test_non_standard_layout_input() {
        let img = random_u8(6, 6, 3, 7);
        let mut transposed = img.clone();
        transposed.swap_axes(0, 1);
        let standard = transposed.as_standard_layout().into_owned();

        let p = params(2, KuwaharaMethod::Direct);
        let a = kuwahara_u8(transposed.view(), &p).unwrap();
        let b = kuwahara_u8(standard.view(), &p).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_raster_entry_point() {
        let raster = Raster::new(5, 5, 4, test_card().into_raw_vec_and_offset().0).unwrap();
        let result = kuwahara_raster(&raster, &params(1, KuwaharaMethod::Direct), &CancelToken::new())
            .unwrap();
        assert_eq!(result.width(), 5);
        assert_eq!(result.height(), 5);
        assert_eq!(result.get(2, 2, 0), Some(45));
    }

    // ========================================================================
    // Sliding window equivalence
    // ========================================================================

    #[test]
    fn test_sliding_window_matches_direct_u8() {
        for (channels, seed) in [(1, 10), (3, 11), (4, 12)] {
            let img = random_u8(23, 41, channels, seed);
            for radius in [1, 2, 5, 9, 30] {
                let direct = kuwahara_u8(img.view(), &params(radius, KuwaharaMethod::Direct)).unwrap();
                let sliding =
                    kuwahara_u8(img.view(), &params(radius, KuwaharaMethod::SlidingWindow)).unwrap();
                assert_eq!(direct, sliding, "channels {} radius {}", channels, radius);
            }
        }
    }

    #[test]
    fn test_sliding_window_matches_direct_f32() {
        let img = random_f32(19, 37, 4, 13);
        for radius in [1, 3, 7] {
            let direct = kuwahara_f32(img.view(), &params(radius, KuwaharaMethod::Direct)).unwrap();
            let sliding =
                kuwahara_f32(img.view(), &params(radius, KuwaharaMethod::SlidingWindow)).unwrap();
            for (a, b) in direct.iter().zip(sliding.iter()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_sliding_window_matches_direct_on_tied_quadrants() {
        // Repeating tiles give many pixels whose best quadrants have equal
        // dispersion; both methods must resolve them the same way.
        let levels = [0.1f32, 0.3, 0.7, 0.9];
        for channels in [3, 4] {
            let img = Array3::from_shape_fn((40, 40, channels), |(y, x, c)| {
                levels[(x / 3 + 2 * (y / 2) + c) % 4]
            });
            for radius in 1..=5 {
                let direct =
                    kuwahara_f32(img.view(), &params(radius, KuwaharaMethod::Direct)).unwrap();
                let sliding =
                    kuwahara_f32(img.view(), &params(radius, KuwaharaMethod::SlidingWindow))
                        .unwrap();
                for (a, b) in direct.iter().zip(sliding.iter()) {
                    assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_rejects_non_finite_samples() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut img = Array3::from_elem((5, 5, 4), 0.5f32);
            img[[2, 2, 0]] = bad;
            for method in METHODS {
                let err = kuwahara_f32(img.view(), &params(1, method)).unwrap_err();
                assert!(matches!(err, FilterError::InvalidImage(_)));
            }
        }
    }

    #[test]
    fn test_radius_larger_than_image() {
        let img = random_u8(3, 2, 4, 14);
        let direct = kuwahara_u8(img.view(), &params(64, KuwaharaMethod::Direct)).unwrap();
        let sliding = kuwahara_u8(img.view(), &params(64, KuwaharaMethod::SlidingWindow)).unwrap();
        assert_eq!(direct.dim(), (2, 3, 4));
        assert_eq!(direct, sliding);
    }

    // ========================================================================
    // Cost scenarios
    // ========================================================================

    #[test]
    fn test_radius_sweep_keeps_dimensions() {
        let img = random_u8(40, 30, 4, 15);
        for radius in 1..=30 {
            let result = kuwahara_u8(img.view(), &params(radius, KuwaharaMethod::Direct)).unwrap();
            assert_eq!(result.dim(), img.dim());
        }
    }

    #[test]
    fn test_max_radius_on_large_image() {
        let img = rgba_from_fn(2000, 2000, |x, y| {
            [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255]
        });
        let result =
            kuwahara_u8(img.view(), &params(64, KuwaharaMethod::SlidingWindow)).unwrap();
        assert_eq!(result.dim(), (2000, 2000, 4));
        assert!(result.iter().skip(3).step_by(4).all(|&a| a == 255));
    }
}
