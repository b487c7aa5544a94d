//! Core utilities shared by the oil paint filters.
//!
//! This module provides:
//! - The [`Sample`] trait mapping u8 and f32 channel values into the f64
//!   accumulation domain and back
//! - Clamp-to-edge coordinate helper
//! - [`CancelToken`] for cooperative cancellation
//! - Fallible allocation of output buffers and of row-major copies

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array3, ArrayView3};

use crate::error::FilterError;

/// A channel value that filters can read and write.
///
/// Values are accumulated in f64. For u8 the raw 0-255 value is used so
/// sums of samples and of squared samples stay exact integers.
pub trait Sample: Copy + Default + Send + Sync + 'static {
    /// Sums and sums of squares of these samples are exact in f64.
    const EXACT_SUMS: bool;

    /// Convert to the accumulation domain.
    fn to_f64(self) -> f64;

    /// Convert back from the accumulation domain.
    ///
    /// u8 rounds to nearest and saturates; f32 narrows.
    fn from_f64(value: f64) -> Self;

    /// Whether the value is usable by the filters (not NaN or infinite).
    #[inline]
    fn is_finite(self) -> bool {
        true
    }
}

impl Sample for u8 {
    const EXACT_SUMS: bool = true;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, 255.0) as u8
    }
}

impl Sample for f32 {
    const EXACT_SUMS: bool = false;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
}

/// Number of color channels for a given channel count.
///
/// RGBA images carry alpha in the last channel, which filters copy through.
#[inline]
pub fn color_channels(channels: usize) -> usize {
    if channels == 4 {
        3
    } else {
        channels
    }
}

/// Clamp `base + offset` into `[0, len)`.
#[inline]
pub fn clamp_coord(base: usize, offset: isize, len: usize) -> usize {
    (base as isize + offset).clamp(0, len as isize - 1) as usize
}

/// Shared flag used to abort a running filter.
///
/// Clones observe the same flag, so one clone can be handed to a worker
/// while the caller keeps another to cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Return `Err(FilterError::Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), FilterError> {
        if self.is_cancelled() {
            Err(FilterError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Allocate a buffer of `len` default samples, reporting allocation failure
/// instead of aborting.
pub(crate) fn try_alloc<T: Sample>(len: usize) -> Result<Vec<T>, FilterError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| FilterError::OutOfMemory {
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    buffer.resize(len, T::default());
    Ok(buffer)
}

fn try_copy_samples<T: Sample>(input: &ArrayView3<'_, T>) -> Result<Vec<T>, FilterError> {
    let mut buffer = try_alloc::<T>(input.len())?;
    for (dst, src) in buffer.iter_mut().zip(input.iter()) {
        *dst = *src;
    }
    Ok(buffer)
}

/// Samples of `input` in row-major order.
///
/// Borrows when the view is already contiguous in standard layout, otherwise
/// copies into a buffer obtained from [`try_alloc`].
pub(crate) fn contiguous_samples<'a, T: Sample>(
    input: &ArrayView3<'a, T>,
) -> Result<Cow<'a, [T]>, FilterError> {
    match input.to_slice() {
        Some(samples) => Ok(Cow::Borrowed(samples)),
        None => Ok(Cow::Owned(try_copy_samples(input)?)),
    }
}

/// Owned standard-layout copy of `input`, reporting allocation failure.
pub(crate) fn try_to_owned<T: Sample>(input: ArrayView3<'_, T>) -> Result<Array3<T>, FilterError> {
    let buffer = try_copy_samples(&input)?;
    Ok(Array3::from_shape_vec(input.dim(), buffer)?)
}
