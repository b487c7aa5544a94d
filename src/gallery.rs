//! Batch application of filters for preview galleries.
//!
//! The gallery shows one rendition of the same photo per filter. The source
//! is shrunk once to the working size and every filter then runs on that
//! copy concurrently, each producing its own output image.
//!
//! Failures are not swallowed: the first error (including cancellation)
//! aborts the batch and is returned to the caller.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use crate::error::FilterError;
use crate::filters::core::{try_to_owned, CancelToken, Sample};
use crate::filters::kuwahara::{kuwahara, KuwaharaParams};
use crate::filters::raster::validate_dims;
use crate::filters::resize::{resize_to_fit, DEFAULT_MAX_DIMENSION};

/// A filter shown in the gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryFilter {
    /// The working copy, unfiltered.
    Original,
    /// Kuwahara smoothing.
    OilPaint(KuwaharaParams),
}

impl GalleryFilter {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            GalleryFilter::Original => "Original",
            GalleryFilter::OilPaint(_) => "Oil Paint",
        }
    }

    fn apply<T: Sample>(
        &self,
        input: ArrayView3<T>,
        cancel: &CancelToken,
    ) -> Result<Array3<T>, FilterError> {
        cancel.check()?;
        match self {
            GalleryFilter::Original => try_to_owned(input),
            GalleryFilter::OilPaint(params) => kuwahara(input, params, cancel),
        }
    }
}

/// The filters rendered for a freshly picked photo.
pub fn default_gallery() -> Vec<GalleryFilter> {
    vec![
        GalleryFilter::Original,
        GalleryFilter::OilPaint(KuwaharaParams::default()),
    ]
}

/// Settings for gallery rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryOptions {
    /// Longest side of the working copy in pixels.
    pub max_dimension: usize,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        GalleryOptions {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// One rendered gallery entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredImage<T> {
    pub filter: GalleryFilter,
    pub image: Array3<T>,
}

/// Render every filter in `filters` on a bounded working copy of `input`.
///
/// Results are returned in the order of `filters`.
pub fn render_gallery<T: Sample>(
    input: ArrayView3<T>,
    filters: &[GalleryFilter],
    options: &GalleryOptions,
    cancel: &CancelToken,
) -> Result<Vec<FilteredImage<T>>, FilterError> {
    let (height, width, channels) = input.dim();
    validate_dims(height, width, channels)?;

    let working = resize_to_fit(input, options.max_dimension)?;
    log::debug!(
        "rendering {} gallery filters on {}x{} working copy",
        filters.len(),
        working.dim().1,
        working.dim().0
    );

    let results = filters
        .par_iter()
        .map(|filter| -> Result<FilteredImage<T>, FilterError> {
            let image = filter.apply(working.view(), cancel)?;
            log::debug!("gallery filter {:?} done", filter);
            Ok(FilteredImage {
                filter: *filter,
                image,
            })
        })
        .collect::<Result<Vec<_>, FilterError>>();

    if let Err(ref err) = results {
        log::debug!("gallery rendering stopped: {}", err);
    }
    results
}

/// Apply one filter to a batch of images.
///
/// Each image is bounded to `options.max_dimension` first. Results keep the
/// order of `images`.
pub fn apply_to_batch<T: Sample>(
    images: &[ArrayView3<T>],
    filter: &GalleryFilter,
    options: &GalleryOptions,
    cancel: &CancelToken,
) -> Result<Vec<Array3<T>>, FilterError> {
    log::debug!("applying {} to {} images", filter.name(), images.len());

    images
        .par_iter()
        .map(|image| {
            cancel.check()?;
            let working = resize_to_fit(image.view(), options.max_dimension)?;
            filter.apply(working.view(), cancel)
        })
        .collect()
}
