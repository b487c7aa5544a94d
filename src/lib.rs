//! Oil paint (Kuwahara) filter
//!
//! Edge-preserving smoothing for in-memory images, with Python bindings via
//! PyO3 and WASM bindings for JavaScript.
//!
//! ## Image Format
//! Filters support multiple channel configurations:
//! - **Grayscale**: (height, width, 1) - single channel
//! - **RGB**: (height, width, 3) - 3 color channels
//! - **RGBA**: (height, width, 4) - 3 color channels + alpha
//!
//! Both bit depths are supported:
//! - `u8`: 8-bit per channel (0-255)
//! - `f32`: Float per channel (0.0-1.0)
//!
//! ## Example
//!
//! ```
//! use ndarray::Array3;
//! use oilpaint_rust::{kuwahara_u8, KuwaharaParams};
//!
//! let image = Array3::<u8>::from_elem((8, 8, 4), 128);
//! let params = KuwaharaParams::new(3).unwrap();
//! let painted = kuwahara_u8(image.view(), &params).unwrap();
//! assert_eq!(painted.dim(), (8, 8, 4));
//! ```
//!
//! ## Layers
//! - [`filters`]: the kernel, raster adaptation and resizing
//! - [`gallery`]: resize-then-filter batches across filter variants or images

pub mod error;
pub mod filters;
pub mod gallery;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::FilterError;
pub use filters::core::{CancelToken, Sample};
pub use filters::kuwahara::{
    kuwahara, kuwahara_f32, kuwahara_raster, kuwahara_u8, KuwaharaMethod, KuwaharaParams,
    DEFAULT_RADIUS, MAX_RADIUS,
};
pub use filters::raster::Raster;
pub use gallery::{
    apply_to_batch, default_gallery, render_gallery, FilteredImage, GalleryFilter, GalleryOptions,
};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::{PyMemoryError, PyRuntimeError, PyValueError};
    use pyo3::prelude::*;

    use crate::error::FilterError;
    use crate::filters::kuwahara::{
        kuwahara_f32 as kuwahara_f32_impl, kuwahara_u8, KuwaharaMethod, KuwaharaParams,
    };
    use crate::filters::raster::{f32_to_u8, u8_to_f32};
    use crate::filters::resize;

    impl From<FilterError> for PyErr {
        fn from(err: FilterError) -> PyErr {
            match err {
                FilterError::OutOfMemory { .. } => PyMemoryError::new_err(err.to_string()),
                FilterError::Cancelled => PyRuntimeError::new_err(err.to_string()),
                _ => PyValueError::new_err(err.to_string()),
            }
        }
    }

    fn params_for(radius: i64, method: &str) -> Result<KuwaharaParams, FilterError> {
        Ok(KuwaharaParams::new(radius)?.with_method(KuwaharaMethod::from_name(method)?))
    }

    // ========================================================================
    // Kuwahara Filter
    // ========================================================================

    /// Apply the Kuwahara (oil paint) filter to a u8 image.
    ///
    /// # Arguments
    /// * `image` - Input image (1, 3, or 4 channels)
    /// * `radius` - Window half-width, 0-64 (default: 15)
    /// * `method` - "direct" or "sliding_window"
    #[pyfunction]
    #[pyo3(signature = (image, radius=15, method="direct"))]
    pub fn kuwahara<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        radius: i64,
        method: &str,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let params = params_for(radius, method)?;
        let result = kuwahara_u8(image.as_array(), &params)?;
        Ok(result.into_pyarray(py))
    }

    /// Apply the Kuwahara filter to an f32 image.
    ///
    /// Input/output values are 0.0-1.0.
    #[pyfunction]
    #[pyo3(signature = (image, radius=15, method="direct"))]
    pub fn kuwahara_f32<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
        radius: i64,
        method: &str,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        let params = params_for(radius, method)?;
        let result = kuwahara_f32_impl(image.as_array(), &params)?;
        Ok(result.into_pyarray(py))
    }

    /// Apply the Kuwahara filter with radius derived from an intensity.
    ///
    /// Intensity 1.0 corresponds to radius 15.
    #[pyfunction]
    #[pyo3(signature = (image, intensity=1.0))]
    pub fn kuwahara_intensity<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        intensity: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let params = KuwaharaParams::from_intensity(intensity)?;
        let result = kuwahara_u8(image.as_array(), &params)?;
        Ok(result.into_pyarray(py))
    }

    // ========================================================================
    // Resize
    // ========================================================================

    /// Shrink an image so its longer side is at most `max_dimension`.
    #[pyfunction]
    #[pyo3(signature = (image, max_dimension=1000))]
    pub fn resize_to_fit<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        max_dimension: usize,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let result = resize::resize_to_fit(image.as_array(), max_dimension)?;
        Ok(result.into_pyarray(py))
    }

    /// Shrink an f32 image so its longer side is at most `max_dimension`.
    #[pyfunction]
    #[pyo3(signature = (image, max_dimension=1000))]
    pub fn resize_to_fit_f32<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
        max_dimension: usize,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        let result = resize::resize_to_fit(image.as_array(), max_dimension)?;
        Ok(result.into_pyarray(py))
    }

    // ========================================================================
    // Conversion Utilities
    // ========================================================================

    /// Convert u8 image (0-255) to f32 (0.0-1.0)
    #[pyfunction]
    pub fn convert_u8_to_f32<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
    ) -> Bound<'py, PyArray3<f32>> {
        u8_to_f32(image.as_array()).into_pyarray(py)
    }

    /// Convert f32 image (0.0-1.0) to u8 (0-255)
    #[pyfunction]
    pub fn convert_f32_to_u8<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
    ) -> Bound<'py, PyArray3<u8>> {
        f32_to_u8(image.as_array()).into_pyarray(py)
    }

    /// Oil paint Rust extension module
    #[pymodule]
    pub fn oilpaint_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(kuwahara, m)?)?;
        m.add_function(wrap_pyfunction!(kuwahara_f32, m)?)?;
        m.add_function(wrap_pyfunction!(kuwahara_intensity, m)?)?;

        m.add_function(wrap_pyfunction!(resize_to_fit, m)?)?;
        m.add_function(wrap_pyfunction!(resize_to_fit_f32, m)?)?;

        m.add_function(wrap_pyfunction!(convert_u8_to_f32, m)?)?;
        m.add_function(wrap_pyfunction!(convert_f32_to_u8, m)?)?;

        m.add("DEFAULT_RADIUS", crate::DEFAULT_RADIUS)?;
        m.add("MAX_RADIUS", crate::MAX_RADIUS)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::oilpaint_rust;
