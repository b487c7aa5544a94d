//! WebAssembly exports for the oil paint filter.
//!
//! These functions are exposed to JavaScript via wasm-bindgen and operate on
//! flat RGBA buffers as returned by `CanvasRenderingContext2D.getImageData`.
//!
//! ## Bit Depth Support
//!
//! - **u8**: 8-bit per channel (0-255), standard for web/display
//! - **f32**: Float per channel (0.0-1.0), for HDR/linear workflows

use wasm_bindgen::prelude::*;

use crate::filters::core::CancelToken;
use crate::filters::kuwahara::{kuwahara_raster, KuwaharaMethod, KuwaharaParams};
use crate::filters::raster::Raster;
use crate::FilterError;

fn to_js_error(err: FilterError) -> JsError {
    JsError::new(&err.to_string())
}

fn params_for(radius: i32, sliding_window: bool) -> Result<KuwaharaParams, FilterError> {
    let method = if sliding_window {
        KuwaharaMethod::SlidingWindow
    } else {
        KuwaharaMethod::Direct
    };
    Ok(KuwaharaParams::new(radius as i64)?.with_method(method))
}

/// Apply the Kuwahara filter to RGBA u8 pixels.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `radius` - Window half-width (0-64)
/// * `sliding_window` - Use the accelerated method
///
/// # Returns
/// Flat array of RGBA bytes, alpha unchanged
#[wasm_bindgen]
pub fn kuwahara_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    radius: i32,
    sliding_window: bool,
) -> Result<Vec<u8>, JsError> {
    let params = params_for(radius, sliding_window).map_err(to_js_error)?;
    let input = Raster::new(width, height, 4, data.to_vec()).map_err(to_js_error)?;
    let result = kuwahara_raster(&input, &params, &CancelToken::new()).map_err(to_js_error)?;
    Ok(result.into_vec())
}

/// Apply the Kuwahara filter to RGBA f32 pixels (0.0-1.0).
#[wasm_bindgen]
pub fn kuwahara_rgba_f32_wasm(
    data: &[f32],
    width: usize,
    height: usize,
    radius: i32,
    sliding_window: bool,
) -> Result<Vec<f32>, JsError> {
    let params = params_for(radius, sliding_window).map_err(to_js_error)?;
    let input = Raster::new(width, height, 4, data.to_vec()).map_err(to_js_error)?;
    let result = kuwahara_raster(&input, &params, &CancelToken::new()).map_err(to_js_error)?;
    Ok(result.into_vec())
}
