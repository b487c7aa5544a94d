//! Filter modules for the oil paint effect.
//!
//! ## Supported Formats
//!
//! All filters accept images with 1, 3, or 4 channels:
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Grayscale8 | (H, W, 1) | u8 | Single luminance channel, 0-255 |
//! | Grayscale float | (H, W, 1) | f32 | Single luminance channel, 0.0-1.0 |
//! | RGB8 | (H, W, 3) | u8 | Red, green, blue, 0-255 |
//! | RGB float | (H, W, 3) | f32 | Red, green, blue, 0.0-1.0 |
//! | RGBA8 | (H, W, 4) | u8 | RGB + alpha, 0-255 |
//! | RGBA float | (H, W, 4) | f32 | RGB + alpha, 0.0-1.0 |
//!
//! ## Architecture
//!
//! - **Multi-channel aware** - Handles 1, 3, or 4 channels
//! - **Dual precision** - u8 and f32 share one generic implementation via [`core::Sample`]
//! - **Alpha preservation** - Alpha channel (if present) is copied unchanged
//! - **Clamp-to-edge** - Samples outside the image use the nearest edge pixel
//! - **Parallel** - Rows are distributed over the rayon thread pool
//! - **Fallible** - Invalid input is reported as [`crate::FilterError`], never a panic

pub mod core;
pub mod kuwahara;
pub mod raster;
pub mod resize;
