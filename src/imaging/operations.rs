//! High-level image operations.
//!
//! These functions combine calculations with processor execution.
//! They take configuration, compute parameters, and call the processor.

use super::backend::{EncodedImage, ImageProcessor, Placeholder, ProcessorError};
use super::calculations::calculate_placeholder_dimensions;
use super::params::PlaceholderParams;
use crate::config::ImageConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Get image dimensions using the processor.
pub fn get_dimensions<P: ImageProcessor + ?Sized>(processor: &P, path: &Path) -> Result<(u32, u32)> {
    let dims = processor.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Plan the placeholder raster for a source of `dims` (pure, no I/O).
pub fn plan_placeholder(dims: (u32, u32), config: &ImageConfig) -> PlaceholderParams {
    let (width, height) = calculate_placeholder_dimensions(dims, config.placeholder_size);
    PlaceholderParams {
        width,
        height,
        blur: config.blur,
    }
}

/// Encode raster bytes as a `data:` URI.
pub fn to_data_uri(image: &EncodedImage) -> String {
    format!("data:{};base64,{}", image.mime, STANDARD.encode(&image.bytes))
}

/// Identify `source`, render its placeholder, and package the result.
///
/// The returned dimensions are those of the source image, not the raster.
pub fn generate_placeholder<P: ImageProcessor + ?Sized>(
    processor: &P,
    source: &Path,
    config: &ImageConfig,
) -> Result<Placeholder> {
    let (width, height) = get_dimensions(processor, source)?;
    let params = plan_placeholder((width, height), config);
    let encoded = processor.placeholder(source, &params)?;
    Ok(Placeholder {
        placeholder_data_uri: to_data_uri(&encoded),
        width,
        height,
    })
}
