//! Pure Rust placeholder backend. No external tools.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only, no full decode) |
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image` crate decoders |
//! | Downscale | `DynamicImage::resize_exact` with `Triangle` filter |
//! | Blur | `DynamicImage::blur` (Gaussian) |
//! | Encode | PNG via `DynamicImage::write_to` |

use super::backend::{Dimensions, EncodedImage, ImageProcessor, ProcessorError};
use super::params::PlaceholderParams;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Extensions whose decoders are compiled in.
const DECODABLE: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

fn check_supported(path: &Path) -> Result<(), ProcessorError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if DECODABLE
        .iter()
        .any(|(known, fmt)| *known == ext && fmt.reading_enabled())
    {
        Ok(())
    } else {
        Err(ProcessorError::Unsupported(path.display().to_string()))
    }
}

/// Pure Rust backend using the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustProcessor;

impl RustProcessor {
    pub fn new() -> Self {
        Self
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, ProcessorError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            ProcessorError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

impl ImageProcessor for RustProcessor {
    fn identify(&self, path: &Path) -> Result<Dimensions, ProcessorError> {
        check_supported(path)?;
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            ProcessorError::ProcessingFailed(format!(
                "Failed to read dimensions of {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Dimensions { width, height })
    }

    fn placeholder(
        &self,
        path: &Path,
        params: &PlaceholderParams,
    ) -> Result<EncodedImage, ProcessorError> {
        check_supported(path)?;
        let img = load_image(path)?;
        let small = img.resize_exact(params.width, params.height, FilterType::Triangle);
        let sigma = params.raster_sigma();
        let blurred = if sigma > 0.0 { small.blur(sigma) } else { small };

        let mut bytes = Vec::new();
        blurred
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| {
                ProcessorError::ProcessingFailed(format!(
                    "Failed to encode placeholder for {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(EncodedImage {
            mime: "image/png".to_string(),
            bytes,
        })
    }
}
