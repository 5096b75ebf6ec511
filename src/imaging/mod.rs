//! Placeholder image generation.
//!
//! | Operation | Rust backend | Magick backend |
//! |---|---|---|
//! | **Identify** | `image::image_dimensions` | `identify -format "%w %h"` |
//! | **Downscale** | `resize_exact` (Triangle) | `-resize WxH!` |
//! | **Blur** | `DynamicImage::blur` | `-blur 0xσ` |
//! | **Encode** | PNG | `png:-` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageProcessor`] trait + [`RustProcessor`], [`MagickProcessor`], [`FixedProcessor`]
//! - **Operations**: High-level functions combining calculations + processor

pub mod backend;
mod calculations;
pub mod fixed_backend;
pub mod magick_backend;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{Dimensions, EncodedImage, ImageProcessor, Placeholder, ProcessorError};
pub use calculations::{aspect_ratio, calculate_placeholder_dimensions};
pub use fixed_backend::FixedProcessor;
pub use magick_backend::MagickProcessor;
pub use operations::{generate_placeholder, get_dimensions, plan_placeholder, to_data_uri};
pub use params::PlaceholderParams;
pub use rust_backend::RustProcessor;
