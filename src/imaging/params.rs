//! Parameter types for placeholder generation.
//!
//! These structs describe *what* to produce, not *how*. The
//! [`operations`](super::operations) module computes them from the source
//! dimensions and the configured placeholder size; a
//! [`backend`](super::backend) turns them into pixels.

/// Exact raster size and blur for one placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderParams {
    pub width: u32,
    pub height: u32,
    /// Configured blur radius in CSS pixels.
    pub blur: u32,
}

impl PlaceholderParams {
    /// Gaussian sigma applied to the raster itself.
    ///
    /// The raster is tiny and stretched by the browser, so only a light blur
    /// is baked in; the CSS `filter: blur()` does the rest. Zero disables it.
    pub fn raster_sigma(&self) -> f32 {
        if self.blur == 0 {
            0.0
        } else {
            (self.blur as f32 / 10.0).clamp(0.3, 4.0)
        }
    }
}
