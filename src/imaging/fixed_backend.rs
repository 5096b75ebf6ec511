//! Deterministic processor that never decodes anything.
//!
//! Reports the same dimensions for every file and returns a constant 1x1
//! PNG. Useful for integration tests and for dry runs where image bytes do
//! not matter but the HTML rewrite does.

use super::backend::{Dimensions, EncodedImage, ImageProcessor, ProcessorError};
use super::params::PlaceholderParams;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 1x1 transparent PNG.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

#[derive(Debug)]
pub struct FixedProcessor {
    dimensions: Dimensions,
    fail_on: Option<String>,
    placeholder_calls: AtomicUsize,
}

impl FixedProcessor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: Dimensions { width, height },
            fail_on: None,
            placeholder_calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call whose path contains `needle`.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Number of placeholders produced so far.
    pub fn placeholder_calls(&self) -> usize {
        self.placeholder_calls.load(Ordering::SeqCst)
    }

    fn check(&self, path: &Path) -> Result<(), ProcessorError> {
        match &self.fail_on {
            Some(needle) if path.to_string_lossy().contains(needle.as_str()) => Err(
                ProcessorError::ProcessingFailed(format!("refusing {}", path.display())),
            ),
            _ => Ok(()),
        }
    }
}

impl Default for FixedProcessor {
    fn default() -> Self {
        Self::new(1600, 900)
    }
}

impl ImageProcessor for FixedProcessor {
    fn identify(&self, path: &Path) -> Result<Dimensions, ProcessorError> {
        self.check(path)?;
        Ok(self.dimensions)
    }

    fn placeholder(
        &self,
        path: &Path,
        _params: &PlaceholderParams,
    ) -> Result<EncodedImage, ProcessorError> {
        self.check(path)?;
        self.placeholder_calls.fetch_add(1, Ordering::SeqCst);
        Ok(EncodedImage {
            mime: "image/png".to_string(),
            bytes: TINY_PNG.to_vec(),
        })
    }
}
