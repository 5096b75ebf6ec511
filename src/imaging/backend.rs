//! Image processor trait and shared types.
//!
//! The [`ImageProcessor`] trait defines the two operations the placeholder
//! pipeline needs: read dimensions, and produce a small encoded raster.
//!
//! | Implementation | Use |
//! |---|---|
//! | [`RustProcessor`](super::rust_backend::RustProcessor) | default, pure Rust via the `image` crate |
//! | [`MagickProcessor`](super::magick_backend::MagickProcessor) | ImageMagick subprocess with a deadline |
//! | [`FixedProcessor`](super::fixed_backend::FixedProcessor) | deterministic, no decoding; for tests |

use super::params::PlaceholderParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0}")]
    Unsupported(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("{tool} timed out after {}s", .after.as_secs())]
    Timeout { tool: String, after: Duration },
}

/// Pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// An encoded placeholder raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type of `bytes`, e.g. `image/png`.
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Cached placeholder: the data URI plus the *source* image dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    pub placeholder_data_uri: String,
    pub width: u32,
    pub height: u32,
}

/// Trait for placeholder-generating backends.
///
/// Backends must be `Sync`: the pipeline calls them from rayon workers.
pub trait ImageProcessor: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, ProcessorError>;

    /// Downscale, blur and encode a placeholder for `path`.
    fn placeholder(
        &self,
        path: &Path,
        params: &PlaceholderParams,
    ) -> Result<EncodedImage, ProcessorError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock processor that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockProcessor {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Placeholder {
            source: String,
            width: u32,
            height: u32,
            blur: u32,
        },
    }

    impl MockProcessor {
        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageProcessor for MockProcessor {
        fn identify(&self, path: &Path) -> Result<Dimensions, ProcessorError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ProcessorError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn placeholder(
            &self,
            path: &Path,
            params: &PlaceholderParams,
        ) -> Result<EncodedImage, ProcessorError> {
            self.operations.lock().unwrap().push(RecordedOp::Placeholder {
                source: path.to_string_lossy().to_string(),
                width: params.width,
                height: params.height,
                blur: params.blur,
            });
            Ok(EncodedImage {
                mime: "image/png".into(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            })
        }
    }

    #[test]
    fn mock_records_identify() {
        let processor = MockProcessor::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = processor.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = processor.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_identify_without_results_errors() {
        let processor = MockProcessor::default();
        assert!(processor.identify(Path::new("/x.png")).is_err());
    }

    #[test]
    fn placeholder_serializes_camel_case() {
        let p = Placeholder {
            placeholder_data_uri: "data:image/png;base64,AA==".into(),
            width: 4,
            height: 3,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(
            json,
            r#"{"placeholderDataUri":"data:image/png;base64,AA==","width":4,"height":3}"#
        );
    }

    #[test]
    fn timeout_error_message() {
        let e = ProcessorError::Timeout {
            tool: "magick".into(),
            after: Duration::from_secs(30),
        };
        assert_eq!(e.to_string(), "magick timed out after 30s");
    }
}
