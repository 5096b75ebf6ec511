//! Build configuration.
//!
//! Configuration is layered: stock defaults, then `forge.toml`, then command
//! line overrides. Each layer is a sparse TOML table merged on top of the one
//! below ([`merge_toml`]), and the result is deserialized once into
//! [`BuildConfig`], normalized, and validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! routes = "routes.json"        # Route table (.json array or .toml [[routes]])
//! template = "dist/index.html"  # HTML template (built or source form)
//! output_dir = "dist"
//! base_url = "https://example.com"   # Trailing slash is stripped
//! generate_sitemap = true       # sitemap.xml + robots.txt (if absent)
//! use_trailing_slash = false    # Canonical URLs end in "/"
//! verbose = false
//! ssg_cache_dir = ".routerino-cache"
//! # not_found = "pages/404.md"  # Renderable file for 404.html
//! image_tool = "builtin"        # "builtin" or "magick"
//! image_timeout_secs = 30       # Deadline per external tool call
//!
//! # optimize_images = true      # Either a bool...
//! [optimize_images]             # ...or a table (implies enabled)
//! placeholder_size = 20         # Placeholder height in pixels
//! blur = 10                     # Blur radius in pixels
//! min_size = 1024               # Skip images smaller than this (bytes)
//! max_size = 10485760           # Skip images larger than this (bytes)
//! # cache_dir = ".routerino-cache/images"
//!
//! [processing]
//! max_processes = 4             # Max parallel image workers (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "forge.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Global build parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Route table file.
    pub routes: PathBuf,
    /// HTML template file.
    pub template: PathBuf,
    /// Directory receiving generated pages.
    pub output_dir: PathBuf,
    /// Site origin. Never ends in `/` after [`BuildConfig::normalize`].
    pub base_url: String,
    pub generate_sitemap: bool,
    pub verbose: bool,
    /// Canonical URLs end with `/` when set.
    pub use_trailing_slash: bool,
    pub optimize_images: OptimizeImages,
    /// Root for persistent build caches.
    pub ssg_cache_dir: PathBuf,
    /// Renderable file used for `404.html`. Built-in markup when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found: Option<PathBuf>,
    pub image_tool: ImageTool,
    /// Deadline for each external image tool invocation.
    pub image_timeout_secs: u64,
    pub processing: ProcessingConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            routes: PathBuf::from("routes.json"),
            template: PathBuf::from("dist/index.html"),
            output_dir: PathBuf::from("dist"),
            base_url: String::new(),
            generate_sitemap: true,
            verbose: false,
            use_trailing_slash: false,
            optimize_images: OptimizeImages::Toggle(false),
            ssg_cache_dir: PathBuf::from(".routerino-cache"),
            not_found: None,
            image_tool: ImageTool::Builtin,
            image_timeout_secs: 30,
            processing: ProcessingConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Strip trailing slashes from `base_url`.
    pub fn normalize(&mut self) {
        let trimmed = self.base_url.trim_end_matches('/').len();
        self.base_url.truncate(trimmed);
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation("base_url is required".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.image_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "image_timeout_secs must be greater than zero".into(),
            ));
        }
        if let OptimizeImages::Settings(settings) = &self.optimize_images {
            if settings.placeholder_size == 0 {
                return Err(ConfigError::Validation(
                    "optimize_images.placeholder_size must be non-zero".into(),
                ));
            }
            if settings.min_size > settings.max_size {
                return Err(ConfigError::Validation(
                    "optimize_images.min_size must not exceed max_size".into(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve the effective image settings.
    pub fn image_config(&self) -> ImageConfig {
        let default_cache = self.ssg_cache_dir.join("images");
        match &self.optimize_images {
            OptimizeImages::Toggle(enabled) => ImageConfig {
                enabled: *enabled,
                cache_dir: default_cache,
                ..ImageConfig::from(&ImageSettings::default())
            },
            OptimizeImages::Settings(settings) => ImageConfig {
                cache_dir: settings.cache_dir.clone().unwrap_or(default_cache),
                ..ImageConfig::from(settings)
            },
        }
    }
}

/// `optimize_images = true` or `[optimize_images] ...`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptimizeImages {
    Toggle(bool),
    Settings(ImageSettings),
}

/// The `[optimize_images]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageSettings {
    pub enabled: bool,
    /// Placeholder height in pixels.
    pub placeholder_size: u32,
    /// Blur radius in pixels, applied to the placeholder raster and in CSS.
    pub blur: u32,
    /// Images smaller than this many bytes are left alone.
    pub min_size: u64,
    /// Images larger than this many bytes are left alone.
    pub max_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            placeholder_size: 20,
            blur: 10,
            min_size: 1024,
            max_size: 10 * 1024 * 1024,
            cache_dir: None,
        }
    }
}

/// Resolved image placeholder settings used by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageConfig {
    pub enabled: bool,
    pub placeholder_size: u32,
    pub blur: u32,
    pub min_size: u64,
    pub max_size: u64,
    pub cache_dir: PathBuf,
}

impl From<&ImageSettings> for ImageConfig {
    fn from(s: &ImageSettings) -> Self {
        Self {
            enabled: s.enabled,
            placeholder_size: s.placeholder_size,
            blur: s.blur,
            min_size: s.min_size,
            max_size: s.max_size,
            cache_dir: s.cache_dir.clone().unwrap_or_default(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".routerino-cache/images"),
            ..ImageConfig::from(&ImageSettings::default())
        }
    }
}

/// Which [`ImageProcessor`](crate::imaging::ImageProcessor) generates placeholders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageTool {
    /// Pure-Rust decoding and encoding via the `image` crate.
    #[default]
    Builtin,
    /// ImageMagick subprocess per image.
    Magick,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML table, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(BuildConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// A missing file is `Ok(None)` unless `required` is set.
pub fn load_raw_config(path: &Path, required: bool) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return if required {
            Err(ConfigError::NotFound(path.to_path_buf()))
        } else {
            Ok(None)
        };
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge layers onto stock defaults, then deserialize, normalize, and validate.
///
/// A `bool` overlay for `optimize_images` replaces a table from a lower layer
/// wholesale, which is what `--no-optimize-images` needs.
pub fn resolve_config(layers: Vec<toml::Value>) -> Result<BuildConfig, ConfigError> {
    let mut merged = stock_defaults_value()?;
    for layer in layers {
        merged = merge_toml(merged, layer);
    }
    let mut config: BuildConfig = merged.try_into()?;
    config.normalize();
    config.validate()?;
    Ok(config)
}

/// Load `path` (or `forge.toml` if none given) plus command-line overrides.
pub fn load_config(
    path: Option<&Path>,
    overrides: toml::Value,
) -> Result<BuildConfig, ConfigError> {
    let file = match path {
        Some(p) => load_raw_config(p, true)?,
        None => load_raw_config(Path::new(CONFIG_FILENAME), false)?,
    };
    let layers = file.into_iter().chain(std::iter::once(overrides)).collect();
    resolve_config(layers)
}

/// A documented stock `forge.toml`.
pub fn stock_config_toml() -> &'static str {
    r##"# routerino-forge configuration
# All options are optional except base_url - defaults shown below.

# Route table: a JSON array of routes, or a TOML file with [[routes]] entries.
routes = "routes.json"

# HTML template. Point this at the bundler's built index.html, or at the
# source index.html when pre-rendering without a bundler step.
template = "dist/index.html"

# Directory receiving the generated pages.
output_dir = "dist"

# Site origin used for canonical URLs, og:url, og:image and the sitemap.
base_url = "https://example.com"

# Write sitemap.xml, and robots.txt unless one already exists.
generate_sitemap = true

# Canonical URLs end with "/" ("/about/") instead of "/about".
use_trailing_slash = false

# Debug-level logging.
verbose = false

# Persistent cache root (placeholder cache lives in <ssg_cache_dir>/images).
ssg_cache_dir = ".routerino-cache"

# Markdown or HTML file rendered into 404.html.
# not_found = "pages/404.md"

# Placeholder generator: "builtin" (pure Rust) or "magick" (ImageMagick).
image_tool = "builtin"

# Deadline in seconds for each ImageMagick invocation.
image_timeout_secs = 30

# Blurred low-quality placeholders for <img> tags. `optimize_images = true`
# enables them with defaults; the table below customizes them.
[optimize_images]
enabled = false
placeholder_size = 20
blur = 10
min_size = 1024
max_size = 10485760
# cache_dir = ".routerino-cache/images"

[processing]
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn table(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn default_config_values() {
        let config = BuildConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("dist"));
        assert!(config.generate_sitemap);
        assert!(!config.use_trailing_slash);
        assert!(!config.image_config().enabled);
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let config = resolve_config(vec![table(r#"base_url = "https://example.com//""#)]).unwrap();
        assert_eq!(config.base_url, "https://example.com");
    }

    #[test]
    fn missing_base_url_rejected() {
        let result = resolve_config(vec![]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn non_http_base_url_rejected() {
        let result = resolve_config(vec![table(r#"base_url = "example.com""#)]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn optimize_images_bool() {
        let config = resolve_config(vec![table(
            "base_url = \"https://x.test\"\noptimize_images = true",
        )])
        .unwrap();
        let images = config.image_config();
        assert!(images.enabled);
        assert_eq!(images.placeholder_size, 20);
        assert_eq!(images.cache_dir, PathBuf::from(".routerino-cache/images"));
    }

    #[test]
    fn optimize_images_table() {
        let config = resolve_config(vec![table(
            r#"
            base_url = "https://x.test"
            [optimize_images]
            placeholder_size = 16
            blur = 4
            cache_dir = "/tmp/lqip"
            "#,
        )])
        .unwrap();
        let images = config.image_config();
        assert!(images.enabled);
        assert_eq!(images.placeholder_size, 16);
        assert_eq!(images.blur, 4);
        assert_eq!(images.min_size, 1024);
        assert_eq!(images.cache_dir, PathBuf::from("/tmp/lqip"));
    }

    #[test]
    fn bool_overlay_replaces_table() {
        let config = resolve_config(vec![
            table("base_url = \"https://x.test\"\n[optimize_images]\nblur = 3"),
            table("optimize_images = false"),
        ])
        .unwrap();
        assert!(!config.image_config().enabled);
    }

    #[test]
    fn min_above_max_rejected() {
        let result = resolve_config(vec![table(
            "base_url = \"https://x.test\"\n[optimize_images]\nmin_size = 10\nmax_size = 5",
        )]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_placeholder_rejected() {
        let result = resolve_config(vec![table(
            "base_url = \"https://x.test\"\n[optimize_images]\nplaceholder_size = 0",
        )]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let result = resolve_config(vec![table(
            "base_url = \"https://x.test\"\nbase_uri = \"typo\"",
        )]);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn image_tool_parses() {
        let config = resolve_config(vec![table(
            "base_url = \"https://x.test\"\nimage_tool = \"magick\"",
        )])
        .unwrap();
        assert_eq!(config.image_tool, ImageTool::Magick);
    }

    #[test]
    fn merge_toml_scalar_override() {
        let merged = merge_toml(table("a = 1\nb = 2"), table("b = 3"));
        assert_eq!(merged, table("a = 1\nb = 3"));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let merged = merge_toml(
            table("[x]\na = 1\n[x.y]\nb = 2"),
            table("[x.y]\nb = 5\nc = 6"),
        );
        assert_eq!(merged, table("[x]\na = 1\n[x.y]\nb = 5\nc = 6"));
    }

    #[test]
    fn load_config_file_and_overrides() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("forge.toml");
        fs::write(
            &path,
            "base_url = \"https://file.test/\"\noutput_dir = \"public\"\nverbose = false",
        )
        .unwrap();

        let config = load_config(Some(&path), table("verbose = true")).unwrap();
        assert_eq!(config.base_url, "https://file.test");
        assert_eq!(config.output_dir, PathBuf::from("public"));
        assert!(config.verbose);
    }

    #[test]
    fn explicit_missing_config_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(
            Some(&tmp.path().join("nope.toml")),
            toml::Value::Table(Default::default()),
        );
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn stock_config_parses() {
        let value = table(stock_config_toml());
        let config = resolve_config(vec![value]).unwrap();
        assert_eq!(config.base_url, "https://example.com");
        assert!(!config.image_config().enabled);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
