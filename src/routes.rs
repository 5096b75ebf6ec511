//! Route table loading.
//!
//! A route table is either a JSON array:
//!
//! ```json
//! [
//!   { "path": "/", "element": { "file": "pages/home.md" }, "title": "Home" },
//!   { "path": "/blog/:slug", "element": { "html": "<article></article>" } }
//! ]
//! ```
//!
//! or a TOML document with a `[[routes]]` array of tables. Relative `file`
//! renderables are resolved against the table's directory.
//!
//! Static routes are emitted as files; dynamic ones (any `:param` segment)
//! are reported and skipped.

use crate::types::Route;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Failed to read route table {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Route table {0} is not an array")]
    NotAnArray(PathBuf),
    #[error("Invalid route {path:?}: {reason}")]
    Invalid { path: String, reason: String },
}

/// Serialization format of a route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFormat {
    Json,
    Toml,
}

impl RouteFormat {
    /// `.toml` is TOML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => RouteFormat::Toml,
            _ => RouteFormat::Json,
        }
    }
}

/// Load, resolve, and validate a route table file.
pub fn load_routes(path: &Path) -> Result<Vec<Route>, RouteError> {
    let content = fs::read_to_string(path).map_err(|source| RouteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let routes = parse_routes(&content, RouteFormat::from_path(path), path)?;

    let base = path.parent().unwrap_or(Path::new(""));
    let routes = routes
        .into_iter()
        .map(|mut route| {
            route.element = route.element.map(|e| e.resolve_against(base));
            route
        })
        .collect::<Vec<_>>();

    validate_routes(&routes)?;
    Ok(routes)
}

/// Parse route table text. `origin` names the source in errors.
pub fn parse_routes(
    content: &str,
    format: RouteFormat,
    origin: &Path,
) -> Result<Vec<Route>, RouteError> {
    match format {
        RouteFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(content)?;
            if !value.is_array() {
                return Err(RouteError::NotAnArray(origin.to_path_buf()));
            }
            Ok(serde_json::from_value(value)?)
        }
        RouteFormat::Toml => {
            let mut table: toml::Table = toml::from_str(content)?;
            match table.remove("routes") {
                Some(toml::Value::Array(entries)) => {
                    Ok(toml::Value::Array(entries).try_into::<Vec<Route>>()?)
                }
                _ => Err(RouteError::NotAnArray(origin.to_path_buf())),
            }
        }
    }
}

/// Reject malformed paths; warn about duplicates (first declaration wins).
pub fn validate_routes(routes: &[Route]) -> Result<(), RouteError> {
    let mut seen = HashSet::new();
    for route in routes {
        if !route.path.starts_with('/') {
            return Err(RouteError::Invalid {
                path: route.path.clone(),
                reason: "path must start with '/'".into(),
            });
        }
        if route.path.contains("//") {
            return Err(RouteError::Invalid {
                path: route.path.clone(),
                reason: "path contains an empty segment".into(),
            });
        }
        if route
            .path
            .split('/')
            .any(|segment| segment == ".." || segment == ".")
        {
            return Err(RouteError::Invalid {
                path: route.path.clone(),
                reason: "path contains a relative segment".into(),
            });
        }
        if !seen.insert(trim_trailing_slash(&route.path)) {
            warn!(path = %route.path, "duplicate route path; the first declaration wins");
        }
        if route.element.is_none() {
            warn!(path = %route.path, "route has no element");
        }
    }
    Ok(())
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some("") | None => path,
        Some(trimmed) => trimmed,
    }
}

/// Split routes into (static, dynamic), preserving declaration order.
pub fn partition(routes: &[Route]) -> (Vec<&Route>, Vec<&Route>) {
    routes.iter().partition(|r| !r.is_dynamic())
}

/// Output files for a static route, relative to the output directory.
///
/// The root yields `index.html`. Every other path yields both the flattened
/// `path.html` and `path/index.html`.
pub fn output_paths(route_path: &str) -> Vec<PathBuf> {
    let trimmed = route_path.trim_matches('/');
    if trimmed.is_empty() {
        return vec![PathBuf::from("index.html")];
    }
    vec![
        PathBuf::from(format!("{trimmed}.html")),
        Path::new(trimmed).join("index.html"),
    ]
}
