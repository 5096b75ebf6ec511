//! Sitemap and robots.txt generation.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com</loc>
//!   </url>
//! </urlset>
//! ```
//!
//! Only static routes are listed, each once, at its canonical URL.
//! `robots.txt` is created only when the output directory has none.

use crate::config::BuildConfig;
use crate::meta::canonical_url;
use crate::types::Route;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

pub const SITEMAP_FILENAME: &str = "sitemap.xml";
pub const ROBOTS_FILENAME: &str = "robots.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sitemap {
    urls: Vec<UrlEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlEntry {
    loc: String,
}

impl Sitemap {
    /// One entry per static route, in declaration order. Dynamic routes and
    /// repeated canonical URLs are dropped.
    pub fn from_routes<'a>(
        routes: impl IntoIterator<Item = &'a Route>,
        config: &BuildConfig,
    ) -> Self {
        let mut seen = HashSet::new();
        let urls = routes
            .into_iter()
            .filter(|route| !route.is_dynamic())
            .map(|route| canonical_url(config, &route.path))
            .filter(|loc| seen.insert(loc.clone()))
            .map(|loc| UrlEntry { loc })
            .collect();
        Self { urls }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_xml(self) -> String {
        let mut xml = String::with_capacity(128 + self.urls.len() * 64);

        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<urlset xmlns=\"");
        xml.push_str(SITEMAP_NS);
        xml.push_str("\">\n");

        for entry in self.urls {
            xml.push_str("  <url>\n    <loc>");
            xml.push_str(&escape_xml(&entry.loc));
            xml.push_str("</loc>\n  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// Write `sitemap.xml` into `output_dir`, replacing any previous one.
    pub fn write(self, output_dir: &Path) -> io::Result<PathBuf> {
        let path = output_dir.join(SITEMAP_FILENAME);
        fs::write(&path, self.into_xml())?;
        Ok(path)
    }
}

/// Body of the generated robots.txt.
pub fn robots_txt(base_url: &str) -> String {
    format!("User-agent: *\nAllow: /\nSitemap: {base_url}/{SITEMAP_FILENAME}\n")
}

/// Create `robots.txt` unless one exists. Returns whether it was written.
///
/// The body goes to a temp file first and is renamed into place without
/// clobbering, so a failed write never leaves a partial `robots.txt` that
/// later builds would mistake for a user-supplied one.
pub fn write_robots_if_absent(output_dir: &Path, base_url: &str) -> io::Result<bool> {
    let path = output_dir.join(ROBOTS_FILENAME);
    if path.exists() {
        return Ok(false);
    }
    let mut tmp = NamedTempFile::new_in(output_dir)?;
    tmp.write_all(robots_txt(base_url).as_bytes())?;
    tmp.flush()?;
    match tmp.persist_noclobber(&path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
