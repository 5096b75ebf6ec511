//! Image placeholder pipeline.
//!
//! Scans composed HTML for `<img>` tags and rewrites each local image so a
//! tiny blurred placeholder is painted behind it while the real image loads:
//!
//! ```text
//! <img src="/hero.jpg" alt="Hero">
//!   ↓
//! <span class="lqip-wrap lqip-3fa1c09b2e77" style="...">
//!   <style>.lqip-3fa1c09b2e77::before{background-image:url("data:...")...}</style>
//!   <img src="/hero.jpg" alt="Hero" style="opacity:0" data-lqip width="1600" height="900">
//! </span>
//! ```
//!
//! ## Skips
//!
//! Left untouched (and counted as skipped): absolute URLs, `data:` URIs,
//! SVGs, tags already carrying `data-lqip`, files outside the configured
//! size bounds. Sources that resolve outside the output directory are
//! rejected before any read. Processor failures leave the original tag in
//! place and are recorded as image errors.
//!
//! ## Batching
//!
//! Tags are handled in fixed-size batches. Within a batch, images are
//! processed in parallel with rayon; replacements are spliced back in
//! document order, so the output never depends on scheduling.

use crate::cache::{CacheKey, CacheStats, ContentCache, placeholder_key};
use crate::config::ImageConfig;
use crate::imaging::{ImageProcessor, Placeholder, aspect_ratio, generate_placeholder};
use maud::{PreEscaped, html};
use percent_encoding::percent_decode_str;
use rayon::prelude::*;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Number of `<img>` tags in flight at once.
pub const BATCH_SIZE: usize = 8;

/// Marker attribute on rewritten images.
pub const LQIP_ATTRIBUTE: &str = "data-lqip";

/// `<img ...>` up to the first `>` outside a quoted attribute value.
static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("img tag pattern")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern")
});

/// An image that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageError {
    /// The `src` attribute as written in the page.
    pub source: String,
    pub message: String,
}

/// Per-run image statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImageStats {
    pub processed: u32,
    pub skipped: u32,
    /// Bytes of source images that received a placeholder.
    pub original_bytes: u64,
    /// Bytes of the embedded data URIs.
    pub placeholder_bytes: u64,
    pub cache: CacheStats,
    pub errors: Vec<ImageError>,
}

impl ImageStats {
    pub fn merge(&mut self, other: ImageStats) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.original_bytes += other.original_bytes;
        self.placeholder_bytes += other.placeholder_bytes;
        self.cache.merge(other.cache);
        self.errors.extend(other.errors);
    }
}

/// Rewritten HTML plus what happened to get there.
#[derive(Debug, Clone)]
pub struct ProcessedHtml {
    pub html: String,
    pub stats: ImageStats,
}

enum Outcome {
    Rewritten {
        markup: String,
        original_bytes: u64,
        placeholder_bytes: u64,
        cache_hit: bool,
        write_failed: bool,
    },
    Skipped,
    Failed(ImageError),
}

/// Everything a worker needs, shared by reference across the batch.
struct Pipeline<'a> {
    output_dir: &'a Path,
    output_root: Option<PathBuf>,
    config: &'a ImageConfig,
    processor: &'a dyn ImageProcessor,
    cache: &'a dyn ContentCache<CacheKey, Placeholder>,
}

/// Rewrite every eligible `<img>` in `html`.
///
/// Pass-through when `config.enabled` is false.
pub fn process_images(
    html: &str,
    output_dir: &Path,
    config: &ImageConfig,
    processor: &dyn ImageProcessor,
    cache: &dyn ContentCache<CacheKey, Placeholder>,
) -> ProcessedHtml {
    let mut stats = ImageStats::default();
    if !config.enabled {
        return ProcessedHtml {
            html: html.to_string(),
            stats,
        };
    }

    let tags: Vec<(usize, usize)> = IMG_TAG
        .find_iter(html)
        .map(|m| (m.start(), m.end()))
        .collect();
    if tags.is_empty() {
        return ProcessedHtml {
            html: html.to_string(),
            stats,
        };
    }

    let pipeline = Pipeline {
        output_dir,
        output_root: fs::canonicalize(output_dir).ok(),
        config,
        processor,
        cache,
    };

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    for batch in tags.chunks(BATCH_SIZE) {
        let outcomes: Vec<Outcome> = batch
            .par_iter()
            .map(|&(start, end)| pipeline.process_tag(&html[start..end]))
            .collect();

        for (&(start, end), outcome) in batch.iter().zip(outcomes) {
            out.push_str(&html[cursor..start]);
            match outcome {
                Outcome::Rewritten {
                    markup,
                    original_bytes,
                    placeholder_bytes,
                    cache_hit,
                    write_failed,
                } => {
                    out.push_str(&markup);
                    stats.processed += 1;
                    stats.original_bytes += original_bytes;
                    stats.placeholder_bytes += placeholder_bytes;
                    if cache_hit {
                        stats.cache.hits += 1;
                    } else {
                        stats.cache.misses += 1;
                    }
                    if write_failed {
                        stats.cache.write_failures += 1;
                    }
                }
                Outcome::Skipped => {
                    out.push_str(&html[start..end]);
                    stats.skipped += 1;
                }
                Outcome::Failed(error) => {
                    out.push_str(&html[start..end]);
                    stats.skipped += 1;
                    stats.errors.push(error);
                }
            }
            cursor = end;
        }
    }
    out.push_str(&html[cursor..]);

    ProcessedHtml { html: out, stats }
}

impl Pipeline<'_> {
    fn process_tag(&self, tag: &str) -> Outcome {
        let attrs = parse_attributes(tag);
        if attrs
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(LQIP_ATTRIBUTE))
        {
            return Outcome::Skipped;
        }
        let Some(src) = attr_value(&attrs, "src") else {
            return Outcome::Skipped;
        };
        if !is_local_raster(src) {
            debug!(src, "skipping non-local or vector image");
            return Outcome::Skipped;
        }

        let fail = |message: String| {
            warn!(src, %message, "image skipped");
            Outcome::Failed(ImageError {
                source: src.to_string(),
                message,
            })
        };

        let path = match self.resolve(src) {
            Ok(path) => path,
            Err(message) => return fail(message),
        };
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => return fail(format!("unreadable: {e}")),
        };
        let size = metadata.len();
        if size < self.config.min_size || size > self.config.max_size {
            debug!(src, size, "image outside size bounds");
            return Outcome::Skipped;
        }

        let key = match metadata.modified() {
            Ok(mtime) => Some(placeholder_key(
                &path,
                mtime,
                size,
                self.config.placeholder_size,
                self.config.blur,
            )),
            Err(_) => None,
        };

        let cached = key.as_ref().and_then(|k| self.cache.get(k));
        let cache_hit = cached.is_some();
        let mut write_failed = false;
        let placeholder = match cached {
            Some(p) => p,
            None => match generate_placeholder(self.processor, &path, self.config) {
                Ok(p) => {
                    if let Some(key) = &key {
                        if let Err(e) = self.cache.put(key, &p) {
                            warn!(src, error = %e, "failed to write placeholder cache entry");
                            write_failed = true;
                        }
                    }
                    p
                }
                Err(e) => return fail(e.to_string()),
            },
        };

        debug!(src, cache_hit, "placeholder applied");
        Outcome::Rewritten {
            markup: rewrite(tag, attrs, &placeholder, self.config.blur),
            original_bytes: size,
            placeholder_bytes: placeholder.placeholder_data_uri.len() as u64,
            cache_hit,
            write_failed,
        }
    }

    /// Map a page-relative `src` onto a file inside the output directory.
    fn resolve(&self, src: &str) -> Result<PathBuf, String> {
        let bare = src.split(['?', '#']).next().unwrap_or_default();
        let decoded = percent_decode_str(bare)
            .decode_utf8()
            .map_err(|_| "source is not valid UTF-8 after decoding".to_string())?;

        let joined = lexical_join(self.output_dir, &decoded)
            .ok_or_else(|| "path escapes output directory".to_string())?;

        let root = self
            .output_root
            .as_ref()
            .ok_or_else(|| format!("output directory {} missing", self.output_dir.display()))?;
        let real = fs::canonicalize(&joined).map_err(|e| format!("unreadable: {e}"))?;
        if !real.starts_with(root) {
            return Err("path escapes output directory".to_string());
        }
        Ok(real)
    }
}

/// True for sources that name a local raster file.
fn is_local_raster(src: &str) -> bool {
    let lower = src.trim().to_ascii_lowercase();
    if lower.is_empty()
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || lower.starts_with("data:")
    {
        return false;
    }
    let bare = lower.split(['?', '#']).next().unwrap_or_default();
    !bare.ends_with(".svg")
}

/// Join `relative` under `root` without touching the filesystem.
///
/// Returns `None` when `..` segments climb above `root`.
fn lexical_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                depth += 1;
            }
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                joined.pop();
                depth -= 1;
            }
            Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}

type Attr = (String, Option<String>);

fn parse_attributes(tag: &str) -> Vec<Attr> {
    let inner = tag
        .get(4..tag.len().saturating_sub(1))
        .unwrap_or_default()
        .trim_end_matches('/');
    ATTRIBUTE
        .captures_iter(inner)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str().to_string());
            (c[1].to_string(), value)
        })
        .collect()
}

fn attr_value<'a>(attrs: &'a [Attr], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| v.as_deref())
}

fn has_attr(attrs: &[Attr], name: &str) -> bool {
    attrs.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
}

/// `lqip-` plus 12 hex chars of the data URI's SHA-256.
pub fn placeholder_class(data_uri: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(data_uri.as_bytes()));
    format!("lqip-{}", &digest[..12])
}

fn render_img(attrs: &[Attr], self_closing: bool) -> String {
    let mut out = String::from("<img");
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
    }
    out.push_str(if self_closing { " />" } else { ">" });
    out
}

fn rewrite(tag: &str, mut attrs: Vec<Attr>, placeholder: &Placeholder, blur: u32) -> String {
    let class = placeholder_class(&placeholder.placeholder_data_uri);

    match attrs
        .iter_mut()
        .find(|(n, _)| n.eq_ignore_ascii_case("style"))
    {
        Some((_, value)) => {
            let existing = value.take().unwrap_or_default();
            let existing = existing.trim().trim_end_matches(';');
            *value = Some(if existing.is_empty() {
                "opacity:0".to_string()
            } else {
                format!("{existing};opacity:0")
            });
        }
        None => attrs.push(("style".into(), Some("opacity:0".into()))),
    }
    attrs.push((LQIP_ATTRIBUTE.into(), None));
    if !has_attr(&attrs, "width") {
        attrs.push(("width".into(), Some(placeholder.width.to_string())));
    }
    if !has_attr(&attrs, "height") {
        attrs.push(("height".into(), Some(placeholder.height.to_string())));
    }

    let img = render_img(&attrs, tag.trim_end_matches('>').ends_with('/'));
    let css = format!(
        ".{class}::before{{content:\"\";position:absolute;inset:0;\
         background-image:url(\"{uri}\");background-size:cover;background-position:center;\
         filter:blur({blur}px);transform:scale(1.1);z-index:0}}\
         .{class}>img{{position:relative;z-index:1;transition:opacity .3s}}",
        uri = placeholder.placeholder_data_uri,
    );
    let wrap_style = format!(
        "position:relative;display:inline-block;overflow:hidden;aspect-ratio:{}",
        aspect_ratio(placeholder.width, placeholder.height)
    );

    html! {
        span class=(format!("lqip-wrap {class}")) style=(wrap_style) {
            style { (PreEscaped(css)) }
            (PreEscaped(img))
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::imaging::FixedProcessor;
    use tempfile::TempDir;

    fn config() -> ImageConfig {
        ImageConfig {
            min_size: 0,
            ..ImageConfig::default()
        }
    }

    fn site() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        fs::create_dir_all(dist.join("img")).unwrap();
        fs::write(dist.join("img/hero.jpg"), vec![0u8; 2048]).unwrap();
        (tmp, dist)
    }

    fn run(
        html: &str,
        dist: &Path,
        config: &ImageConfig,
        processor: &FixedProcessor,
        cache: &MemoryCache<CacheKey, Placeholder>,
    ) -> ProcessedHtml {
        process_images(html, dist, config, processor, cache)
    }

    #[test]
    fn disabled_is_pass_through() {
        let (_tmp, dist) = site();
        let html = r#"<p><img src="/img/hero.jpg"></p>"#;
        let config = ImageConfig {
            enabled: false,
            ..config()
        };
        let processor = FixedProcessor::default();
        let out = run(html, &dist, &config, &processor, &MemoryCache::new());
        assert_eq!(out.html, html);
        assert_eq!(out.stats, ImageStats::default());
        assert_eq!(processor.placeholder_calls(), 0);
    }

    #[test]
    fn rewrites_local_image() {
        let (_tmp, dist) = site();
        let html = r#"<p><img src="/img/hero.jpg" alt="Hero"></p>"#;
        let processor = FixedProcessor::new(1600, 900);
        let out = run(html, &dist, &config(), &processor, &MemoryCache::new());

        assert_eq!(out.stats.processed, 1);
        assert_eq!(out.stats.skipped, 0);
        assert_eq!(out.stats.original_bytes, 2048);
        assert!(out.stats.placeholder_bytes > 0);
        assert!(out.html.starts_with("<p><span class=\"lqip-wrap lqip-"));
        assert!(out.html.ends_with("</span></p>"));
        assert!(out.html.contains("data:image/png;base64,"));
        assert!(out.html.contains(
            r#"<img src="/img/hero.jpg" alt="Hero" style="opacity:0" data-lqip width="1600" height="900">"#
        ));
        assert!(out.html.contains("aspect-ratio:16/9"));
        assert!(out.html.contains("filter:blur(10px)"));
    }

    #[test]
    fn quoted_angle_bracket_stays_inside_tag() {
        let (_tmp, dist) = site();
        let html = r#"<p><img src="/img/hero.jpg" alt="a > b"><img src='/img/hero.jpg' title='x>y'></p>"#;
        let out = run(
            html,
            &dist,
            &config(),
            &FixedProcessor::new(1600, 900),
            &MemoryCache::new(),
        );

        assert_eq!(out.stats.processed, 2);
        assert!(out.html.contains(
            r#"<img src="/img/hero.jpg" alt="a > b" style="opacity:0" data-lqip width="1600" height="900">"#
        ));
        assert!(out.html.contains(r#"title="x>y" style="opacity:0""#));
        assert!(out.html.ends_with("</span></p>"));
        assert!(!out.html.contains(r#" b">"#));
    }

    #[test]
    fn skips_remote_data_and_svg() {
        let (_tmp, dist) = site();
        let html = concat!(
            r#"<img src="https://cdn.example.com/a.jpg">"#,
            r#"<img src="//cdn.example.com/b.jpg">"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
            r#"<img src="/img/logo.SVG">"#,
            r#"<img alt="no source">"#,
        );
        let processor = FixedProcessor::default();
        let out = run(html, &dist, &config(), &processor, &MemoryCache::new());
        assert_eq!(out.html, html);
        assert_eq!(out.stats.skipped, 5);
        assert!(out.stats.errors.is_empty());
        assert_eq!(processor.placeholder_calls(), 0);
    }

    #[test]
    fn rejects_path_traversal() {
        let (tmp, dist) = site();
        fs::write(tmp.path().join("secret.jpg"), vec![0u8; 2048]).unwrap();
        let html = concat!(
            r#"<img src="../secret.jpg">"#,
            r#"<img src="/img/../../secret.jpg">"#,
            r#"<img src="/%2E%2E/secret.jpg">"#,
        );
        let processor = FixedProcessor::default();
        let out = run(html, &dist, &config(), &processor, &MemoryCache::new());

        assert_eq!(out.html, html);
        assert_eq!(out.stats.processed, 0);
        assert_eq!(out.stats.skipped, 3);
        assert_eq!(out.stats.errors.len(), 3);
        assert!(
            out.stats
                .errors
                .iter()
                .all(|e| e.message.contains("escapes output directory"))
        );
        assert_eq!(processor.placeholder_calls(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escaping_output_dir() {
        let (tmp, dist) = site();
        let secret = tmp.path().join("secret.jpg");
        fs::write(&secret, vec![0u8; 2048]).unwrap();
        std::os::unix::fs::symlink(&secret, dist.join("img/link.jpg")).unwrap();

        let html = r#"<img src="/img/link.jpg">"#;
        let processor = FixedProcessor::default();
        let out = run(html, &dist, &config(), &processor, &MemoryCache::new());
        assert_eq!(out.html, html);
        assert_eq!(out.stats.errors.len(), 1);
        assert_eq!(processor.placeholder_calls(), 0);
    }

    #[test]
    fn size_bounds_skip_without_error() {
        let (_tmp, dist) = site();
        let html = r#"<img src="/img/hero.jpg">"#;
        let config = ImageConfig {
            min_size: 4096,
            ..config()
        };
        let out = run(
            html,
            &dist,
            &config,
            &FixedProcessor::default(),
            &MemoryCache::new(),
        );
        assert_eq!(out.html, html);
        assert_eq!(out.stats.skipped, 1);
        assert!(out.stats.errors.is_empty());

        let config = ImageConfig {
            max_size: 100,
            ..config
        };
        let out = run(
            html,
            &dist,
            &ImageConfig {
                min_size: 0,
                ..config
            },
            &FixedProcessor::default(),
            &MemoryCache::new(),
        );
        assert_eq!(out.stats.skipped, 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let (_tmp, dist) = site();
        let html = r#"<img src="/img/nope.jpg">"#;
        let out = run(
            html,
            &dist,
            &config(),
            &FixedProcessor::default(),
            &MemoryCache::new(),
        );
        assert_eq!(out.html, html);
        assert_eq!(out.stats.errors.len(), 1);
        assert_eq!(out.stats.errors[0].source, "/img/nope.jpg");
    }

    #[test]
    fn processor_failure_leaves_tag_untouched() {
        let (_tmp, dist) = site();
        fs::write(dist.join("img/broken.jpg"), vec![0u8; 2048]).unwrap();
        let html = r#"<img src="/img/broken.jpg"><img src="/img/hero.jpg">"#;
        let processor = FixedProcessor::default().failing_on("broken");
        let out = run(html, &dist, &config(), &processor, &MemoryCache::new());

        assert!(out.html.starts_with(r#"<img src="/img/broken.jpg"><span"#));
        assert_eq!(out.stats.processed, 1);
        assert_eq!(out.stats.skipped, 1);
        assert_eq!(out.stats.errors.len(), 1);
        assert!(out.stats.errors[0].message.contains("refusing"));
    }

    #[test]
    fn second_run_hits_cache() {
        let (_tmp, dist) = site();
        let html = r#"<img src="/img/hero.jpg">"#;
        let processor = FixedProcessor::default();
        let cache = MemoryCache::new();

        let first = run(html, &dist, &config(), &processor, &cache);
        let second = run(html, &dist, &config(), &processor, &cache);

        assert_eq!(first.html, second.html);
        assert_eq!(first.stats.cache.misses, 1);
        assert_eq!(second.stats.cache.hits, 1);
        assert_eq!(processor.placeholder_calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn already_processed_markup_is_left_alone() {
        let (_tmp, dist) = site();
        let processor = FixedProcessor::default();
        let cache = MemoryCache::new();
        let first = run(r#"<img src="/img/hero.jpg">"#, &dist, &config(), &processor, &cache);
        let again = run(&first.html, &dist, &config(), &processor, &cache);
        assert_eq!(again.html, first.html);
        assert_eq!(again.stats.processed, 0);
        assert_eq!(again.stats.skipped, 1);
    }

    #[test]
    fn query_fragment_and_escapes_are_resolved() {
        let (_tmp, dist) = site();
        fs::write(dist.join("img/my photo.jpg"), vec![0u8; 2048]).unwrap();
        let html = r#"<img src="/img/my%20photo.jpg?v=2#top">"#;
        let out = run(
            html,
            &dist,
            &config(),
            &FixedProcessor::default(),
            &MemoryCache::new(),
        );
        assert_eq!(out.stats.processed, 1);
        assert!(out.html.contains(r#"src="/img/my%20photo.jpg?v=2#top""#));
    }

    #[test]
    fn existing_attributes_are_merged() {
        let (_tmp, dist) = site();
        let html = r#"<img src='/img/hero.jpg' style="border:0;" width="320" loading=lazy />"#;
        let out = run(
            html,
            &dist,
            &config(),
            &FixedProcessor::new(1600, 900),
            &MemoryCache::new(),
        );
        assert!(out.html.contains(
            r#"<img src="/img/hero.jpg" style="border:0;opacity:0" width="320" loading="lazy" data-lqip height="900" />"#
        ));
    }

    #[test]
    fn batches_preserve_document_order() {
        let (_tmp, dist) = site();
        let count = BATCH_SIZE * 2 + 3;
        let mut html = String::new();
        for i in 0..count {
            fs::write(dist.join(format!("img/{i}.jpg")), vec![0u8; 2048]).unwrap();
            html.push_str(&format!(r#"<p>{i}</p><img src="/img/{i}.jpg">"#));
        }
        let out = run(
            &html,
            &dist,
            &config(),
            &FixedProcessor::default(),
            &MemoryCache::new(),
        );
        assert_eq!(out.stats.processed as usize, count);

        let mut last = 0;
        for i in 0..count {
            let pos = out.html.find(&format!(r#"src="/img/{i}.jpg""#)).unwrap();
            assert!(pos > last);
            last = pos;
        }
    }

    #[test]
    fn class_name_is_content_derived() {
        let a = placeholder_class("data:image/png;base64,AAAA");
        let b = placeholder_class("data:image/png;base64,AAAA");
        let c = placeholder_class("data:image/png;base64,BBBB");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), "lqip-".len() + 12);
    }

    #[test]
    fn lexical_join_guards_root() {
        let root = Path::new("/site");
        assert_eq!(
            lexical_join(root, "/a/./b/../c.jpg"),
            Some(PathBuf::from("/site/a/c.jpg"))
        );
        assert_eq!(lexical_join(root, "a/../../c.jpg"), None);
        assert_eq!(lexical_join(root, "../c.jpg"), None);
    }

    #[test]
    fn merge_accumulates() {
        let mut total = ImageStats::default();
        total.merge(ImageStats {
            processed: 2,
            skipped: 1,
            original_bytes: 10,
            placeholder_bytes: 3,
            cache: CacheStats {
                hits: 1,
                misses: 1,
                write_failures: 0,
            },
            errors: vec![ImageError {
                source: "/x.jpg".into(),
                message: "bad".into(),
            }],
        });
        total.merge(ImageStats {
            processed: 1,
            ..ImageStats::default()
        });
        assert_eq!(total.processed, 3);
        assert_eq!(total.cache.total(), 2);
        assert_eq!(total.errors.len(), 1);
    }
}
