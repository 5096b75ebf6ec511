//! SEO head tag synthesis.
//!
//! [`synthesize`] produces the head elements for one concrete URL, always in
//! the same order so that regenerated pages diff cleanly:
//!
//! ```text
//! 1. <link rel="canonical">        always
//! 2. <meta name="description">     if description
//! 3. <meta property="og:title">    if title
//! 4. <meta property="og:description"> if description
//! 5. <meta property="og:url">      always (= canonical URL)
//! 6. <meta property="og:image">    if image URL (made absolute)
//! 7. <meta name="twitter:card">    always, summary_large_image
//! 8. route tags                    declaration order, `soft` attribute dropped
//! ```
//!
//! ## Attribute quoting
//!
//! Values are never backslash- or entity-escaped. Instead the quote character
//! is chosen per value:
//!
//! | Value contains | Output |
//! |---|---|
//! | `"` and `'` | `"` replaced by `”`, wrapped in `"` |
//! | only `"` | wrapped in `'` |
//! | otherwise | wrapped in `"` |
//!
//! Downstream consumers compare this output byte-for-byte; switching to entity
//! escaping is a breaking change.

use crate::config::BuildConfig;
use crate::types::{HeadElement, Route, TagKind};

/// Control attribute on route tags that is never emitted.
pub const SOFT_ATTRIBUTE: &str = "soft";

pub const TWITTER_CARD: &str = "summary_large_image";

const SMART_QUOTE: char = '\u{201D}';

/// Elements rendered without a closing tag.
const VOID_ELEMENTS: &[&str] = &["base", "link", "meta"];

/// Canonical form of a URL path under the trailing-slash policy.
///
/// Trailing slashes are stripped, then one is re-appended when
/// `use_trailing_slash` is set. The root canonicalizes to the empty path, so
/// its canonical URL is the bare base URL.
pub fn canonical_path(path: &str, use_trailing_slash: bool) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if use_trailing_slash {
        format!("{trimmed}/")
    } else {
        trimmed.to_string()
    }
}

/// Absolute canonical URL for a concrete path.
pub fn canonical_url(config: &BuildConfig, path: &str) -> String {
    format!(
        "{}{}",
        config.base_url,
        canonical_path(path, config.use_trailing_slash)
    )
}

/// Resolve a possibly site-relative URL against the base URL.
pub fn absolute_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{base_url}{url}")
    } else {
        format!("{base_url}/{url}")
    }
}

/// Ordered head elements for `route` served at `url_path`.
pub fn synthesize(route: &Route, config: &BuildConfig, url_path: &str) -> Vec<HeadElement> {
    let canonical = canonical_url(config, url_path);
    let mut tags = Vec::with_capacity(7 + route.tags.len());

    tags.push(
        HeadElement::link()
            .attr("rel", "canonical")
            .attr("href", canonical.as_str()),
    );
    if let Some(description) = &route.description {
        tags.push(
            HeadElement::meta()
                .attr("name", "description")
                .attr("content", description.as_str()),
        );
    }
    if let Some(title) = &route.title {
        tags.push(
            HeadElement::meta()
                .attr("property", "og:title")
                .attr("content", title.as_str()),
        );
    }
    if let Some(description) = &route.description {
        tags.push(
            HeadElement::meta()
                .attr("property", "og:description")
                .attr("content", description.as_str()),
        );
    }
    tags.push(
        HeadElement::meta()
            .attr("property", "og:url")
            .attr("content", canonical),
    );
    if let Some(image) = &route.image_url {
        tags.push(
            HeadElement::meta()
                .attr("property", "og:image")
                .attr("content", absolute_url(&config.base_url, image)),
        );
    }
    tags.push(
        HeadElement::meta()
            .attr("name", "twitter:card")
            .attr("content", TWITTER_CARD),
    );

    tags.extend(route.tags.iter().map(without_soft));
    tags
}

/// Head elements for the not-found page: `noindex`, no canonical, no og:url.
pub fn not_found_tags(description: Option<&str>) -> Vec<HeadElement> {
    let mut tags = vec![
        HeadElement::meta()
            .attr("name", "robots")
            .attr("content", "noindex"),
    ];
    if let Some(description) = description {
        tags.push(
            HeadElement::meta()
                .attr("name", "description")
                .attr("content", description),
        );
    }
    tags
}

fn without_soft(tag: &HeadElement) -> HeadElement {
    HeadElement {
        kind: tag.kind.clone(),
        attributes: tag
            .attributes
            .iter()
            .filter(|(name, _)| *name != SOFT_ATTRIBUTE)
            .collect(),
    }
}

/// Quote an attribute value according to the table in the [module docs](self).
pub fn quote_attr(value: &str) -> String {
    let has_double = value.contains('"');
    let has_single = value.contains('\'');
    match (has_double, has_single) {
        (true, true) => format!("\"{}\"", value.replace('"', &SMART_QUOTE.to_string())),
        (true, false) => format!("'{value}'"),
        _ => format!("\"{value}\""),
    }
}

/// Serialize one head element to inline HTML.
pub fn render_tag(tag: &HeadElement) -> String {
    let name = tag.kind.as_str();
    let mut out = format!("<{name}");
    for (attr, value) in tag.attributes.iter() {
        if attr == SOFT_ATTRIBUTE {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push('=');
        out.push_str(&quote_attr(value));
    }
    out.push('>');
    let is_void =
        matches!(tag.kind, TagKind::Meta | TagKind::Link) || VOID_ELEMENTS.contains(&name);
    if !is_void {
        out.push_str(&format!("</{name}>"));
    }
    out
}

pub fn render_tags(tags: &[HeadElement]) -> Vec<String> {
    tags.iter().map(render_tag).collect()
}
