//! Route rendering.
//!
//! [`RouteRenderer::render`] maps a URL path to markup. Only an exact match
//! against a static route renders that route; everything else (including any
//! path that would only match a parameterized route) renders the not-found
//! page. A render failure never escapes this module: it becomes error markup
//! inside an otherwise normal [`RenderResult`].
//!
//! ## Renderables
//!
//! Route content is data rather than code:
//!
//! | Variant | Source | Rendering |
//! |---|---|---|
//! | `Html` | inline string | used verbatim |
//! | `Markdown` | inline string | `pulldown-cmark` |
//! | `File` | path (relative to the route table) | `.md`/`.markdown` → Markdown, else verbatim |
//! | `Component` | [`Component`] trait object | whatever the implementation returns |
//!
//! Files may open with a `+++`-delimited TOML block:
//!
//! ```text
//! +++
//! title = "Pricing"
//! description = "Plans for every team"
//! image_url = "/images/pricing.png"
//! +++
//! # Pricing
//! ```
//!
//! Non-empty values from that block override the route's declared metadata.

use crate::types::{RenderResult, Route};
use maud::{Markup, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use serde::Deserialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{0}")]
    Component(String),
    #[error("render panicked: {0}")]
    Panicked(String),
}

/// Markup plus any metadata produced while rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl Rendered {
    pub fn markup(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Default::default()
        }
    }
}

/// Programmatic route content.
///
/// Implementations must be `Send + Sync` so a route table can be shared
/// across threads. Panics inside `render` are caught and reported like
/// errors.
pub trait Component: Send + Sync {
    fn render(&self, url_path: &str) -> Result<Rendered, RenderError>;
}

impl<F> Component for F
where
    F: Fn(&str) -> Result<Rendered, RenderError> + Send + Sync,
{
    fn render(&self, url_path: &str) -> Result<Rendered, RenderError> {
        self(url_path)
    }
}

/// Opaque route content. See the [module docs](self).
#[derive(Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderable {
    Html(String),
    Markdown(String),
    File(PathBuf),
    #[serde(skip)]
    Component(Arc<dyn Component>),
}

impl fmt::Debug for Renderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Renderable::Html(s) => f.debug_tuple("Html").field(s).finish(),
            Renderable::Markdown(s) => f.debug_tuple("Markdown").field(s).finish(),
            Renderable::File(p) => f.debug_tuple("File").field(p).finish(),
            Renderable::Component(_) => f.write_str("Component(..)"),
        }
    }
}

impl Renderable {
    pub fn component(component: impl Component + 'static) -> Self {
        Renderable::Component(Arc::new(component))
    }

    /// Resolve a relative `File` path against `base`. Other variants are unchanged.
    pub fn resolve_against(self, base: &Path) -> Self {
        match self {
            Renderable::File(p) if p.is_relative() => Renderable::File(base.join(p)),
            other => other,
        }
    }

    pub fn render(&self, url_path: &str) -> Result<Rendered, RenderError> {
        match self {
            Renderable::Html(html) => Ok(Rendered::markup(html.clone())),
            Renderable::Markdown(md) => Ok(Rendered::markup(markdown_to_html(md))),
            Renderable::File(path) => render_file(path),
            Renderable::Component(component) => {
                panic::catch_unwind(AssertUnwindSafe(|| component.render(url_path)))
                    .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(&*payload))))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrontMatter {
    title: Option<String>,
    description: Option<String>,
    #[serde(alias = "imageUrl")]
    image_url: Option<String>,
}

const FRONT_MATTER_FENCE: &str = "+++";

/// Split an optional `+++` TOML block from the start of `content`.
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix(FRONT_MATTER_FENCE)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn render_file(path: &Path) -> Result<Rendered, RenderError> {
    let content = std::fs::read_to_string(path).map_err(|source| RenderError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (front, body) = match split_front_matter(&content) {
        Some((raw, body)) => {
            let front: FrontMatter =
                toml::from_str(raw).map_err(|source| RenderError::FrontMatter {
                    path: path.to_path_buf(),
                    source,
                })?;
            (front, body)
        }
        None => (FrontMatter::default(), content.as_str()),
    };

    let is_markdown = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"));
    let html = if is_markdown {
        markdown_to_html(body)
    } else {
        body.to_string()
    };

    Ok(Rendered {
        html,
        title: front.title,
        description: front.description,
        image_url: front.image_url,
    })
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Markup written into the root mount when a route fails to render.
pub fn error_markup(message: &str) -> Markup {
    html! {
        div.routerino-error role="alert" {
            h1 { "Error rendering page" }
            p { (message) }
        }
    }
}

/// Built-in not-found markup used when no not-found renderable is configured.
pub fn fallback_not_found() -> Markup {
    html! {
        div.routerino-not-found {
            h1 { "404 - Page Not Found" }
            p { "The page you requested could not be found." }
        }
    }
}

/// Strip one trailing `/` so `/about/` and `/about` compare equal. Root stays `/`.
fn normalize_path(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some("") | None => path,
        Some(trimmed) => trimmed,
    }
}

/// Override `slot` with a render-time value, ignoring empty strings.
fn override_with(slot: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        *slot = Some(v);
    }
}

/// Renders URL paths against an immutable route table.
pub struct RouteRenderer<'a> {
    routes: &'a [Route],
    not_found: Option<&'a Renderable>,
}

impl<'a> RouteRenderer<'a> {
    pub fn new(routes: &'a [Route], not_found: Option<&'a Renderable>) -> Self {
        Self { routes, not_found }
    }

    /// Exact match against static routes. The first declaration wins.
    pub fn find(&self, url_path: &str) -> Option<&'a Route> {
        let wanted = normalize_path(url_path);
        self.routes
            .iter()
            .find(|r| !r.is_dynamic() && normalize_path(&r.path) == wanted)
    }

    pub fn render(&self, url_path: &str) -> RenderResult {
        match self.find(url_path) {
            Some(route) => self.render_route(route, url_path),
            None => self.render_not_found(url_path),
        }
    }

    fn render_route(&self, route: &Route, url_path: &str) -> RenderResult {
        let mut result = RenderResult {
            title: route.title.clone(),
            description: route.description.clone(),
            image_url: route.image_url.clone(),
            ..Default::default()
        };

        let Some(element) = &route.element else {
            warn!(path = %route.path, "route has no element; rendering empty content");
            return result;
        };

        match element.render(url_path) {
            Ok(rendered) => {
                debug!(path = %route.path, bytes = rendered.html.len(), "rendered route");
                result.html = rendered.html;
                override_with(&mut result.title, rendered.title);
                override_with(&mut result.description, rendered.description);
                override_with(&mut result.image_url, rendered.image_url);
            }
            Err(e) => {
                let message = e.to_string();
                warn!(path = %route.path, error = %message, "route failed to render");
                result.html = error_markup(&message).into_string();
                result.error = Some(message);
            }
        }
        result
    }

    /// Render the not-found page: the configured renderable or the built-in fallback.
    pub fn render_not_found(&self, url_path: &str) -> RenderResult {
        let mut result = RenderResult {
            not_found: true,
            ..Default::default()
        };

        let Some(element) = self.not_found else {
            result.html = fallback_not_found().into_string();
            return result;
        };

        match element.render(url_path) {
            Ok(rendered) => {
                result.html = rendered.html;
                result.title = rendered.title.filter(|t| !t.is_empty());
                result.description = rendered.description.filter(|d| !d.is_empty());
                result.image_url = rendered.image_url.filter(|i| !i.is_empty());
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "not-found page failed to render; using built-in fallback");
                result.html = fallback_not_found().into_string();
                result.error = Some(message);
            }
        }
        result
    }
}
