//! Site emitter: the full generation pass.
//!
//! ```text
//! routes ─▶ partition ─▶ for each static route:
//!                           render ─▶ meta tags ─▶ compose ─▶ placeholders ─▶ write ×1 or ×2
//!           then: 404.html ─▶ sitemap.xml ─▶ robots.txt (if absent)
//! ```
//!
//! A [`BuildSession`] is constructed once per invocation and holds everything
//! the pass needs (config, image processor, placeholder cache). Nothing is
//! global, so independent sessions can run side by side.
//!
//! ## Failure isolation
//!
//! Only two things abort a build: an unreadable template and an output
//! directory that cannot be created. Everything else (a route that fails to
//! render, a template without a root mount, a file that cannot be written,
//! an image that cannot be processed) is logged, recorded in
//! [`BuildStats::errors`] or [`ImageStats::errors`], and the pass moves on.

use crate::cache::{CacheKey, ContentCache};
use crate::compose::compose;
use crate::config::{BuildConfig, ImageConfig};
use crate::imaging::{ImageProcessor, Placeholder};
use crate::meta::{not_found_tags, render_tags, synthesize};
use crate::placeholder::{ImageStats, process_images};
use crate::render::{Renderable, RouteRenderer};
use crate::routes::{output_paths, partition};
use crate::sitemap::{Sitemap, write_robots_if_absent};
use crate::types::{RenderResult, Route};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name of the not-found page.
pub const NOT_FOUND_FILENAME: &str = "404.html";

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Failed to read template {path}: {source}")]
    TemplateRead { path: PathBuf, source: io::Error },
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir { path: PathBuf, source: io::Error },
}

/// A failure confined to one route, file, or image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    /// Route path or output file the failure belongs to.
    pub source: String,
    pub message: String,
}

impl BuildError {
    fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Statistics accumulated over one build.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BuildStats {
    pub routes_found: usize,
    pub static_routes: usize,
    pub dynamic_routes: usize,
    /// Every HTML file written, including `404.html`.
    pub files_written: usize,
    /// Number of `<loc>` entries written, when the sitemap is enabled.
    pub sitemap_entries: Option<usize>,
    pub robots_written: bool,
    pub images: ImageStats,
    pub errors: Vec<BuildError>,
    pub duration: Duration,
}

impl BuildStats {
    /// Route-, file- and image-level failures combined.
    pub fn error_count(&self) -> usize {
        self.errors.len() + self.images.errors.len()
    }
}

/// One build invocation.
pub struct BuildSession<'a> {
    config: &'a BuildConfig,
    image_config: ImageConfig,
    processor: &'a dyn ImageProcessor,
    cache: &'a dyn ContentCache<CacheKey, Placeholder>,
    not_found: Option<Renderable>,
}

impl<'a> BuildSession<'a> {
    pub fn new(
        config: &'a BuildConfig,
        processor: &'a dyn ImageProcessor,
        cache: &'a dyn ContentCache<CacheKey, Placeholder>,
    ) -> Self {
        Self {
            config,
            image_config: config.image_config(),
            processor,
            cache,
            not_found: config.not_found.clone().map(Renderable::File),
        }
    }

    /// Use `renderable` for `404.html` instead of the configured file.
    pub fn with_not_found(mut self, renderable: Renderable) -> Self {
        self.not_found = Some(renderable);
        self
    }

    /// Read the configured template and run the pass.
    pub fn emit(&self, routes: &[Route]) -> Result<BuildStats, EmitError> {
        let template =
            fs::read_to_string(&self.config.template).map_err(|source| EmitError::TemplateRead {
                path: self.config.template.clone(),
                source,
            })?;
        self.emit_with_template(routes, &template)
    }

    /// Run the pass against an in-memory template.
    pub fn emit_with_template(
        &self,
        routes: &[Route],
        template: &str,
    ) -> Result<BuildStats, EmitError> {
        let started = Instant::now();
        let output_dir = self.config.output_dir.as_path();
        fs::create_dir_all(output_dir).map_err(|source| EmitError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let (statics, dynamics) = partition(routes);
        let mut stats = BuildStats {
            routes_found: routes.len(),
            static_routes: statics.len(),
            dynamic_routes: dynamics.len(),
            ..Default::default()
        };

        info!(
            routes = stats.routes_found,
            static_routes = stats.static_routes,
            dynamic_routes = stats.dynamic_routes,
            output = %output_dir.display(),
            "starting static generation"
        );
        for route in &dynamics {
            debug!(path = %route.path, "skipping dynamic route");
        }

        let renderer = RouteRenderer::new(routes, self.not_found.as_ref());

        for route in &statics {
            self.emit_route(&renderer, route, template, &mut stats);
        }
        self.emit_not_found(&renderer, template, &mut stats);

        if self.config.generate_sitemap {
            self.emit_sitemap(&statics, &mut stats);
        }

        stats.duration = started.elapsed();
        info!(
            files = stats.files_written,
            errors = stats.error_count(),
            elapsed_ms = stats.duration.as_millis() as u64,
            "static generation finished"
        );
        Ok(stats)
    }

    fn emit_route(
        &self,
        renderer: &RouteRenderer<'_>,
        route: &Route,
        template: &str,
        stats: &mut BuildStats,
    ) {
        let result = renderer.render(&route.path);
        if let Some(message) = &result.error {
            stats
                .errors
                .push(BuildError::new(route.path.as_str(), message.as_str()));
        }

        let effective = with_render_metadata(route, &result);
        let tags = render_tags(&synthesize(&effective, self.config, &route.path));
        let html = self.finish_page(
            template,
            &result,
            &tags,
            effective.title.as_deref(),
            &route.path,
            stats,
        );

        // Both variants carry the same canonical URL, so the bytes are shared.
        for relative in output_paths(&route.path) {
            self.write(&relative, &html, stats);
        }
    }

    fn emit_not_found(&self, renderer: &RouteRenderer<'_>, template: &str, stats: &mut BuildStats) {
        let result = renderer.render_not_found(&format!("/{NOT_FOUND_FILENAME}"));
        if let Some(message) = &result.error {
            stats
                .errors
                .push(BuildError::new(NOT_FOUND_FILENAME, message.as_str()));
        }
        let tags = render_tags(&not_found_tags(result.description.as_deref()));
        let html = self.finish_page(
            template,
            &result,
            &tags,
            result.title.as_deref(),
            NOT_FOUND_FILENAME,
            stats,
        );
        self.write(Path::new(NOT_FOUND_FILENAME), &html, stats);
    }

    /// Compose, then rewrite images.
    fn finish_page(
        &self,
        template: &str,
        result: &RenderResult,
        tags: &[String],
        title: Option<&str>,
        source: &str,
        stats: &mut BuildStats,
    ) -> String {
        let composed = compose(template, &result.html, tags, title);
        for warning in composed.warnings {
            warn!(source, %warning, "template incomplete");
            stats.errors.push(BuildError::new(source, warning.to_string()));
        }

        let processed = process_images(
            &composed.html,
            &self.config.output_dir,
            &self.image_config,
            self.processor,
            self.cache,
        );
        stats.images.merge(processed.stats);
        processed.html
    }

    fn write(&self, relative: &Path, html: &str, stats: &mut BuildStats) {
        let path = self.config.output_dir.join(relative);
        match write_file(&path, html) {
            Ok(()) => {
                stats.files_written += 1;
                debug!(path = %path.display(), bytes = html.len(), "wrote page");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to write page");
                stats.errors.push(BuildError::new(
                    relative.display().to_string(),
                    format!("write failed: {e}"),
                ));
            }
        }
    }

    fn emit_sitemap(&self, statics: &[&Route], stats: &mut BuildStats) {
        let output_dir = &self.config.output_dir;
        let sitemap = Sitemap::from_routes(statics.iter().copied(), self.config);
        let entries = sitemap.len();
        match sitemap.write(output_dir) {
            Ok(path) => {
                stats.sitemap_entries = Some(entries);
                info!(path = %path.display(), entries, "generated sitemap");
            }
            Err(e) => {
                warn!(error = %e, "failed to write sitemap; skipping robots.txt");
                stats
                    .errors
                    .push(BuildError::new("sitemap.xml", format!("write failed: {e}")));
                return;
            }
        }

        // robots.txt points at the sitemap, so it only goes out alongside one.
        match write_robots_if_absent(output_dir, &self.config.base_url) {
            Ok(true) => {
                stats.robots_written = true;
                debug!("generated robots.txt");
            }
            Ok(false) => debug!("robots.txt exists; leaving it alone"),
            Err(e) => {
                warn!(error = %e, "failed to write robots.txt");
                stats
                    .errors
                    .push(BuildError::new("robots.txt", format!("write failed: {e}")));
            }
        }
    }
}

/// The route as seen by the meta synthesizer: declared metadata overridden
/// by whatever the render pass produced.
fn with_render_metadata(route: &Route, result: &RenderResult) -> Route {
    Route {
        path: route.path.clone(),
        element: None,
        title: result.title.clone(),
        description: result.description.clone(),
        image_url: result.image_url.clone(),
        tags: route.tags.clone(),
    }
}

fn write_file(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Convenience wrapper: one session, one pass.
pub fn emit(
    routes: &[Route],
    config: &BuildConfig,
    processor: &dyn ImageProcessor,
    cache: &dyn ContentCache<CacheKey, Placeholder>,
) -> Result<BuildStats, EmitError> {
    BuildSession::new(config, processor, cache).emit(routes)
}
