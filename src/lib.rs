//! # Routerino Forge
//!
//! Build-time static generation for client-routed sites. Every static route
//! in the route table is rendered to HTML, given a deterministic set of SEO
//! head tags, merged into the app's HTML template, and written to disk in
//! both slash conventions, so any static host can serve it without rewrites.
//!
//! # Architecture: One Pass, Five Stages
//!
//! ```text
//! routes.json ─▶ render ─▶ meta tags ─▶ compose ─▶ placeholders ─▶ dist/
//!                                                                  ├── index.html
//!                                                                  ├── about.html
//!                                                                  ├── about/index.html
//!                                                                  ├── 404.html
//!                                                                  ├── sitemap.xml
//!                                                                  └── robots.txt
//! ```
//!
//! Each stage is a plain function over values, so each is unit tested on its
//! own. The [`emit`] module drives them across the route table and is the
//! only place that writes files.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`routes`] | Route table loading (JSON or TOML), static/dynamic split, output paths |
//! | [`render`] | Route renderer: renderables, components, not-found and error markup |
//! | [`meta`] | Canonical URLs and the ordered SEO head tag list |
//! | [`compose`] | Template compositor: title merge, head injection, root mount |
//! | [`placeholder`] | Blurred image placeholders rewritten into `<img>` tags |
//! | [`imaging`] | Image processors: pure Rust, ImageMagick, fixed (tests) |
//! | [`cache`] | Content-addressed placeholder cache |
//! | [`sitemap`] | `sitemap.xml` and `robots.txt` |
//! | [`emit`] | The build session: runs the whole pass, isolates failures |
//! | [`config`] | `forge.toml` loading, layering, validation |
//! | [`types`] | Shared types: `Route`, `HeadElement`, `RenderResult` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Partial Failure Over Aborts
//!
//! A build aborts only when nothing useful could be produced: the route table
//! is not an array, or the template cannot be read. A route that fails to
//! render still gets a page (with an error message in the root mount and its
//! declared title and description); an image that cannot be processed keeps
//! its original tag. Every such failure is listed in the final summary.
//!
//! ## Deterministic Output
//!
//! Two builds over unchanged inputs produce byte-identical files. Head tags
//! are emitted in a fixed order, and placeholder CSS classes are derived from
//! the placeholder content rather than generated randomly.
//!
//! ## Content-Addressed Cache
//!
//! Placeholders are keyed by a SHA-256 over the image path, modification time,
//! size and placeholder settings. Entries are written once and never
//! invalidated; a changed input is simply a different key.

pub mod cache;
pub mod compose;
pub mod config;
pub mod emit;
pub mod imaging;
pub mod meta;
pub mod output;
pub mod placeholder;
pub mod render;
pub mod routes;
pub mod sitemap;
pub mod types;
