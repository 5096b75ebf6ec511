//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Routes are shown by their URL path first, with the files they produce as
//! secondary context after `→`. Failures are never folded into a count: the
//! summary always lists each error with the route, file, or image it
//! belongs to.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Routes
//! 001 / → index.html
//! 002 /about → about.html, about/index.html
//!
//! Dynamic (skipped)
//!     /blog/:slug
//!
//! 3 routes: 2 static, 1 dynamic
//! ```
//!
//! ## Build
//!
//! ```text
//! Routes: 3 found, 2 static, 1 dynamic (skipped)
//! Files: 4 written
//! Sitemap: 2 URLs, robots.txt created
//! Images: 3 processed, 1 skipped (1.2 MB source, 2.1 KB placeholders)
//!     Cache: 2 cached, 1 generated (3 total)
//!
//! Errors (1)
//!     /broken: database unavailable
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::emit::BuildStats;
use crate::routes::{output_paths, partition};
use crate::types::Route;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte size using binary units.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{} {}", count, one)
    } else {
        format!("{} {}", count, many)
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the route classification shown by `check`.
pub fn format_check_output(routes: &[Route]) -> Vec<String> {
    let mut lines = Vec::new();
    let (statics, dynamics) = partition(routes);

    if !statics.is_empty() {
        lines.push("Routes".to_string());
        for (i, route) in statics.iter().enumerate() {
            let files = output_paths(&route.path)
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let title = route
                .title
                .as_deref()
                .map(|t| format!(" ({})", t))
                .unwrap_or_default();
            lines.push(format!(
                "{} {}{} \u{2192} {}",
                format_index(i + 1),
                route.path,
                title,
                files
            ));
        }
    }

    if !dynamics.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Dynamic (skipped)".to_string());
        for route in &dynamics {
            lines.push(format!("    {}", route.path));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{}: {} static, {} dynamic",
        plural(routes.len(), "route", "routes"),
        statics.len(),
        dynamics.len()
    ));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(routes: &[Route]) {
    for line in format_check_output(routes) {
        println!("{}", line);
    }
}

// ============================================================================
// Build summary
// ============================================================================

/// Format the end-of-build summary.
pub fn format_build_summary(stats: &BuildStats) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Routes: {} found, {} static, {} dynamic (skipped)",
            stats.routes_found, stats.static_routes, stats.dynamic_routes
        ),
        format!("Files: {} written", stats.files_written),
    ];

    if let Some(entries) = stats.sitemap_entries {
        let robots = if stats.robots_written {
            "robots.txt created"
        } else {
            "robots.txt kept"
        };
        lines.push(format!(
            "Sitemap: {}, {}",
            plural(entries, "URL", "URLs"),
            robots
        ));
    }

    let images = &stats.images;
    if images.processed + images.skipped > 0 {
        lines.push(format!(
            "Images: {} processed, {} skipped ({} source, {} placeholders)",
            images.processed,
            images.skipped,
            format_bytes(images.original_bytes),
            format_bytes(images.placeholder_bytes)
        ));
        if images.cache.total() > 0 {
            lines.push(format!("    Cache: {}", images.cache));
        }
    }

    let error_count = stats.error_count();
    if error_count > 0 {
        lines.push(String::new());
        lines.push(format!("Errors ({})", error_count));
        for error in &stats.errors {
            lines.push(format!("    {}: {}", error.source, error.message));
        }
        for error in &images.errors {
            lines.push(format!("    {}: {}", error.source, error.message));
        }
    }

    lines
}

/// Print the build summary to stdout.
pub fn print_build_summary(stats: &BuildStats) {
    for line in format_build_summary(stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
