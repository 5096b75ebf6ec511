//! Pure calculation functions for placeholder dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the placeholder raster size for a source image.
///
/// The placeholder is `target_height` pixels tall (never taller than the
/// source) and keeps the source aspect ratio. Both edges are at least 1px.
///
/// # Examples
/// ```
/// # use routerino_forge::imaging::calculate_placeholder_dimensions;
/// // 1600x900 landscape at 20px tall → 36x20
/// assert_eq!(calculate_placeholder_dimensions((1600, 900), 20), (36, 20));
///
/// // Sources shorter than the target are not upscaled
/// assert_eq!(calculate_placeholder_dimensions((30, 10), 20), (30, 10));
/// ```
pub fn calculate_placeholder_dimensions(source: (u32, u32), target_height: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return (1, 1);
    }

    let h = target_height.min(src_h).max(1);
    let w = (src_w as f64 * h as f64 / src_h as f64).round() as u32;
    (w.max(1), h)
}

/// CSS `aspect-ratio` value reduced to lowest terms, e.g. `16/9`.
pub fn aspect_ratio(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return "auto".to_string();
    }
    let d = gcd(width, height);
    format!("{}/{}", width / d, height / d)
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}
