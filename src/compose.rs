//! Template compositor.
//!
//! Merges a rendered page into the HTML template:
//!
//! 1. **Title**: `<title>` becomes `Route Title | Existing Title`, or just the
//!    route title when the template has none. Inserted before `</head>` when
//!    the template has no `<title>` element at all.
//! 2. **Head tags**: synthesized tags go immediately before `</head>`, in order.
//! 3. **Root mount**: the contents of the element with `id="root"` are
//!    replaced by the rendered markup. The element's own tags and attributes
//!    are kept. The element is located with `tl`, so nested elements of the
//!    same name and ids that merely start with `root` are handled.
//!
//! Everything outside the root element's contents is spliced as text, so the
//! template's bytes survive untouched. Missing landmarks degrade to
//! [`ComposeWarning`]s.

use maud::html;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// `id` attribute value of the root-mount element.
pub const ROOT_ID: &str = "root";

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("title pattern"));

static HEAD_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head\s*>").expect("head pattern"));

/// Something the template lacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeWarning {
    /// No `</head>`: title and tags were not inserted.
    MissingHead,
    /// No root-mount element: the page body is missing.
    MissingRoot,
}

impl fmt::Display for ComposeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeWarning::MissingHead => write!(f, "template has no </head>; head tags dropped"),
            ComposeWarning::MissingRoot => write!(
                f,
                "template has no element with id=\"{ROOT_ID}\"; page content dropped"
            ),
        }
    }
}

/// The composed document and any warnings raised along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub html: String,
    pub warnings: Vec<ComposeWarning>,
}

/// Compose one output file.
///
/// `title` is the page's effective title (declared or render-time).
pub fn compose(template: &str, body: &str, tags: &[String], title: Option<&str>) -> Composed {
    let mut warnings = Vec::new();

    let (with_title, title_pending) = match title {
        Some(title) => merge_title(template, title),
        None => (template.to_string(), None),
    };

    let mut head_insert = String::new();
    if let Some(title_tag) = title_pending {
        head_insert.push_str(&title_tag);
        head_insert.push('\n');
    }
    for tag in tags {
        head_insert.push_str(tag);
        head_insert.push('\n');
    }

    let with_head = if head_insert.is_empty() {
        with_title
    } else {
        match insert_before_head_close(&with_title, &head_insert) {
            Some(html) => html,
            None => {
                warnings.push(ComposeWarning::MissingHead);
                with_title
            }
        }
    };

    let html = match mount_root(&with_head, body) {
        Some(html) => html,
        None => {
            warnings.push(ComposeWarning::MissingRoot);
            with_head
        }
    };

    Composed { html, warnings }
}

fn escape_text(text: &str) -> String {
    html! { (text) }.into_string()
}

/// Replace an existing `<title>` in place. When there is none, the new
/// element is returned for insertion before `</head>`.
fn merge_title(template: &str, title: &str) -> (String, Option<String>) {
    let title = escape_text(title);
    match TITLE.captures(template) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
            let existing = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let merged = if existing.is_empty() {
                format!("<title>{title}</title>")
            } else {
                format!("<title>{title} | {existing}</title>")
            };
            let mut out = String::with_capacity(template.len() + merged.len());
            out.push_str(&template[..whole.start]);
            out.push_str(&merged);
            out.push_str(&template[whole.end..]);
            (out, None)
        }
        None => (template.to_string(), Some(format!("<title>{title}</title>"))),
    }
}

fn insert_before_head_close(html: &str, insert: &str) -> Option<String> {
    let at = HEAD_CLOSE.find(html)?.start();
    let mut out = String::with_capacity(html.len() + insert.len());
    out.push_str(&html[..at]);
    out.push_str(insert);
    out.push_str(&html[at..]);
    Some(out)
}

/// Byte range of the root element's contents, or `None` if absent.
///
/// The third field carries the tag name when the element is self-closing and
/// needs a closing tag synthesized.
fn root_content_range(html: &str) -> Option<(usize, usize, Option<String>)> {
    let dom = tl::parse(html, tl::ParserOptions::default().track_ids()).ok()?;
    let parser = dom.parser();
    let tag = dom.get_element_by_id(ROOT_ID)?.get(parser)?.as_tag()?;
    let name = tag.name().as_utf8_str().to_ascii_lowercase();

    let (start, _) = tag.boundaries(parser);
    let element = html.get(start..start + tag.raw().as_bytes().len())?;
    let open_end = start + open_tag_len(element)?;

    // `<div id="root" />`: no contents, synthesize the closing tag.
    if html[start..open_end].trim_end_matches('>').ends_with('/') {
        return Some((open_end, open_end, Some(name)));
    }

    let close = element.to_ascii_lowercase().rfind(&format!("</{name}"))?;
    let close = start + close;
    (close >= open_end).then_some((open_end, close, None))
}

/// Length of the opening tag at the start of `element`, through its `>`.
fn open_tag_len(element: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in element.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i + 1),
            None => {}
        }
    }
    None
}

fn mount_root(html: &str, body: &str) -> Option<String> {
    let (start, end, self_closed) = root_content_range(html)?;
    let mut out = String::with_capacity(html.len() + body.len());
    match self_closed {
        Some(name) => {
            let open = html[..start]
                .trim_end_matches('>')
                .trim_end_matches('/')
                .trim_end();
            out.push_str(open);
            out.push('>');
            out.push_str(body);
            out.push_str(&format!("</{name}>"));
        }
        None => {
            out.push_str(&html[..start]);
            out.push_str(body);
        }
    }
    out.push_str(&html[end..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Site</title></head>\n<body><div id=\"root\"></div><script src=\"/app.js\"></script></body></html>";

    #[test]
    fn title_is_merged_with_existing() {
        let out = compose(TEMPLATE, "", &[], Some("About Us"));
        assert!(out.html.contains("<title>About Us | Site</title>"));
        assert_eq!(out.html.matches("<title>").count(), 1);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn title_untouched_without_route_title() {
        let out = compose(TEMPLATE, "", &[], None);
        assert!(out.html.contains("<title>Site</title>"));
    }

    #[test]
    fn title_inserted_when_template_has_none() {
        let template = "<html><head></head><body><div id=\"root\"></div></body></html>";
        let out = compose(template, "", &[], Some("Home"));
        assert!(out.html.contains("<head><title>Home</title>\n</head>"));
    }

    #[test]
    fn empty_existing_title_is_replaced() {
        let template = "<html><head><title> </title></head><body><div id=\"root\"></div></body></html>";
        let out = compose(template, "", &[], Some("Home"));
        assert!(out.html.contains("<title>Home</title>"));
    }

    #[test]
    fn title_text_is_escaped() {
        let out = compose(TEMPLATE, "", &[], Some("Fish & <Chips>"));
        assert!(out.html.contains("<title>Fish &amp; &lt;Chips&gt; | Site</title>"));
    }

    #[test]
    fn tags_inserted_before_head_close_in_order() {
        let tags = vec![
            r#"<link rel="canonical" href="https://example.com">"#.to_string(),
            r#"<meta property="og:url" content="https://example.com">"#.to_string(),
        ];
        let out = compose(TEMPLATE, "", &tags, None);
        let canonical = out.html.find("rel=\"canonical\"").unwrap();
        let og = out.html.find("og:url").unwrap();
        let head_close = out.html.find("</head>").unwrap();
        assert!(canonical < og && og < head_close);
    }

    #[test]
    fn root_contents_replaced() {
        let out = compose(TEMPLATE, "<h1>Hello</h1>", &[], None);
        assert!(
            out.html
                .contains("<div id=\"root\"><h1>Hello</h1></div><script src=\"/app.js\"></script>")
        );
    }

    #[test]
    fn root_with_existing_nested_content() {
        let template = "<html><head></head><body><main class=\"app\" id='root' data-x=\"1\"><main>old</main><p>stale</p></main><footer>f</footer></body></html>";
        let out = compose(template, "<p>new</p>", &[], None);
        assert!(out.html.contains(
            "<main class=\"app\" id='root' data-x=\"1\"><p>new</p></main><footer>f</footer>"
        ));
        assert!(!out.html.contains("stale"));
    }

    #[test]
    fn self_closing_root_is_expanded() {
        let template = "<html><head></head><body><div id=\"root\" /></body></html>";
        let out = compose(template, "<p>x</p>", &[], None);
        assert!(out.html.contains("<div id=\"root\"><p>x</p></div></body>"));
    }

    #[test]
    fn id_must_match_exactly() {
        for root in [
            "<div id=\"rooted\"></div>",
            "<div id=root-x></div>",
            "<div id=root.x></div>",
        ] {
            let template = format!("<html><head></head><body>{root}</body></html>");
            let out = compose(&template, "<p>x</p>", &[], None);
            assert_eq!(out.warnings, vec![ComposeWarning::MissingRoot], "{root}");
            assert!(!out.html.contains("<p>x</p>"));
        }
    }

    #[test]
    fn root_is_found_past_lookalike_ids() {
        let template = "<html><head></head><body><div id=\"root-x\">a</div><section data-note=\"a > b\" id=\"root\">old</section></body></html>";
        let out = compose(template, "<p>new</p>", &[], None);
        assert!(out.warnings.is_empty());
        assert!(out.html.contains("<div id=\"root-x\">a</div>"));
        assert!(out.html.contains("<section data-note=\"a > b\" id=\"root\"><p>new</p></section>"));
    }

    #[test]
    fn missing_root_still_writes_tags() {
        let template = "<html><head></head><body></body></html>";
        let tags = vec!["<meta name=\"description\" content=\"d\">".to_string()];
        let out = compose(template, "<p>lost</p>", &tags, Some("T"));
        assert_eq!(out.warnings, vec![ComposeWarning::MissingRoot]);
        assert!(out.html.contains("<meta name=\"description\" content=\"d\">"));
        assert!(out.html.contains("<title>T</title>"));
    }

    #[test]
    fn missing_head_is_a_warning() {
        let template = "<div id=\"root\"></div>";
        let tags = vec!["<meta name=\"a\" content=\"b\">".to_string()];
        let out = compose(template, "x", &tags, None);
        assert_eq!(out.warnings, vec![ComposeWarning::MissingHead]);
        assert_eq!(out.html, "<div id=\"root\">x</div>");
    }

    #[test]
    fn compose_is_deterministic() {
        let tags = vec!["<meta name=\"a\" content=\"b\">".to_string()];
        let a = compose(TEMPLATE, "<p>x</p>", &tags, Some("T"));
        let b = compose(TEMPLATE, "<p>x</p>", &tags, Some("T"));
        assert_eq!(a, b);
    }
}
