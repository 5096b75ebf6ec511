//! Shared types used across the generation pipeline.
//!
//! The route table is loaded once per build ([`crate::routes`]) and then only
//! read. A [`RenderResult`] is produced fresh for every render call and handed
//! down the pipeline (meta → compose → placeholders) by value.

use crate::render::Renderable;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Marker that introduces a parameter segment in a route path (`/blog/:slug`).
pub const PARAM_MARKER: char = ':';

/// One entry in the route table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Route {
    /// URL pattern. Segments starting with `:` are parameters.
    pub path: String,
    /// Content rendered into the root-mount element.
    #[serde(default)]
    pub element: Option<Renderable>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "image_url")]
    pub image_url: Option<String>,
    /// Extra head elements, emitted after the synthesized SEO tags.
    #[serde(default)]
    pub tags: Vec<HeadElement>,
}

impl Route {
    pub fn new(path: impl Into<String>, element: Renderable) -> Self {
        Self {
            path: path.into(),
            element: Some(element),
            title: None,
            description: None,
            image_url: None,
            tags: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_tag(mut self, tag: HeadElement) -> Self {
        self.tags.push(tag);
        self
    }

    /// A route is dynamic when any path segment is a parameter.
    pub fn is_dynamic(&self) -> bool {
        self.path
            .split('/')
            .any(|segment| segment.starts_with(PARAM_MARKER))
    }
}

/// Element name of a custom head tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TagKind {
    #[default]
    Meta,
    Link,
    Other(String),
}

impl TagKind {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "meta" => TagKind::Meta,
            "link" => TagKind::Link,
            other => TagKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TagKind::Meta => "meta",
            TagKind::Link => "link",
            TagKind::Other(name) => name,
        }
    }
}

/// A `<head>` element: tag name plus attributes in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadElement {
    pub kind: TagKind,
    pub attributes: Attributes,
}

impl HeadElement {
    pub fn new(kind: TagKind) -> Self {
        Self {
            kind,
            attributes: Attributes::new(),
        }
    }

    pub fn meta() -> Self {
        Self::new(TagKind::Meta)
    }

    pub fn link() -> Self {
        Self::new(TagKind::Link)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value);
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawHeadElement {
    #[serde(default, alias = "tag", alias = "tag_name")]
    tag_name: Option<String>,
    #[serde(default)]
    attributes: Attributes,
}

impl<'de> Deserialize<'de> for HeadElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawHeadElement::deserialize(deserializer)?;
        Ok(HeadElement {
            kind: raw
                .tag_name
                .as_deref()
                .map(TagKind::from_name)
                .unwrap_or_default(),
            attributes: raw.attributes,
        })
    }
}

/// Insertion-ordered attribute map.
///
/// Emission order is observable in the generated HTML, so this is a `Vec`
/// rather than a hash map. Inserting an existing name replaces its value in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of attribute names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Attributes, A::Error> {
                let mut attrs = Attributes::new();
                while let Some((name, value)) = map.next_entry::<String, ScalarString>()? {
                    attrs.insert(name, value.0);
                }
                Ok(attrs)
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

/// Attribute value accepted as a string, bool, or number.
struct ScalarString(String);

impl<'de> Deserialize<'de> for ScalarString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = ScalarString;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, boolean, or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ScalarString, E> {
                Ok(ScalarString(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<ScalarString, E> {
                Ok(ScalarString(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<ScalarString, E> {
                Ok(ScalarString(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ScalarString, E> {
                Ok(ScalarString(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ScalarString, E> {
                Ok(ScalarString(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<ScalarString, E> {
                Ok(ScalarString(v.to_string()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

/// Output of one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderResult {
    pub html: String,
    pub not_found: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Render failure message, when the markup is an error page.
    pub error: Option<String>,
}
