//! Navigable references to publication resources.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::encryption::Encryption;
use super::json::{self, ConsumingObject};
use super::media_type;
use crate::error::{Error, Result};
use crate::warning::{Severity, Warning, WarningLogger};

/// A link to a resource, with its nested navigation items.
///
/// `alternates` and `children` are owned, so a link tree can never contain
/// itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    /// Relative or absolute locator. Never empty on a parsed link.
    pub href: String,
    /// Media type of the linked resource (JSON `type`).
    pub media_type: Option<String>,
    /// Whether `href` is a URI template.
    pub templated: bool,
    pub title: Option<String>,
    /// Relation tokens (JSON `rel`), e.g. `contents`, `cover`.
    pub rels: BTreeSet<String>,
    pub properties: Properties,
    pub height: Option<u32>,
    pub width: Option<u32>,
    /// Bitrate in kbps.
    pub bitrate: Option<f64>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    pub languages: Vec<String>,
    /// Alternate representations of the same resource.
    pub alternates: Vec<Link>,
    /// Nested navigation items.
    pub children: Vec<Link>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Default::default()
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rels.insert(rel.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_alternate(mut self, alternate: Link) -> Self {
        self.alternates.push(alternate);
        self
    }

    pub fn with_child(mut self, child: Link) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: Vec<Link>) -> Self {
        self.children = children;
        self
    }

    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.contains(rel)
    }

    /// `href` without its fragment or query.
    pub fn href_path(&self) -> &str {
        self.href.split(['#', '?']).next().unwrap_or(&self.href)
    }

    pub fn media_type_matches(&self, other: &str) -> bool {
        self.media_type
            .as_deref()
            .is_some_and(|mt| media_type::matches(mt, other))
    }

    /// Parse a link object. Fails if `json` is not an object or has no
    /// usable `href`.
    pub fn from_json(json: &Value, warnings: &mut dyn WarningLogger) -> Result<Self> {
        let map = json
            .as_object()
            .ok_or_else(|| Error::MalformedDocument("link must be an object".into()))?;
        let mut obj = ConsumingObject::new(map);

        let href = json::string(obj.take("href"))
            .filter(|href| !href.trim().is_empty())
            .ok_or_else(|| Error::MalformedDocument("link requires an href".into()))?;

        let properties = match obj.take("properties") {
            Some(Value::Object(props)) => Properties::from_map(props.clone()),
            _ => Properties::default(),
        };

        Ok(Self {
            href,
            media_type: json::string(obj.take("type")),
            templated: obj.take("templated").and_then(Value::as_bool).unwrap_or(false),
            title: json::string(obj.take("title")),
            rels: json::string_array(obj.take("rel")).into_iter().collect(),
            properties,
            height: json::positive_u32(obj.take("height")),
            width: json::positive_u32(obj.take("width")),
            bitrate: json::positive_f64(obj.take("bitrate")),
            duration: json::positive_f64(obj.take("duration")),
            languages: json::string_array(obj.take("language")),
            alternates: links_from_json(obj.take("alternate"), warnings),
            children: links_from_json(obj.take("children"), warnings),
        })
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("href".into(), Value::String(self.href.clone()));
        json::insert_opt(&mut map, "type", self.media_type.clone());
        if self.templated {
            map.insert("templated".into(), Value::Bool(true));
        }
        json::insert_opt(&mut map, "title", self.title.clone());
        let rels: Vec<String> = self.rels.iter().cloned().collect();
        json::insert_strings(&mut map, "rel", &rels);
        if !self.properties.is_empty() {
            map.insert("properties".into(), Value::Object(self.properties.0.clone()));
        }
        json::insert_opt(&mut map, "height", self.height);
        json::insert_opt(&mut map, "width", self.width);
        json::insert_opt(&mut map, "bitrate", self.bitrate);
        json::insert_opt(&mut map, "duration", self.duration);
        json::insert_strings(&mut map, "language", &self.languages);
        if !self.alternates.is_empty() {
            map.insert("alternate".into(), links_to_json(&self.alternates));
        }
        if !self.children.is_empty() {
            map.insert("children".into(), links_to_json(&self.children));
        }
        Value::Object(map)
    }
}

/// Parse an array of link objects, skipping invalid ones with a warning.
pub(crate) fn links_from_json(json: Option<&Value>, warnings: &mut dyn WarningLogger) -> Vec<Link> {
    let Some(items) = json.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match Link::from_json(item, warnings) {
            Ok(link) => Some(link),
            Err(e) => {
                warnings.log(
                    Warning::new(Severity::Moderate, "Link", e.to_string()).with_source(item),
                );
                None
            }
        })
        .collect()
}

pub(crate) fn links_to_json(links: &[Link]) -> Value {
    Value::Array(links.iter().map(Link::to_json).collect())
}

/// Page side of a resource in a synthetic spread (`properties.page`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Left,
    Right,
    Center,
}

impl Page {
    pub fn as_str(self) -> &'static str {
        match self {
            Page::Left => "left",
            Page::Right => "right",
            Page::Center => "center",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Page::Left),
            "right" => Some(Page::Right),
            "center" => Some(Page::Center),
            _ => None,
        }
    }
}

/// Format-specific flags attached to a link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// `encrypted`, if present and well-formed.
    pub fn encryption(&self) -> Option<Encryption> {
        self.0
            .get("encrypted")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_encryption(&mut self, encryption: &Encryption) {
        if let Ok(value) = serde_json::to_value(encryption) {
            self.0.insert("encrypted".into(), value);
        }
    }

    pub fn page(&self) -> Option<Page> {
        self.0.get("page").and_then(Value::as_str).and_then(Page::parse)
    }

    pub fn set_page(&mut self, page: Page) {
        self.0.insert("page".into(), Value::String(page.as_str().into()));
    }

    /// Features contained in the resource (`mathml`, `svg`, ...).
    pub fn contains(&self) -> Vec<String> {
        json::string_array(self.0.get("contains"))
    }
}

/// Queries over a sequence of links.
pub trait LinkListExt {
    fn first_with_rel(&self, rel: &str) -> Option<&Link>;
    fn filter_by_rel(&self, rel: &str) -> Vec<&Link>;
    fn first_with_href(&self, href: &str) -> Option<&Link>;
    fn first_with_media_type(&self, media_type: &str) -> Option<&Link>;
    /// True when every link's media type satisfies `predicate`. A link
    /// without a media type never does.
    fn all_media_types(&self, predicate: impl Fn(&str) -> bool) -> bool;

    fn all_are_audio(&self) -> bool {
        self.all_media_types(media_type::is_audio)
    }

    fn all_are_bitmap(&self) -> bool {
        self.all_media_types(media_type::is_bitmap)
    }

    fn all_are_html(&self) -> bool {
        self.all_media_types(media_type::is_html)
    }

    fn all_match_media_type(&self, other: &str) -> bool {
        self.all_media_types(|mt| media_type::matches(mt, other))
    }
}

impl LinkListExt for [Link] {
    fn first_with_rel(&self, rel: &str) -> Option<&Link> {
        self.iter().find(|link| link.has_rel(rel))
    }

    fn filter_by_rel(&self, rel: &str) -> Vec<&Link> {
        self.iter().filter(|link| link.has_rel(rel)).collect()
    }

    fn first_with_href(&self, href: &str) -> Option<&Link> {
        self.iter().find(|link| link.href == href)
    }

    fn first_with_media_type(&self, media_type: &str) -> Option<&Link> {
        self.iter().find(|link| link.media_type_matches(media_type))
    }

    fn all_media_types(&self, predicate: impl Fn(&str) -> bool) -> bool {
        self.iter()
            .all(|link| link.media_type.as_deref().is_some_and(&predicate))
    }
}
