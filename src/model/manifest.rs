//! The publication manifest: metadata, reading order, resources and
//! navigation collections.

use serde_json::{Map, Value};

use super::collection::{PublicationCollection, Subcollections, collections_from_json, collections_to_json};
use super::json::{self, ConsumingObject};
use super::link::{Link, LinkListExt, links_from_json, links_to_json};
use super::metadata::{Metadata, Profile};
use super::media_type;
use crate::error::{Error, Result};
use crate::warning::{DiscardWarnings, WarningLogger};

/// Sub-collection role holding the table of contents.
pub const TOC: &str = "toc";

/// Normalized description of a publication's structure.
///
/// A manifest is plain owned data: parsing and assembly build a complete
/// value, and "copies with overrides" are made with `clone()` plus the
/// `with_*` builders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// JSON-LD context URIs (`@context`).
    pub context: Vec<String>,
    pub metadata: Metadata,
    /// Auxiliary links (self, alternate manifests, ...).
    pub links: Vec<Link>,
    /// The linear spine. Every entry carries a media type.
    pub reading_order: Vec<Link>,
    /// Non-linear resources needed to render the publication. Every entry
    /// carries a media type.
    pub resources: Vec<Link>,
    /// Named navigation collections (`toc`, `pageList`, `landmarks`, ...).
    pub subcollections: Subcollections,
}

impl Manifest {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }

    pub fn with_reading_order(mut self, reading_order: Vec<Link>) -> Self {
        self.reading_order = reading_order;
        self
    }

    pub fn with_resources(mut self, resources: Vec<Link>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_subcollections(mut self, subcollections: Subcollections) -> Self {
        self.subcollections = subcollections;
        self
    }

    pub fn with_table_of_contents(mut self, toc: Vec<Link>) -> Self {
        self.set_table_of_contents(toc);
        self
    }

    // --- Table of contents ---

    /// Links of the first `toc` collection, or nothing.
    pub fn table_of_contents(&self) -> &[Link] {
        self.subcollections
            .get(TOC)
            .and_then(|collections| collections.first())
            .map(|collection| collection.links.as_slice())
            .unwrap_or_default()
    }

    /// Replace the `toc` sub-collection. An empty `toc` removes the key.
    pub fn set_table_of_contents(&mut self, toc: Vec<Link>) {
        if toc.is_empty() {
            self.subcollections.remove(TOC);
        } else {
            self.subcollections
                .insert(TOC.to_string(), vec![PublicationCollection::new(toc)]);
        }
    }

    /// Collections stored under `role`.
    pub fn subcollection(&self, role: &str) -> &[PublicationCollection] {
        self.subcollections
            .get(role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    // --- Parsing ---

    /// Parse a manifest document, discarding warnings.
    pub fn from_json(json: &Value) -> Result<Self> {
        Self::from_json_with_warnings(json, &mut DiscardWarnings)
    }

    /// Parse raw JSON bytes, discarding warnings.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let json: Value = serde_json::from_slice(bytes)?;
        Self::from_json(&json)
    }

    /// Parse a manifest document.
    ///
    /// Known keys are consumed; every remaining key is read as a named
    /// sub-collection. Reading order and resource entries without a media
    /// type are dropped.
    pub fn from_json_with_warnings(json: &Value, warnings: &mut dyn WarningLogger) -> Result<Self> {
        let map = json
            .as_object()
            .ok_or_else(|| Error::MalformedDocument("manifest must be a JSON object".into()))?;
        let mut obj = ConsumingObject::new(map);

        let context = json::string_array(obj.take("@context"));

        let metadata_json = obj
            .take("metadata")
            .ok_or_else(|| Error::MalformedDocument("manifest requires metadata".into()))?;
        let metadata = Metadata::from_json(metadata_json, warnings)?;

        let links = links_from_json(obj.take("links"), warnings);

        // `readingOrder` used to be `spine`. `spine` is only consumed when
        // `readingOrder` is absent.
        let reading_order_json = obj.take("readingOrder").or_else(|| obj.take("spine"));
        let reading_order = with_media_type(links_from_json(reading_order_json, warnings));
        let resources = with_media_type(links_from_json(obj.take("resources"), warnings));

        let subcollections = collections_from_json(obj.remaining(), warnings);

        let mut manifest = Self {
            context,
            metadata,
            links,
            reading_order,
            resources,
            subcollections,
        };

        let toc = manifest.table_of_contents().to_vec();
        manifest.set_table_of_contents(toc);

        Ok(manifest)
    }

    // --- Serialization ---

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        json::insert_strings(&mut map, "@context", &self.context);
        map.insert("metadata".into(), self.metadata.to_json());
        map.insert("links".into(), links_to_json(&self.links));
        map.insert("readingOrder".into(), links_to_json(&self.reading_order));
        if !self.resources.is_empty() {
            map.insert("resources".into(), links_to_json(&self.resources));
        }
        let toc = self.table_of_contents();
        if !toc.is_empty() {
            map.insert(TOC.into(), links_to_json(toc));
        }
        map.extend(collections_to_json(&self.subcollections, &[TOC]));
        Value::Object(map)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }

    // --- Link resolution ---

    /// Find the link pointing to `href`, searching the reading order, then
    /// resources, then links, including alternates and children.
    ///
    /// If nothing matches and `href` has a fragment or query, the search is
    /// repeated with the part before the first `#` or `?`.
    pub fn link_with_href(&self, href: &str) -> Option<&Link> {
        let collections = [&self.reading_order, &self.resources, &self.links];
        if let Some(link) = find_in_trees(&collections, href) {
            return Some(link);
        }

        let short = href.split(['#', '?']).next().unwrap_or(href);
        if short != href {
            return find_in_trees(&collections, short);
        }
        None
    }

    /// First link with `rel` in the reading order, resources or links.
    /// Alternates and children are not searched.
    pub fn link_with_rel(&self, rel: &str) -> Option<&Link> {
        self.reading_order
            .first_with_rel(rel)
            .or_else(|| self.resources.first_with_rel(rel))
            .or_else(|| self.links.first_with_rel(rel))
    }

    /// All links with `rel` in the reading order, resources and links.
    pub fn links_with_rel(&self, rel: &str) -> Vec<&Link> {
        self.reading_order
            .iter()
            .chain(&self.resources)
            .chain(&self.links)
            .filter(|link| link.has_rel(rel))
            .collect()
    }

    // --- Conformance ---

    /// Whether the manifest conforms to `profile`.
    ///
    /// Content sniffing decides for the audiobook, DiViNa and PDF profiles.
    /// EPUB additionally requires the profile to be declared, otherwise an
    /// all-HTML reading order is a plain web publication.
    pub fn conforms_to(&self, profile: &Profile) -> bool {
        if self.reading_order.is_empty() {
            return false;
        }

        if *profile == Profile::AUDIOBOOK {
            self.reading_order.all_are_audio()
        } else if *profile == Profile::DIVINA {
            self.reading_order.all_are_bitmap()
        } else if *profile == Profile::PDF {
            self.reading_order.all_match_media_type(media_type::PDF)
        } else if *profile == Profile::EPUB {
            self.reading_order.all_are_html() && self.metadata.conforms_to.contains(&Profile::EPUB)
        } else {
            self.metadata.conforms_to.contains(profile)
        }
    }
}

fn with_media_type(links: Vec<Link>) -> Vec<Link> {
    links
        .into_iter()
        .filter(|link| link.media_type.is_some())
        .collect()
}

/// Pre-order search: each link, then its alternates, then its children,
/// before its next sibling.
fn find_in_trees<'a>(collections: &[&'a Vec<Link>], href: &str) -> Option<&'a Link> {
    let mut stack: Vec<&'a Link> = Vec::new();
    for links in collections {
        stack.extend(links.iter().rev());
        while let Some(link) = stack.pop() {
            if link.href == href {
                return Some(link);
            }
            stack.extend(link.children.iter().rev());
            stack.extend(link.alternates.iter().rev());
        }
    }
    None
}
