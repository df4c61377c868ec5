use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::json::ConsumingObject;
use super::link::{Link, links_from_json, links_to_json};
use crate::warning::{Severity, Warning, WarningLogger};

/// Named sub-collections of a manifest or collection.
pub type Subcollections = BTreeMap<String, Vec<PublicationCollection>>;

/// An ordered group of links, such as a table of contents or page list.
///
/// The collection's name is the key it is stored under, not a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicationCollection {
    pub metadata: Map<String, Value>,
    pub links: Vec<Link>,
    pub subcollections: Subcollections,
}

impl PublicationCollection {
    pub fn new(links: Vec<Link>) -> Self {
        Self {
            links,
            ..Default::default()
        }
    }

    /// Parse a collection from either its object form or its compact
    /// links-array form. Returns `None` (with a warning) if it holds no
    /// valid link.
    pub fn from_json(json: &Value, warnings: &mut dyn WarningLogger) -> Option<Self> {
        let collection = match json {
            Value::Array(_) => Self::new(links_from_json(Some(json), warnings)),
            Value::Object(map) => {
                let mut obj = ConsumingObject::new(map);
                let metadata = match obj.take("metadata") {
                    Some(Value::Object(metadata)) => metadata.clone(),
                    _ => Map::new(),
                };
                let links = links_from_json(obj.take("links"), warnings);
                Self {
                    metadata,
                    links,
                    subcollections: collections_from_json(obj.remaining(), warnings),
                }
            }
            _ => {
                warnings.log(
                    Warning::new(
                        Severity::Moderate,
                        "PublicationCollection",
                        "collection must be an object or an array of links",
                    )
                    .with_source(json),
                );
                return None;
            }
        };

        if collection.links.is_empty() {
            warnings.log(
                Warning::new(
                    Severity::Moderate,
                    "PublicationCollection",
                    "collection has no valid link",
                )
                .with_source(json),
            );
            return None;
        }

        Some(collection)
    }

    /// Compact links array when there is nothing else to carry, object form
    /// otherwise.
    pub fn to_json(&self) -> Value {
        if self.metadata.is_empty() && self.subcollections.is_empty() {
            links_to_json(&self.links)
        } else {
            self.to_json_object()
        }
    }

    fn to_json_object(&self) -> Value {
        let mut map = Map::new();
        if !self.metadata.is_empty() {
            map.insert("metadata".into(), Value::Object(self.metadata.clone()));
        }
        map.insert("links".into(), links_to_json(&self.links));
        map.extend(collections_to_json(&self.subcollections, &[]));
        Value::Object(map)
    }
}

/// Parse every entry as a named collection value.
///
/// A value is one collection object, a compact array of links, or an array
/// of collection objects (recognized by a `links` key on its first element).
pub(crate) fn collections_from_json<'a>(
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
    warnings: &mut dyn WarningLogger,
) -> Subcollections {
    let mut collections = Subcollections::new();

    for (role, value) in entries {
        let parsed: Vec<PublicationCollection> = match value {
            Value::Array(items) if is_collection_list(items) => items
                .iter()
                .filter_map(|item| PublicationCollection::from_json(item, warnings))
                .collect(),
            _ => PublicationCollection::from_json(value, warnings)
                .into_iter()
                .collect(),
        };

        if !parsed.is_empty() {
            collections.entry(role.clone()).or_default().extend(parsed);
        }
    }

    collections
}

fn is_collection_list(items: &[Value]) -> bool {
    items
        .first()
        .and_then(Value::as_object)
        .is_some_and(|first| first.contains_key("links") && !first.contains_key("href"))
}

/// Serialize collections, skipping the roles in `skip` and empty entries.
pub(crate) fn collections_to_json(collections: &Subcollections, skip: &[&str]) -> Map<String, Value> {
    let mut map = Map::new();
    for (role, list) in collections {
        if skip.contains(&role.as_str()) {
            continue;
        }
        let value = match list.as_slice() {
            [] => continue,
            [single] => single.to_json(),
            many => Value::Array(many.iter().map(PublicationCollection::to_json_object).collect()),
        };
        map.insert(role.clone(), value);
    }
    map
}
