//! Helpers for reading the loosely-typed manifest JSON.

use std::collections::HashSet;

use serde_json::{Map, Value};

/// Read-only view of a JSON object that remembers which keys were consumed.
///
/// Model parsers `take` the keys they understand; whatever is left is
/// handed to the generic pass (sub-collections, extension metadata).
pub(crate) struct ConsumingObject<'a> {
    map: &'a Map<String, Value>,
    consumed: HashSet<&'a str>,
}

impl<'a> ConsumingObject<'a> {
    pub(crate) fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            consumed: HashSet::new(),
        }
    }

    /// Consume `key`. `null` values count as absent but are still consumed.
    pub(crate) fn take(&mut self, key: &str) -> Option<&'a Value> {
        let (k, v) = self.map.get_key_value(key)?;
        self.consumed.insert(k.as_str());
        (!v.is_null()).then_some(v)
    }

    /// Entries whose keys have not been consumed, in key order.
    pub(crate) fn remaining(&self) -> impl Iterator<Item = (&'a String, &'a Value)> + '_ {
        self.map
            .iter()
            .filter(|(k, _)| !self.consumed.contains(k.as_str()))
    }
}

pub(crate) fn string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Parse a string array; a bare string counts as a one-element array.
pub(crate) fn string_array(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Strictly positive integer.
pub(crate) fn positive_u32(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .filter(|&n| n > 0)
        .and_then(|n| u32::try_from(n).ok())
}

/// Strictly positive number.
pub(crate) fn positive_f64(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|&n| n > 0.0)
}

/// Insert `value` under `key` unless it is `None`.
pub(crate) fn insert_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

/// Insert a string array unless it is empty.
pub(crate) fn insert_strings(map: &mut Map<String, Value>, key: &str, values: &[String]) {
    if !values.is_empty() {
        map.insert(
            key.to_string(),
            Value::Array(values.iter().cloned().map(Value::String).collect()),
        );
    }
}
