//! Inventory record types
//!
//! Field values and field sets as produced by inventory providers. A
//! `FetchedRecord` is the transient representation of one discovered
//! resource; it exists only for the duration of a reconciliation call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A value for a single record field, which may be scalar or structured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value (null).
    Null,
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A boolean value.
    Boolean(bool),
    /// A floating-point value.
    Float(f64),
    /// Multiple values.
    Array(Vec<FieldValue>),
    /// A nested object, used for relationship placeholders
    /// (e.g. `{"middleware_server": {"ems_ref": "s1"}}`).
    Object(serde_json::Map<String, Value>),
}

impl FieldValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Get as a string if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a boolean if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a nested object if this is a relationship placeholder.
    pub fn as_object(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            FieldValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Check if this is multi-valued.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, FieldValue::Array(_))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Integer(i as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(vec: Vec<T>) -> Self {
        FieldValue::Array(vec.into_iter().map(Into::into).collect())
    }
}

/// A set of named fields belonging to one record.
///
/// Field names match the persisted schema's column names, plus reserved
/// relationship keys that are stripped before persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    /// Map of field name to value.
    #[serde(flatten)]
    fields: HashMap<String, FieldValue>,
}

/// A record freshly fetched from an inventory provider.
///
/// Same shape as [`FieldSet`]; the alias exists because the reconcile
/// engine talks about fetched records while persisted entities carry a
/// plain field set.
pub type FetchedRecord = FieldSet;

impl FieldSet {
    /// Create a new empty field set.
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Set a field value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Set a field using builder pattern.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a relationship placeholder using builder pattern, e.g.
    /// `with_ref("middleware_server", "ems_ref", "s1")`.
    pub fn with_ref(
        mut self,
        placeholder: impl Into<String>,
        key_field: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let mut map = serde_json::Map::new();
        map.insert(key_field.into(), Value::String(key.into()));
        self.set(placeholder, FieldValue::Object(map));
        self
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a string field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    /// Read the natural key stored inside a relationship placeholder.
    ///
    /// For `{"middleware_server": {"ems_ref": "s1"}}`,
    /// `get_ref("middleware_server", "ems_ref")` returns `Some("s1")`.
    pub fn get_ref(&self, placeholder: &str, key_field: &str) -> Option<&str> {
        self.get(placeholder)
            .and_then(|v| v.as_object())
            .and_then(|map| map.get(key_field))
            .and_then(|v| v.as_str())
    }

    /// Check if a field exists.
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Get all field names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|s| s.as_str())
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Merge another field set into this one, overwriting existing fields.
    pub fn merge(&mut self, other: &FieldSet) {
        for (name, value) in other.iter() {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

impl FromIterator<(String, FieldValue)> for FieldSet {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set_accessors() {
        let record = FieldSet::new()
            .with("ems_ref", "s1")
            .with("name", "Server1")
            .with("port", 8080i64)
            .with("secure", true);

        assert_eq!(record.get_str("ems_ref"), Some("s1"));
        assert_eq!(record.get("port").and_then(|v| v.as_i64()), Some(8080));
        assert_eq!(record.get("secure").and_then(|v| v.as_bool()), Some(true));
        assert!(!record.has("missing"));
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn test_relationship_placeholder() {
        let record = FieldSet::new()
            .with("ems_ref", "d1")
            .with_ref("middleware_server", "ems_ref", "s1");

        assert_eq!(record.get_ref("middleware_server", "ems_ref"), Some("s1"));
        assert_eq!(record.get_ref("middleware_server", "other"), None);
        assert_eq!(record.get_ref("missing", "ems_ref"), None);
    }

    #[test]
    fn test_merge_overwrites() {
        let mut base = FieldSet::new().with("name", "old").with("kept", "yes");
        let incoming = FieldSet::new().with("name", "new");

        base.merge(&incoming);
        assert_eq!(base.get_str("name"), Some("new"));
        assert_eq!(base.get_str("kept"), Some("yes"));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let record = FieldSet::new()
            .with("ems_ref", "s1")
            .with_ref("middleware_server", "ems_ref", "s1");

        let json = serde_json::to_string(&record).unwrap();
        let parsed: FieldSet = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.get_str("ems_ref"), Some("s1"));
        assert_eq!(parsed.get_ref("middleware_server", "ems_ref"), Some("s1"));
    }
}
