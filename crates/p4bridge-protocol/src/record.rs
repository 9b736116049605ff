//! Structured records produced by the marshaler.
//!
//! A [`Record`] is an ordered mapping from field name to [`FieldValue`]. A value
//! is a scalar string or a nested sequence whose depth matches the number of
//! index levels the wire keys carried; gaps left by sparse indices are `null`.
//!
//! A [`SpecRecord`] wraps a record with the field map of the spec definition it
//! was built from, so that field access is case-insensitive and writes are
//! restricted to the definition's fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{P4Error, Result};
use crate::spec::SpecDefinition;

/// A record field value: string, nested array, or `null` for a gap
pub type FieldValue = Value;

/// Generic structured record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Field value by exact name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Mutable field value by exact name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.0.get_mut(name)
    }

    /// Scalar field as a string slice
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Sequence field
    #[must_use]
    pub fn get_list(&self, name: &str) -> Option<&Vec<FieldValue>> {
        self.0.get(name).and_then(Value::as_array)
    }

    /// Whether the record has a field
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Insert or replace a field, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Remove a field
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.shift_remove(name)
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into the underlying map
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Record bound to a spec definition
///
/// Reads and writes go through a field map from lowercase name to canonical
/// tag, so `get("description")` finds `Description`. Fields merged in through
/// the server's `extraTagN` convention are outside the map but still readable.
///
/// # Examples
///
/// ```rust
/// use p4bridge_protocol::{SpecDefinition, SpecRecord};
///
/// let def = SpecDefinition::parse("Job;code:101;rq;;Description;code:105;type:text;;").unwrap();
/// let mut job = SpecRecord::new(&def);
/// job.set("description", "Fix the frobnicator\n").unwrap();
///
/// assert_eq!(job.get_str("Description"), Some("Fix the frobnicator\n"));
/// assert!(job.set("Severity", "A").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecRecord {
    fields: Record,
    field_map: Vec<(String, String)>,
}

impl SpecRecord {
    /// Create an empty record permitting the definition's fields
    #[must_use]
    pub fn new(def: &SpecDefinition) -> Self {
        Self {
            fields: Record::new(),
            field_map: def.field_map(),
        }
    }

    /// Bind existing fields to a definition's field map
    #[must_use]
    pub fn from_record(def: &SpecDefinition, fields: Record) -> Self {
        Self {
            fields,
            field_map: def.field_map(),
        }
    }

    /// Canonical tag for a field name, if the definition permits it
    #[must_use]
    pub fn canonical(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        self.field_map
            .iter()
            .find(|(l, _)| *l == lower)
            .map(|(_, tag)| tag.as_str())
    }

    /// Field value by any-case name, falling back to the exact raw key
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        match self.canonical(name) {
            Some(tag) => self.fields.get(tag),
            None => self.fields.get(name),
        }
    }

    /// Scalar field as a string slice
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Set a permitted field
    ///
    /// # Errors
    ///
    /// Returns an `InvalidField` error when the definition has no such field.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let tag = self
            .canonical(name)
            .ok_or_else(|| P4Error::invalid_field(name))?
            .to_owned();
        self.fields.insert(tag, value);
        Ok(())
    }

    /// Canonical tags in definition order
    pub fn permitted_fields(&self) -> impl Iterator<Item = &str> {
        self.field_map.iter().map(|(_, tag)| tag.as_str())
    }

    /// The underlying record, including extra fields
    #[must_use]
    pub fn as_record(&self) -> &Record {
        &self.fields
    }

    /// Mutable access for the marshaler, which bypasses the field map
    pub(crate) fn record_mut(&mut self) -> &mut Record {
        &mut self.fields
    }

    /// Unwrap into the underlying record
    #[must_use]
    pub fn into_record(self) -> Record {
        self.fields
    }
}
