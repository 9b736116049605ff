//! Record marshaler: flat indexed wire dictionaries to nested records and back.
//!
//! Wire keys encode array positions with a trailing run of digits and commas:
//! `how1,0` is base field `how` at position `[1][0]`. Conversion walks the
//! dictionary in arrival order and builds nested sequences on demand, leaving
//! `null` gaps where indices arrive out of order.
//!
//! # Examples
//!
//! ```rust
//! use p4bridge_protocol::{WireDict, marshal};
//! use serde_json::json;
//!
//! let dict: WireDict = [("depotFile", "//depot/a"), ("rev0", "2"), ("how0,1", "copy from")]
//!     .into_iter()
//!     .collect();
//! let record = marshal::dict_to_record(&dict);
//!
//! assert_eq!(record.get_str("depotFile"), Some("//depot/a"));
//! assert_eq!(record.get("rev"), Some(&json!(["2"])));
//! assert_eq!(record.get("how"), Some(&json!([[null, "copy from"]])));
//! ```

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{P4Error, Result};
use crate::record::{FieldValue, Record, SpecRecord};
use crate::spec::{SpecDefinition, SpecDefinitionCache};
use crate::wire::WireDict;

/// Control keys that never become record fields
pub const RESERVED_KEYS: [&str; 3] = ["specdef", "func", "specFormatted"];

/// Highest array position the marshaler will materialize
///
/// A key whose index exceeds this is stored flat under its raw name.
pub const MAX_INDEX: usize = 1 << 20;

const EXTRA_TAG_PREFIX: &str = "extraTag";

/// Split a wire key into its base name and index suffix
///
/// The split point is the last character, scanning from the end, that is
/// neither a digit nor a comma. A key made entirely of digits and commas has
/// no base and is treated as an unindexed name.
///
/// ```rust
/// use p4bridge_protocol::marshal::split_key;
///
/// assert_eq!(split_key("how1,0"), ("how", "1,0"));
/// assert_eq!(split_key("depotFile"), ("depotFile", ""));
/// assert_eq!(split_key("1234"), ("1234", ""));
/// ```
#[must_use]
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind(|c: char| !c.is_ascii_digit() && c != ',') {
        Some(pos) => {
            // The matched char may be multi-byte; split after it
            let end = pos + key[pos..].chars().next().map_or(1, char::len_utf8);
            key.split_at(end)
        }
        None => (key, ""),
    }
}

/// Insert one wire pair into a record
///
/// - No index: store as a scalar. If the name is taken, the new value goes
///   under the name with an `s` appended instead of overwriting.
/// - Index: get or create a sequence under the base name and store the value
///   at the nested position. If the base name already holds a scalar, or an
///   intermediate position holds a scalar, the pair is stored flat under its
///   raw key.
pub fn insert_item(record: &mut Record, key: &str, value: &str) {
    let (base, index) = split_key(key);

    if index.is_empty() {
        let name = if record.contains_key(key) {
            format!("{key}s")
        } else {
            key.to_owned()
        };
        trace!(key = %name, value, "Scalar field");
        record.insert(name, value);
        return;
    }

    let Some(path) = parse_index(index) else {
        debug!(key, "Index out of range, storing flat");
        record.insert(key, value);
        return;
    };

    if record.get(base).is_some_and(|v| !v.is_array()) {
        debug!(key, base, "Indexed key collides with a scalar field, storing flat");
        record.insert(key, value);
        return;
    }

    if record.get(base).is_none() {
        record.insert(base, Value::Array(Vec::new()));
    }
    let stored = match record.get_mut(base) {
        Some(Value::Array(seq)) => store_at(seq, &path, value),
        _ => false,
    };
    if !stored {
        debug!(key, "Nested position holds a scalar, storing flat");
        record.insert(key, value);
    }
}

fn parse_index(index: &str) -> Option<Vec<usize>> {
    index
        .split(',')
        .map(|level| {
            // An empty level reads as zero
            if level.is_empty() {
                return Some(0);
            }
            level.parse::<usize>().ok().filter(|n| *n <= MAX_INDEX)
        })
        .collect()
}

fn store_at(seq: &mut Vec<FieldValue>, path: &[usize], value: &str) -> bool {
    let Some((&pos, rest)) = path.split_first() else {
        return false;
    };
    if seq.len() <= pos {
        seq.resize(pos + 1, Value::Null);
    }
    if rest.is_empty() {
        seq[pos] = Value::String(value.to_owned());
        return true;
    }
    if seq[pos].is_null() {
        seq[pos] = Value::Array(Vec::new());
    }
    match &mut seq[pos] {
        Value::Array(inner) => store_at(inner, rest, value),
        _ => false,
    }
}

/// Convert a wire dictionary into a generic record
///
/// The reserved control keys `specdef`, `func` and `specFormatted` are skipped.
#[must_use]
pub fn dict_to_record(dict: &WireDict) -> Record {
    let mut record = Record::new();
    for (key, value) in dict.iter() {
        if RESERVED_KEYS.contains(&key) {
            continue;
        }
        insert_item(&mut record, key, value);
    }
    record
}

/// Convert a wire dictionary into a record bound to a spec definition
///
/// Only the definition's fields are taken from the dictionary: scalar fields
/// by tag, list fields from `Tag0`, `Tag1`, ... up to the first missing
/// position. Afterwards every `extraTagN` entry, in order and stopping at the
/// first missing `N`, names a further key whose value is merged in with
/// [`insert_item`]. An extra tag whose named key is absent is skipped.
#[must_use]
pub fn dict_to_spec_record(dict: &WireDict, def: &SpecDefinition) -> SpecRecord {
    let mut spec = SpecRecord::new(def);
    let record = spec.record_mut();

    for field in def.fields() {
        if field.is_list() {
            let entries: Vec<FieldValue> = (0..)
                .map_while(|i| dict.get(&format!("{}{}", field.tag, i)))
                .map(|v| Value::String(v.to_owned()))
                .collect();
            if !entries.is_empty() {
                record.insert(field.tag.as_str(), Value::Array(entries));
            }
        } else if let Some(value) = dict.get(&field.tag) {
            record.insert(field.tag.as_str(), value);
        }
    }

    merge_extra_tags(dict, record);
    spec
}

fn merge_extra_tags(dict: &WireDict, record: &mut Record) {
    for i in 0.. {
        let Some(name) = dict.get(&format!("{EXTRA_TAG_PREFIX}{i}")) else {
            break;
        };
        let Some(value) = dict.get(name) else {
            continue;
        };
        insert_item(record, name, value);
    }
}

/// Convert a record back into a wire dictionary using a spec definition
///
/// Scalar fields produce one pair; list fields produce `Tag0`, `Tag1`, ... up
/// to the first gap. Numbers and booleans are rendered as text. Values whose
/// shape does not match the field (a list for a scalar field or vice versa)
/// are skipped with a warning. Fields not in the definition are ignored.
#[must_use]
pub fn record_to_dict(record: &Record, def: &SpecDefinition) -> WireDict {
    let mut dict = WireDict::new();

    for field in def.fields() {
        let Some(value) = record.get(&field.tag) else {
            continue;
        };

        if field.is_list() {
            let Some(entries) = value.as_array() else {
                warn!(tag = %field.tag, "{} should be an array element. Ignoring...", field.tag);
                continue;
            };
            for (i, entry) in entries.iter().enumerate() {
                match scalar_text(entry) {
                    Some(text) => dict.push(format!("{}{}", field.tag, i), text),
                    None => break,
                }
            }
        } else {
            match scalar_text(value) {
                Some(text) => dict.push(field.tag.as_str(), text),
                None => warn!(tag = %field.tag, "Expected a scalar value. Ignoring..."),
            }
        }
    }

    dict
}

fn scalar_text(value: &FieldValue) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Format a record of the given type into a wire dictionary
///
/// # Errors
///
/// Returns an `UnknownSpec` error if no definition is registered for `spec_type`.
pub fn format_record(
    cache: &SpecDefinitionCache,
    spec_type: &str,
    record: &Record,
) -> Result<WireDict> {
    let def = cache.get(spec_type).ok_or_else(P4Error::no_specdef)?;
    Ok(record_to_dict(record, &def))
}
