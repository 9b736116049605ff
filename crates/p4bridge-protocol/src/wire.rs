//! Flat, ordered key/value dictionaries as delivered by the server.

use serde::{Deserialize, Serialize};

/// An ordered sequence of `(key, value)` string pairs
///
/// Arrival order is significant and duplicate keys are preserved, since the
/// record marshaler resolves same-named keys by renaming rather than
/// overwriting.
///
/// # Examples
///
/// ```rust
/// use p4bridge_protocol::WireDict;
///
/// let dict: WireDict = [("depotFile", "//depot/a"), ("rev0", "3")].into_iter().collect();
/// assert_eq!(dict.get("rev0"), Some("3"));
/// assert_eq!(dict.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireDict {
    entries: Vec<(String, String)>,
}

impl WireDict {
    /// Create an empty dictionary
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair, keeping any earlier pair with the same key
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Replace the first pair with this key, or append if absent
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value of the first pair with this key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether any pair carries this key
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove every pair with this key
    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    /// Iterate pairs in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no pairs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WireDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for WireDict {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for WireDict {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_duplicates() {
        let mut dict = WireDict::new();
        dict.push("depotFile", "a");
        dict.push("depotFile", "b");
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("depotFile"), Some("a"));
    }

    #[test]
    fn test_set_replaces_first() {
        let mut dict: WireDict = [("func", "client-FstatInfo"), ("tag", "")].into_iter().collect();
        dict.set("tag", "1");
        dict.set("specdef", "Job;;");
        assert_eq!(dict.get("tag"), Some("1"));
        assert_eq!(dict.len(), 3);
        dict.remove("func");
        assert!(!dict.contains_key("func"));
    }
}
