//! Structured `p4 filelog` output
//!
//! Tagged filelog output carries one record per file with per-revision arrays
//! (`rev`, `change`, `action`, ...) and per-revision integration arrays
//! (`how`, `file`, `srev`, `erev`). [`Session::run_filelog`] turns each record
//! into a [`DepotFile`] holding its [`Revision`]s.

use p4bridge_protocol::{FieldValue, Record, Result};
use p4bridge_transport_traits::Transport;
use serde::Serialize;
use serde_json::Value;

use crate::result::CommandOutput;
use crate::session::Session;
use crate::session::core::atoi;

/// One integration record of a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Integration {
    /// How the integration was done (`copy from`, `merge into`, ...)
    pub how: String,
    /// The other file
    pub file: String,
    /// Start revision; 0 for `#none`
    pub srev: i64,
    /// End revision
    pub erev: i64,
}

/// One revision of a depot file
///
/// Attribute names are lowercase. `rev`, `change`, `filesize` and `time` are
/// stored as integers, everything else as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    depot_file: String,
    attributes: Record,
    integrations: Vec<Integration>,
}

impl Revision {
    fn new(depot_file: &str) -> Self {
        Self {
            depot_file: depot_file.to_owned(),
            attributes: Record::new(),
            integrations: Vec::new(),
        }
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let value = match name.as_str() {
            "rev" | "change" | "filesize" | "time" => Value::from(atoi(value)),
            _ => Value::from(value),
        };
        self.attributes.insert(name, value);
    }

    /// The file this revision belongs to
    #[must_use]
    pub fn depot_file(&self) -> &str {
        &self.depot_file
    }

    /// An attribute by any-case name
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&FieldValue> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    /// All attributes
    #[must_use]
    pub fn attributes(&self) -> &Record {
        &self.attributes
    }

    fn int(&self, name: &str) -> Option<i64> {
        self.attributes.get(name).and_then(Value::as_i64)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.attributes.get_str(name)
    }

    /// Revision number
    #[must_use]
    pub fn rev(&self) -> Option<i64> {
        self.int("rev")
    }

    /// Changelist number
    #[must_use]
    pub fn change(&self) -> Option<i64> {
        self.int("change")
    }

    /// File size in bytes
    #[must_use]
    pub fn file_size(&self) -> Option<i64> {
        self.int("filesize")
    }

    /// Submit time, seconds since the epoch
    #[must_use]
    pub fn time(&self) -> Option<i64> {
        self.int("time")
    }

    /// Action (`add`, `edit`, `integrate`, ...)
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.text("action")
    }

    /// File type
    #[must_use]
    pub fn file_type(&self) -> Option<&str> {
        self.text("type")
    }

    /// Submitting user
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.text("user")
    }

    /// Submitting client workspace
    #[must_use]
    pub fn client(&self) -> Option<&str> {
        self.text("client")
    }

    /// Change description
    #[must_use]
    pub fn desc(&self) -> Option<&str> {
        self.text("desc")
    }

    /// Content digest
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.text("digest")
    }

    /// Integrations recorded against this revision
    #[must_use]
    pub fn integrations(&self) -> &[Integration] {
        &self.integrations
    }
}

/// A depot file and its revisions, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepotFile {
    /// Depot path
    pub depot_file: String,
    /// Revisions in server order
    pub revisions: Vec<Revision>,
}

/// One unit of filelog output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilelogEntry {
    /// A tagged file record
    File(DepotFile),
    /// Anything else, passed through
    Other(CommandOutput),
}

impl FilelogEntry {
    /// The depot file, if this entry is one
    #[must_use]
    pub fn as_file(&self) -> Option<&DepotFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Other(_) => None,
        }
    }
}

/// `#3` → 3, `#none` → 0
fn revision_number(text: &str) -> i64 {
    let text = text.strip_prefix('#').unwrap_or(text);
    if text == "none" { 0 } else { atoi(text) }
}

fn cell<'a>(record: &'a Record, key: &str, n: usize, m: usize) -> &'a str {
    record
        .get_list(key)
        .and_then(|revs| revs.get(n))
        .and_then(Value::as_array)
        .and_then(|items| items.get(m))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

pub(crate) fn depot_file_from(record: &Record) -> DepotFile {
    let name = record.get_str("depotFile").unwrap_or_default();
    let mut file = DepotFile {
        depot_file: name.to_owned(),
        revisions: Vec::new(),
    };
    let Some(revs) = record.get_list("rev") else {
        return file;
    };

    for (n, rev) in revs.iter().enumerate() {
        if rev.is_null() {
            continue;
        }
        let mut revision = Revision::new(name);

        for (key, value) in record.iter() {
            let Some(entry) = value.as_array().and_then(|items| items.get(n)) else {
                continue;
            };
            match entry {
                Value::Null | Value::Array(_) => {}
                Value::String(s) => revision.set_attribute(key, s),
                other => revision.set_attribute(key, &other.to_string()),
            }
        }

        let how_count = record
            .get_list("how")
            .and_then(|how| how.get(n))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        for m in 0..how_count {
            revision.integrations.push(Integration {
                how: cell(record, "how", n, m).to_owned(),
                file: cell(record, "file", n, m).to_owned(),
                srev: revision_number(cell(record, "srev", n, m)),
                erev: revision_number(cell(record, "erev", n, m)),
            });
        }

        file.revisions.push(revision);
    }
    file
}

impl<T: Transport + 'static> Session<T> {
    /// `p4 filelog` with structured results
    ///
    /// Needs tagged output; untagged units are passed through as
    /// [`FilelogEntry::Other`].
    ///
    /// ```rust,ignore
    /// for entry in p4.run_filelog(&["//depot/main/..."]).await? {
    ///     if let FilelogEntry::File(file) = entry {
    ///         for rev in &file.revisions {
    ///             println!("{}#{:?} {:?}", file.depot_file, rev.rev(), rev.action());
    ///         }
    ///     }
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn run_filelog(&self, args: &[&str]) -> Result<Vec<FilelogEntry>> {
        let result = self.run("filelog", args).await?;
        Ok(result
            .output
            .into_iter()
            .map(|unit| match unit.as_record() {
                Some(record) => FilelogEntry::File(depot_file_from(record)),
                None => FilelogEntry::Other(unit),
            })
            .collect())
    }
}
