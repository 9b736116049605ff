//! Spec definition grammar.
//!
//! A definition is a run of field entries, each terminated by `;;`. Within an
//! entry, attributes are separated by `;`; the first one is the tag:
//!
//! ```text
//! Job;code:101;rq;len:32;;Status;code:102;type:select;rq;len:10;pre:open;val:open/suspended/closed;;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while parsing definition text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// The definition contained no field entries
    #[error("Spec definition is empty")]
    Empty,

    /// A field entry had no tag
    #[error("Spec definition entry {index} has no tag")]
    EmptyTag {
        /// Zero-based position of the entry
        index: usize,
    },

    /// The same tag was declared twice
    #[error("Duplicate field '{0}' in spec definition")]
    DuplicateTag(String),

    /// A numeric attribute did not hold a number
    #[error("Field '{tag}': attribute '{attribute}' expects a number, got '{value}'")]
    InvalidNumber {
        /// Field tag
        tag: String,
        /// Attribute name
        attribute: String,
        /// Offending value
        value: String,
    },

    /// The `type:` attribute named an unknown field type
    #[error("Field '{tag}': unknown field type '{value}'")]
    UnknownType {
        /// Field tag
        tag: String,
        /// Offending value
        value: String,
    },
}

/// Shape of a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// A single word
    #[default]
    Word,
    /// A list of word tuples, one per line
    #[serde(rename = "wlist")]
    WordList,
    /// One value out of the `val:` set
    Select,
    /// A single line of free text
    Line,
    /// A list of lines
    #[serde(rename = "llist")]
    LineList,
    /// A date
    Date,
    /// Multi-line free text
    Text,
    /// Multi-line text formatted without indentation rules
    Bulk,
}

impl FieldType {
    fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "word" => Self::Word,
            "wlist" => Self::WordList,
            "select" => Self::Select,
            "line" => Self::Line,
            "llist" => Self::LineList,
            "date" => Self::Date,
            "text" => Self::Text,
            "bulk" => Self::Bulk,
            _ => return None,
        })
    }

    /// List fields carry one wire key per entry (`Tag0`, `Tag1`, ...)
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::WordList | Self::LineList)
    }

    /// Multi-line scalar fields
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::Bulk)
    }
}

/// Layout hint used by form editors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldFormat {
    /// No hint
    #[default]
    Normal,
    /// Left column
    Left,
    /// Right column
    Right,
    /// Indented
    Indent,
    /// Comment column
    Comment,
}

impl FieldFormat {
    fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "L" => Self::Left,
            "R" => Self::Right,
            "I" => Self::Indent,
            "C" => Self::Comment,
            _ => return None,
        })
    }
}

/// One field descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecField {
    /// Canonical tag, unique within the definition
    pub tag: String,
    /// Numeric field code; `None` for placeholder codes such as `NNN`
    pub code: Option<u32>,
    /// Field type
    pub kind: FieldType,
    /// `rq`
    pub required: bool,
    /// `ro`
    pub read_only: bool,
    /// `fmt:`
    pub format: FieldFormat,
    /// `len:`
    pub len: Option<usize>,
    /// `seq:`
    pub seq: Option<u32>,
    /// `words:`
    pub words: Option<usize>,
    /// `maxwords:`
    pub max_words: Option<usize>,
    /// `val:` raw value set, alternatives separated by `/`
    pub values: Option<String>,
    /// `pre:` preset
    pub preset: Option<String>,
    /// `opt:` raw option keyword
    pub option: Option<String>,
    /// `open:` raw openable mode
    pub open: Option<String>,
    /// Raw `z` flag
    pub z: bool,
}

impl SpecField {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            code: None,
            kind: FieldType::default(),
            required: false,
            read_only: false,
            format: FieldFormat::default(),
            len: None,
            seq: None,
            words: None,
            max_words: None,
            values: None,
            preset: None,
            option: None,
            open: None,
            z: false,
        }
    }

    /// Whether the field is list-valued
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.kind.is_list()
    }

    /// Alternatives from `val:`, split on `/`
    pub fn allowed_values(&self) -> impl Iterator<Item = &str> {
        self.values.as_deref().into_iter().flat_map(|v| v.split('/'))
    }
}

/// A parsed spec definition: an ordered list of field descriptors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecDefinition {
    raw: String,
    fields: Vec<SpecField>,
}

impl SpecDefinition {
    /// Parse definition text
    ///
    /// Unknown attributes are ignored. A placeholder `code:NNN` yields no code,
    /// and a `fmt:` value glued to further attributes (`fmt:L:len:128`) takes
    /// its first segment.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] for empty definitions, empty or duplicate
    /// tags, non-numeric counts and unknown field types.
    pub fn parse(raw: &str) -> Result<Self, DefinitionError> {
        let mut fields: Vec<SpecField> = Vec::new();

        for (index, entry) in raw.split(";;").enumerate() {
            if entry.trim().is_empty() {
                continue;
            }
            let mut attrs = entry.split(';');
            let tag = attrs.next().unwrap_or_default().trim();
            if tag.is_empty() {
                return Err(DefinitionError::EmptyTag { index });
            }
            if fields.iter().any(|f| f.tag == tag) {
                return Err(DefinitionError::DuplicateTag(tag.to_owned()));
            }

            let mut field = SpecField::new(tag);
            for attr in attrs.filter(|a| !a.is_empty()) {
                let (name, value) = attr.split_once(':').unwrap_or((attr, ""));
                apply_attribute(&mut field, name, value)?;
            }
            fields.push(field);
        }

        if fields.is_empty() {
            return Err(DefinitionError::Empty);
        }

        Ok(Self {
            raw: raw.to_owned(),
            fields,
        })
    }

    /// The text this definition was parsed from
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Field descriptors in declaration order
    #[must_use]
    pub fn fields(&self) -> &[SpecField] {
        &self.fields
    }

    /// Look up a field by its exact tag
    #[must_use]
    pub fn field(&self, tag: &str) -> Option<&SpecField> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Look up a field ignoring case
    #[must_use]
    pub fn field_ignore_case(&self, name: &str) -> Option<&SpecField> {
        self.fields
            .iter()
            .find(|f| f.tag.eq_ignore_ascii_case(name))
    }

    /// `(lowercase name, canonical tag)` pairs in declaration order
    #[must_use]
    pub fn field_map(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|f| (f.tag.to_ascii_lowercase(), f.tag.clone()))
            .collect()
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a successfully parsed definition
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn apply_attribute(field: &mut SpecField, name: &str, value: &str) -> Result<(), DefinitionError> {
    match name {
        "code" => field.code = value.parse().ok(),
        "rq" => field.required = true,
        "ro" => field.read_only = true,
        "z" => field.z = true,
        "type" => {
            field.kind = FieldType::parse(value).ok_or_else(|| DefinitionError::UnknownType {
                tag: field.tag.clone(),
                value: value.to_owned(),
            })?;
        }
        "fmt" => {
            let head = value.split(':').next().unwrap_or_default();
            match FieldFormat::parse(head) {
                Some(format) => field.format = format,
                None => debug!(tag = %field.tag, value, "Ignoring unknown fmt value"),
            }
        }
        "len" => field.len = Some(number(field, name, value)?),
        "seq" => field.seq = Some(number(field, name, value)?),
        "words" => field.words = Some(number(field, name, value)?),
        "maxwords" => field.max_words = Some(number(field, name, value)?),
        "val" => field.values = Some(value.to_owned()),
        "pre" => field.preset = Some(value.to_owned()),
        "opt" => field.option = Some(value.to_owned()),
        "open" => field.open = Some(value.to_owned()),
        _ => debug!(tag = %field.tag, attribute = name, "Ignoring unknown spec attribute"),
    }
    Ok(())
}

fn number<N: std::str::FromStr>(
    field: &SpecField,
    attribute: &str,
    value: &str,
) -> Result<N, DefinitionError> {
    value.parse().map_err(|_| DefinitionError::InvalidNumber {
        tag: field.tag.clone(),
        attribute: attribute.to_owned(),
        value: value.to_owned(),
    })
}
