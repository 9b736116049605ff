//! Form text codec.
//!
//! Forms are the human-editable rendering of a spec: one `Tag:` header per
//! field, scalar values inline, text and list values on tab-indented
//! continuation lines, and `#` comment lines.
//!
//! ```text
//! # A Perforce Job Specification.
//! Job:	job000001
//!
//! Status:	open
//!
//! Description:
//! 	First line
//! 	Second line
//! ```

use thiserror::Error;

use crate::spec::{FieldType, SpecDefinition, SpecField};
use crate::wire::WireDict;

/// Errors raised while parsing form text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// A header named a field the definition does not have
    #[error("Unknown field name '{tag}' at line {line}")]
    UnknownField {
        /// Tag as written
        tag: String,
        /// One-based line number
        line: usize,
    },

    /// An indented line appeared before any field header
    #[error("Value without field name at line {line}")]
    OrphanValue {
        /// One-based line number
        line: usize,
    },

    /// A select field held a value outside its `val:` set
    #[error("Field '{tag}': '{value}' is not one of {allowed}")]
    InvalidValue {
        /// Field tag
        tag: String,
        /// Value found
        value: String,
        /// Permitted values, `/`-separated
        allowed: String,
    },

    /// A word-list entry had the wrong number of words
    #[error("Field '{tag}': wrong number of words in '{entry}'")]
    WordCount {
        /// Field tag
        tag: String,
        /// Offending entry
        entry: String,
    },

    /// A required field was missing or empty
    #[error("Missing required field '{0}'")]
    MissingField(String),
}

/// Parse form text into a wire dictionary
///
/// List entries become `Tag0`, `Tag1`, ...; text fields keep their line
/// breaks with a trailing newline. With `strict` set, select values, word
/// counts and required fields are validated; otherwise only structural errors
/// are reported.
///
/// # Errors
///
/// Returns [`FormError`] for unknown field names and orphaned continuation
/// lines, and in strict mode for failed validation.
pub fn parse_form(def: &SpecDefinition, text: &str, strict: bool) -> Result<WireDict, FormError> {
    let mut dict = WireDict::new();
    let mut current: Option<Pending<'_>> = None;

    for (n, line) in text.lines().enumerate() {
        let line_no = n + 1;

        if line.starts_with('#') {
            continue;
        }

        if line.trim().is_empty() {
            if let Some(pending) = current.as_mut() {
                pending.blank_run += 1;
            }
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            let Some(pending) = current.as_mut() else {
                return Err(FormError::OrphanValue { line: line_no });
            };
            pending.push(strip_indent(line));
            continue;
        }

        let (tag, rest) = line.split_once(':').unwrap_or((line, ""));
        let field = def
            .field(tag.trim())
            .ok_or_else(|| FormError::UnknownField {
                tag: tag.trim().to_owned(),
                line: line_no,
            })?;

        if let Some(done) = current.take() {
            done.flush(&mut dict);
        }
        let mut pending = Pending::new(field);
        let inline = rest.trim();
        if !inline.is_empty() {
            pending.push(inline);
        }
        current = Some(pending);
    }

    if let Some(done) = current.take() {
        done.flush(&mut dict);
    }

    if strict {
        validate(def, &dict)?;
    }
    Ok(dict)
}

/// Format a wire dictionary as form text, fields in definition order
///
/// Single-line fields render as `Tag:\tvalue` and multi-line or list fields as
/// a `Tag:` header followed by tab-indented lines. Each field is followed by a
/// blank line. Fields absent from the dictionary are omitted.
#[must_use]
pub fn format_form(def: &SpecDefinition, dict: &WireDict) -> String {
    let mut out = String::new();

    for field in def.fields() {
        if field.is_list() {
            let entries: Vec<&str> = (0..)
                .map_while(|i| dict.get(&format!("{}{}", field.tag, i)))
                .collect();
            if entries.is_empty() {
                continue;
            }
            out.push_str(&field.tag);
            out.push_str(":\n");
            for entry in entries {
                out.push('\t');
                out.push_str(entry);
                out.push('\n');
            }
            out.push('\n');
        } else if let Some(value) = dict.get(&field.tag) {
            if field.kind.is_text() {
                out.push_str(&field.tag);
                out.push_str(":\n");
                for line in value.lines() {
                    out.push('\t');
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
            } else {
                out.push_str(&field.tag);
                out.push_str(":\t");
                out.push_str(value);
                out.push_str("\n\n");
            }
        }
    }

    out
}

struct Pending<'a> {
    field: &'a SpecField,
    lines: Vec<String>,
    blank_run: usize,
}

impl<'a> Pending<'a> {
    fn new(field: &'a SpecField) -> Self {
        Self {
            field,
            lines: Vec::new(),
            blank_run: 0,
        }
    }

    fn push(&mut self, line: &str) {
        // Blank lines only count when text continues after them
        if self.field.kind.is_text() && !self.lines.is_empty() {
            self.lines
                .extend(std::iter::repeat_n(String::new(), self.blank_run));
        }
        self.blank_run = 0;
        self.lines.push(line.to_owned());
    }

    fn flush(self, dict: &mut WireDict) {
        let tag = &self.field.tag;
        match self.field.kind {
            kind if kind.is_list() => {
                for (i, entry) in self.lines.iter().enumerate() {
                    dict.push(format!("{tag}{i}"), entry.trim());
                }
            }
            FieldType::Text | FieldType::Bulk => {
                let mut text = self.lines.join("\n");
                text.push('\n');
                dict.push(tag.as_str(), text);
            }
            _ => {
                let value = self.lines.join(" ");
                dict.push(tag.as_str(), value.trim());
            }
        }
    }
}

fn strip_indent(line: &str) -> &str {
    line.strip_prefix('\t').unwrap_or_else(|| line.trim_start())
}

fn validate(def: &SpecDefinition, dict: &WireDict) -> Result<(), FormError> {
    for field in def.fields() {
        if field.is_list() {
            let entries: Vec<&str> = (0..)
                .map_while(|i| dict.get(&format!("{}{}", field.tag, i)))
                .collect();
            if field.required && entries.is_empty() {
                return Err(FormError::MissingField(field.tag.clone()));
            }
            if let Some(min) = field.words {
                let max = field.max_words.unwrap_or(min).max(min);
                for entry in entries {
                    let count = entry.split_whitespace().count();
                    if count < min || count > max {
                        return Err(FormError::WordCount {
                            tag: field.tag.clone(),
                            entry: entry.to_owned(),
                        });
                    }
                }
            }
            continue;
        }

        let value = dict.get(&field.tag).map(str::trim).unwrap_or_default();
        if value.is_empty() {
            if field.required && !field.read_only {
                return Err(FormError::MissingField(field.tag.clone()));
            }
            continue;
        }

        if field.kind == FieldType::Select && field.values.is_some() {
            let ok = field.allowed_values().any(|v| v == value);
            if !ok {
                return Err(FormError::InvalidValue {
                    tag: field.tag.clone(),
                    value: value.to_owned(),
                    allowed: field.values.clone().unwrap_or_default(),
                });
            }
        }
    }
    Ok(())
}
