//! Spec conversion using the session's definitions
//!
//! The session knows every built-in definition plus any definition the server
//! sent since connecting, so forms of those types can be converted without a
//! round trip.

use std::collections::BTreeMap;
use std::sync::Arc;

use p4bridge_protocol::{P4Error, Record, Result, SpecDefinition, SpecRecord, form, marshal};
use p4bridge_transport_traits::Transport;
use tracing::debug;

use crate::session::Session;

impl<T: Transport + 'static> Session<T> {
    /// Definition for a spec type, honouring the exception level
    fn spec_definition(&self, spec_type: &str, operation: &'static str) -> Result<Option<Arc<SpecDefinition>>> {
        if let Some(def) = self.inner.sink_state.specs.read().get(spec_type) {
            return Ok(Some(def));
        }
        if self.exception_level() > 0 {
            return Err(P4Error::unknown_spec(spec_type).with_operation(operation));
        }
        debug!(spec_type, "No spec definition");
        Ok(None)
    }

    /// Parse form text into a spec record
    ///
    /// Returns `Ok(None)` at exception level 0 when the type is unknown or the
    /// form does not parse.
    ///
    /// ```rust,ignore
    /// let job = p4.parse_spec("job", "Job:\tnew\n\nStatus:\topen\n")?.unwrap();
    /// assert_eq!(job.get_str("status"), Some("open"));
    /// ```
    ///
    /// # Errors
    ///
    /// At exception level 1 and above, an `UnknownSpec` error for an unknown
    /// type and a `FormParse` error for malformed form text.
    pub fn parse_spec(&self, spec_type: &str, form_text: &str) -> Result<Option<SpecRecord>> {
        let Some(def) = self.spec_definition(spec_type, "parse_spec")? else {
            return Ok(None);
        };
        match form::parse_form(&def, form_text, false) {
            Ok(dict) => Ok(Some(marshal::dict_to_spec_record(&dict, &def))),
            Err(e) if self.exception_level() > 0 => {
                Err(P4Error::from(e).with_operation("parse_spec"))
            }
            Err(e) => {
                debug!(spec_type, error = %e, "Form did not parse");
                Ok(None)
            }
        }
    }

    /// Format a record as form text
    ///
    /// Returns `Ok(None)` at exception level 0 when the type is unknown.
    ///
    /// # Errors
    ///
    /// At exception level 1 and above, an `UnknownSpec` error for an unknown
    /// type.
    pub fn format_spec(&self, spec_type: &str, record: &Record) -> Result<Option<String>> {
        let Some(def) = self.spec_definition(spec_type, "format_spec")? else {
            return Ok(None);
        };
        let dict = marshal::record_to_dict(record, &def);
        Ok(Some(form::format_form(&def, &dict)))
    }

    /// Field map of a spec type, lowercase name to canonical tag
    ///
    /// # Errors
    ///
    /// At exception level 1 and above, an `UnknownSpec` error for an unknown
    /// type. At level 0 an unknown type yields an empty map.
    pub fn spec_fields(&self, spec_type: &str) -> Result<BTreeMap<String, String>> {
        Ok(self
            .spec_definition(spec_type, "spec_fields")?
            .map(|def| def.field_map().into_iter().collect())
            .unwrap_or_default())
    }
}
