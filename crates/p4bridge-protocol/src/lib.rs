//! # p4bridge Protocol
//!
//! Leaf data model for the p4bridge client layer: everything that can be
//! described without a transport or a session.
//!
//! ## Overview
//!
//! - **Messages**: [`Message`], [`Severity`], [`Generic`]
//! - **Wire data**: [`WireDict`], the flat ordered dictionary the server sends
//! - **Spec definitions**: [`SpecDefinition`] grammar, built-ins and [`SpecDefinitionCache`]
//! - **Records**: [`Record`] and the schema-bound [`SpecRecord`]
//! - **Marshaler**: [`marshal`], wire dictionaries to records and back
//! - **Forms**: [`form`], form text parse and format
//! - **Statuses**: [`MergeStatus`], [`SsoStatus`], [`ProgressDone`]
//! - **Errors**: [`P4Error`], [`ErrorKind`], [`Result`]
//!
//! ## Usage
//!
//! ```rust
//! use p4bridge_protocol::{SpecDefinitionCache, WireDict, marshal};
//!
//! let cache = SpecDefinitionCache::new();
//! let def = cache.get("job").unwrap();
//!
//! let dict: WireDict = [("Job", "job000001"), ("Status", "open"), ("extraTag0", "Severity"), ("Severity", "A")]
//!     .into_iter()
//!     .collect();
//! let job = marshal::dict_to_spec_record(&dict, &def);
//!
//! assert_eq!(job.get_str("status"), Some("open"));
//! assert_eq!(job.get_str("Severity"), Some("A"));
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod error;
pub mod form;
pub mod marshal;
pub mod message;
pub mod record;
pub mod spec;
pub mod status;
pub mod wire;

// Re-export the common surface
pub use error::{ErrorCategory, ErrorContext, ErrorKind, P4Error, Result};
pub use form::{FormError, format_form, parse_form};
pub use message::{Generic, Message, Severity};
pub use record::{FieldValue, Record, SpecRecord};
pub use spec::{DefinitionError, FieldType, SpecDefinition, SpecDefinitionCache, SpecField};
pub use status::{MergeStatus, ProgressDone, SsoStatus};
pub use wire::WireDict;
