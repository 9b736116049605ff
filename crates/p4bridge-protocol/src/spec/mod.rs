//! Spec definitions: grammar, built-ins and the per-session cache.

mod cache;
mod defaults;
mod definition;

pub use cache::SpecDefinitionCache;
pub use defaults::{BUILTIN_SPECS, builtin};
pub use definition::{DefinitionError, FieldFormat, FieldType, SpecDefinition, SpecField};
