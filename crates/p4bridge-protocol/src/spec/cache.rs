//! Per-session cache of spec definitions keyed by type name.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error};

use super::defaults::BUILTIN_SPECS;
use super::definition::{DefinitionError, SpecDefinition};

/// Maps a record type ("job", "client", ...) to its field schema
///
/// Seeded with the built-in definitions at construction. A server-supplied
/// definition replaces any previous one for the same type; [`reset`] drops
/// every server-supplied definition and restores the built-ins.
///
/// [`reset`]: SpecDefinitionCache::reset
///
/// # Examples
///
/// ```rust
/// use p4bridge_protocol::spec::SpecDefinitionCache;
///
/// let mut cache = SpecDefinitionCache::new();
/// assert!(cache.contains("job"));
///
/// cache.put("job", "Job;code:101;rq;;Severity;code:106;type:select;val:A/B/C;;")?;
/// assert!(cache.get("job").unwrap().field("Severity").is_some());
///
/// cache.reset();
/// assert!(cache.get("job").unwrap().field("Severity").is_none());
/// # Ok::<(), p4bridge_protocol::spec::DefinitionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SpecDefinitionCache {
    specs: HashMap<String, Arc<SpecDefinition>>,
}

impl SpecDefinitionCache {
    /// Create a cache holding the built-in definitions
    #[must_use]
    pub fn new() -> Self {
        let mut cache = Self {
            specs: HashMap::with_capacity(BUILTIN_SPECS.len()),
        };
        cache.load_builtins();
        cache
    }

    /// Definition registered for a type
    #[must_use]
    pub fn get(&self, spec_type: &str) -> Option<Arc<SpecDefinition>> {
        self.specs.get(spec_type).cloned()
    }

    /// Whether a definition is registered for a type
    #[must_use]
    pub fn contains(&self, spec_type: &str) -> bool {
        self.specs.contains_key(spec_type)
    }

    /// Register definition text for a type, replacing any previous definition
    ///
    /// Re-registering identical text is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] if the text does not parse; the previous
    /// definition for the type is kept.
    pub fn put(
        &mut self,
        spec_type: &str,
        raw: &str,
    ) -> Result<Arc<SpecDefinition>, DefinitionError> {
        if let Some(existing) = self.specs.get(spec_type)
            && existing.raw() == raw
        {
            return Ok(Arc::clone(existing));
        }

        let def = Arc::new(SpecDefinition::parse(raw)?);
        debug!(spec_type, fields = def.len(), "Registered spec definition");
        self.specs.insert(spec_type.to_owned(), Arc::clone(&def));
        Ok(def)
    }

    /// Drop all server-supplied definitions and restore the built-ins
    pub fn reset(&mut self) {
        self.specs.clear();
        self.load_builtins();
    }

    /// Registered type names, in no particular order
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    fn load_builtins(&mut self) {
        for (spec_type, raw) in BUILTIN_SPECS {
            match SpecDefinition::parse(raw) {
                Ok(def) => {
                    self.specs.insert((*spec_type).to_owned(), Arc::new(def));
                }
                Err(e) => error!(spec_type, error = %e, "Built-in spec definition is malformed"),
            }
        }
    }
}

impl Default for SpecDefinitionCache {
    fn default() -> Self {
        Self::new()
    }
}
