//! Registry of record types, indexed by type name.

use crate::core::record_type::RecordType;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Explicit registration of every record type the overlay manages.
///
/// # Examples
///
/// ```
/// use locale_overlay::core::{RecordType, Registry};
///
/// let mut registry = Registry::new();
/// registry
///     .register(RecordType::builder("post").translatable(["title"]).build().unwrap())
///     .unwrap();
/// assert!(registry.get("post").is_ok());
/// assert!(registry.get("comment").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, RecordType>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record type.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the name or one of the tables is
    /// already taken by another registered type.
    pub fn register(&mut self, record_type: RecordType) -> Result<()> {
        if self.types.contains_key(record_type.name()) {
            return Err(Error::config(format!(
                "record type {} registered twice",
                record_type.name()
            )));
        }
        let mine = [record_type.table(), record_type.variant_table()];
        if let Some(clash) = self
            .types
            .values()
            .find(|other| mine.contains(&other.table()) || mine.contains(&other.variant_table()))
        {
            return Err(Error::config(format!(
                "record types {} and {} share a table",
                clash.name(),
                record_type.name()
            )));
        }
        tracing::debug!(
            record_type = record_type.name(),
            table = record_type.table(),
            variant_table = record_type.variant_table(),
            "registered record type"
        );
        self.types.insert(record_type.name().to_string(), record_type);
        Ok(())
    }

    /// Looks up a registered type.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unregistered name.
    pub fn get(&self, name: &str) -> Result<&RecordType> {
        self.types
            .get(name)
            .ok_or_else(|| Error::config(format!("record type {name} is not registered")))
    }

    /// Iterates over registered types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &RecordType> {
        self.types.values()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
