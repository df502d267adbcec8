//! Per-locale variant rows.

use crate::core::record::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One locale's values for a record's translatable attributes.
///
/// Exactly one row exists per (record, locale); the storage layer enforces
/// this with a unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleVariant {
    /// Row identifier (assigned by storage layer).
    pub id: Option<i64>,

    /// ID of the owning record.
    pub record_id: i64,

    /// Locale code, stored as given.
    pub locale: String,

    /// Attribute values for this locale.
    pub values: Fields,
}

impl LocaleVariant {
    /// Creates an unsaved variant row.
    pub fn new(record_id: i64, locale: impl Into<String>, values: Fields) -> Self {
        Self {
            id: None,
            record_id,
            locale: locale.into(),
            values,
        }
    }

    /// Returns the value of an attribute, treating SQL NULL as absent.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute).filter(|v| !v.is_null())
    }

    /// Whether this row belongs to the given locale.
    #[must_use]
    pub fn is_locale(&self, locale: &str) -> bool {
        self.locale == locale
    }
}
