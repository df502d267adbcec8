//! Base records.
//!
//! A [`Record`] holds the locale-invariant fields of one row in a base table,
//! plus a per-instance cache slot for its variant rows.

use crate::core::variant::LocaleVariant;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute name to value mapping used for payloads and row fields.
pub type Fields = Map<String, Value>;

/// A persisted base record.
///
/// # Examples
///
/// ```
/// use locale_overlay::core::{Fields, Record};
///
/// let mut fields = Fields::new();
/// fields.insert("sku".to_string(), "LP-1".into());
/// let record = Record::new("product", 1, fields);
/// assert!(!record.translations_loaded());
/// assert_eq!(record.field("sku"), Some(&"LP-1".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Registered record type name.
    pub record_type: String,

    /// Row identifier.
    pub id: i64,

    /// Locale-invariant column values.
    pub fields: Fields,

    /// Loaded variant rows, in load order. `None` until first loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<Vec<LocaleVariant>>,
}

impl Record {
    /// Creates a record without loaded translations.
    pub fn new(record_type: impl Into<String>, id: i64, fields: Fields) -> Self {
        Self {
            record_type: record_type.into(),
            id,
            fields,
            translations: None,
        }
    }

    /// Returns a base field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Whether variant rows have been loaded for this instance.
    #[must_use]
    pub const fn translations_loaded(&self) -> bool {
        self.translations.is_some()
    }

    /// Returns the loaded variant rows, if any were loaded.
    #[must_use]
    pub fn loaded_translations(&self) -> Option<&[LocaleVariant]> {
        self.translations.as_deref()
    }

    /// Stores freshly loaded variant rows on this instance.
    pub fn set_translations(&mut self, rows: Vec<LocaleVariant>) {
        self.translations = Some(rows);
    }

    /// Drops the cached variant rows so the next read reloads them.
    pub fn invalidate_translations(&mut self) {
        self.translations = None;
    }

    /// Returns the loaded row for a locale, without fallback.
    #[must_use]
    pub fn loaded_translation(&self, locale: &str) -> Option<&LocaleVariant> {
        self.translations
            .as_deref()
            .and_then(|rows| rows.iter().find(|row| row.is_locale(locale)))
    }
}
