//! Configuration for locale-overlay.
//!
//! Options are read from a JSON file (camelCase keys) and may be overridden
//! from the environment. The file also carries the record type declarations
//! the CLI registers.

use crate::core::{ColumnDef, DEFAULT_LOCALE, FallbackPolicy, RecordType, Registry};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`Config::fallback`].
pub const ENV_FALLBACK: &str = "LOCALE_OVERLAY_FALLBACK";

/// Environment variable overriding [`Config::default_locale`].
pub const ENV_DEFAULT_LOCALE: &str = "LOCALE_OVERLAY_DEFAULT_LOCALE";

/// Environment variable overriding [`Config::auto_load`].
pub const ENV_AUTO_LOAD: &str = "LOCALE_OVERLAY_AUTO_LOAD";

/// Library options.
///
/// # Examples
///
/// ```
/// use locale_overlay::config::Config;
/// use locale_overlay::core::FallbackPolicy;
///
/// let config = Config::from_json_str(r#"{"fallback": "app-default", "defaultLocale": "fr"}"#)
///     .unwrap();
/// assert_eq!(config.fallback, FallbackPolicy::AppDefault);
/// assert_eq!(config.default_locale, "fr");
/// assert!(!config.auto_load);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Eagerly load variant rows on every fetch through the facade.
    pub auto_load: bool,

    /// Fallback policy applied when a locale has no row.
    pub fallback: FallbackPolicy,

    /// Application default locale.
    pub default_locale: String,

    /// Record type declarations.
    pub record_types: Vec<RecordTypeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_load: false,
            fallback: FallbackPolicy::None,
            default_locale: DEFAULT_LOCALE.to_string(),
            record_types: Vec::new(),
        }
    }
}

impl Config {
    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), types = config.record_types.len(), "loaded config");
        Ok(config)
    }

    /// Parses a JSON config document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is malformed.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::config(format!("invalid config: {e}")))
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an override cannot be parsed.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a lookup function keyed by environment
    /// variable name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an override cannot be parsed.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_FALLBACK) {
            self.fallback = value.parse()?;
        }
        if let Some(value) = lookup(ENV_DEFAULT_LOCALE) {
            let value = value.trim();
            if value.is_empty() {
                return Err(Error::config(format!("{ENV_DEFAULT_LOCALE} is empty")));
            }
            self.default_locale = value.to_string();
        }
        if let Some(value) = lookup(ENV_AUTO_LOAD) {
            self.auto_load = parse_flag(ENV_AUTO_LOAD, &value)?;
        }
        Ok(self)
    }

    /// Builds a registry from the declared record types.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid or conflicting
    /// declaration.
    pub fn registry(&self) -> Result<Registry> {
        let mut registry = Registry::new();
        for declared in &self.record_types {
            registry.register(declared.build()?)?;
        }
        Ok(registry)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

/// A record type declaration as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTypeConfig {
    /// Record type name.
    pub name: String,

    /// Base table; defaults to the type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Variant table; defaults to `<table>_translations`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_table: Option<String>,

    /// Foreign key column on the variant table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    /// Locale-invariant columns.
    #[serde(default)]
    pub columns: Vec<ColumnDef>,

    /// Translatable attribute names. Required.
    #[serde(default)]
    pub translatable: Option<Vec<String>>,
}

impl RecordTypeConfig {
    /// Builds the validated record type.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the declaration is invalid.
    pub fn build(&self) -> Result<RecordType> {
        let mut builder = RecordType::builder(&self.name).columns(self.columns.iter().cloned());
        if let Some(table) = &self.table {
            builder = builder.table(table);
        }
        if let Some(table) = &self.variant_table {
            builder = builder.variant_table(table);
        }
        if let Some(column) = &self.foreign_key {
            builder = builder.foreign_key(column);
        }
        if let Some(names) = &self.translatable {
            builder = builder.translatable(names.iter().cloned());
        }
        builder.build()
    }
}
