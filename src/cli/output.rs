//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::core::{Fields, Record};
use crate::error::{Error, StorageError};
use crate::storage::traits::StorageStats;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &StorageStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &StorageStats) -> String {
    let mut output = String::new();
    output.push_str("locale-overlay status\n");
    output.push_str("=====================\n\n");
    if stats.record_types.is_empty() {
        output.push_str("  No record types configured.\n");
    }
    for ty in &stats.record_types {
        let locales = if ty.locales.is_empty() {
            "-".to_string()
        } else {
            ty.locales.join(", ")
        };
        let _ = writeln!(output, "  {}", ty.name);
        let _ = writeln!(output, "    Records:       {}", ty.records);
        let _ = writeln!(output, "    Translations:  {}", ty.variants);
        let _ = writeln!(output, "    Locales:       {locales}");
    }
    output.push('\n');
    let _ = writeln!(output, "  Schema:        v{}", stats.schema_version);
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:       {size} bytes");
    }
    output
}

/// Formats the result of a write command.
#[must_use]
pub fn format_written(action: &str, record: &Record, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let locales: Vec<&str> = record
                .loaded_translations()
                .unwrap_or_default()
                .iter()
                .map(|row| row.locale.as_str())
                .collect();
            let mut output = format!("{action} {} #{}", record.record_type, record.id);
            if !locales.is_empty() {
                let _ = write!(output, " [{}]", locales.join(", "));
            }
            output.push('\n');
            output
        }
        OutputFormat::Json => format_json(record),
    }
}

/// Formats a record with its translatable attributes.
///
/// Each attribute maps either to a resolved value or, when showing every
/// locale, to an object of locale to value.
#[must_use]
pub fn format_record(record: &Record, attributes: &Fields, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_record_text(record, attributes),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct RecordWithAttributes<'a> {
                record_type: &'a str,
                id: i64,
                fields: &'a Fields,
                translations: &'a Fields,
            }
            format_json(&RecordWithAttributes {
                record_type: &record.record_type,
                id: record.id,
                fields: &record.fields,
                translations: attributes,
            })
        }
    }
}

fn format_record_text(record: &Record, attributes: &Fields) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{} #{}", record.record_type, record.id);
    for (name, value) in &record.fields {
        let _ = writeln!(output, "  {name}: {}", display_value(value));
    }
    for (name, value) in attributes {
        match value {
            Value::Object(per_locale) => {
                for (locale, localized) in per_locale {
                    let _ = writeln!(output, "  {name}[{locale}]: {}", display_value(localized));
                }
            }
            other => {
                let _ = writeln!(output, "  {name}: {}", display_value(other));
            }
        }
    }
    output
}

/// Formats a list of matched records.
#[must_use]
pub fn format_record_list(records: &[Record], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_record_list_text(records),
        OutputFormat::Json => format_json(&records),
    }
}

fn format_record_list_text(records: &[Record]) -> String {
    if records.is_empty() {
        return "No records found.\n".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(output, "{:<8} Fields", "ID");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for record in records {
        let fields = serde_json::to_string(&record.fields).unwrap_or_default();
        let _ = writeln!(output, "{:<8} {}", record.id, truncate(&fields, 50));
    }
    let _ = writeln!(output, "\n{} record(s)", records.len());
    output
}

/// Formats an error for the given output format.
///
/// JSON errors carry a machine-readable `type` next to the message.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            let kind = match error {
                Error::InvalidFormat { .. } => "invalid_format",
                Error::Config { .. } => "configuration",
                Error::Storage(StorageError::NotInitialized) => "not_initialized",
                Error::Storage(StorageError::RecordNotFound { .. }) => "not_found",
                Error::Storage(_) => "storage",
                Error::Command(_) => "command",
            };
            format_json(&serde_json::json!({
                "error": {"type": kind, "message": error.to_string()}
            }))
        }
    }
}

/// Renders a value without quoting plain strings.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    json.push('\n');
    json
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
