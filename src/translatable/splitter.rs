//! Attribute splitting.
//!
//! Separates a write payload into the locale-invariant base fields and the
//! per-locale values of the declared translatable attributes.

use crate::core::{Fields, RecordType};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// A payload split into base fields and per-locale variant fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitPayload {
    /// Payload entries that are not translatable.
    pub base: Fields,
    /// Locale code to (attribute to value), across every translatable
    /// attribute present in the payload.
    pub translations: BTreeMap<String, Fields>,
}

impl SplitPayload {
    /// Locales that received at least one value, in sorted order.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(String::as_str)
    }

    /// Whether any translatable attribute was present.
    #[must_use]
    pub fn has_translations(&self) -> bool {
        !self.translations.is_empty()
    }
}

/// Splits `payload` according to the type's translatable declaration.
///
/// Every declared translatable attribute present in the payload must map
/// locale codes to scalars (null, bool, number, string). The payload itself
/// is left untouched.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] naming the first attribute whose value is
/// not a locale map, or whose map holds an array or object.
///
/// # Examples
///
/// ```
/// use locale_overlay::core::RecordType;
/// use locale_overlay::translatable::split_attributes;
/// use serde_json::json;
///
/// let ty = RecordType::builder("product").translatable(["name"]).build().unwrap();
/// let payload = json!({"sku": "LP-1", "name": {"en": "Laptop", "fr": "Ordinateur"}});
/// let split = split_attributes(&ty, payload.as_object().unwrap()).unwrap();
/// assert_eq!(split.base.len(), 1);
/// assert_eq!(split.translations["fr"]["name"], json!("Ordinateur"));
/// ```
pub fn split_attributes(ty: &RecordType, payload: &Fields) -> Result<SplitPayload> {
    let mut split = SplitPayload::default();

    for (key, value) in payload {
        if !ty.is_translatable(key) {
            split.base.insert(key.clone(), value.clone());
            continue;
        }

        let Value::Object(per_locale) = value else {
            return Err(Error::invalid_format(
                key.as_str(),
                format!("expected a map of locale to value, got {}", kind_of(value)),
            ));
        };

        for (locale, localized) in per_locale {
            if localized.is_array() || localized.is_object() {
                return Err(Error::invalid_format(
                    key.as_str(),
                    format!(
                        "value for locale {locale:?} must be a scalar, got {}",
                        kind_of(localized)
                    ),
                ));
            }
            split
                .translations
                .entry(locale.clone())
                .or_default()
                .insert(key.clone(), localized.clone());
        }
    }

    Ok(split)
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
