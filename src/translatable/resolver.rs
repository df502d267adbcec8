//! Locale resolution with fallback.
//!
//! Variant rows are loaded once per [`Record`] instance, on first access,
//! and reused until the instance's cache is invalidated.

use crate::core::{
    AttributeKind, FallbackPolicy, LocaleContext, LocaleVariant, Record, RecordType, Registry,
};
use crate::error::{Error, Result};
use crate::storage::Storage;
use serde_json::Value;
use std::collections::BTreeMap;

/// Picks an attribute value from loaded rows.
///
/// Looks for the requested locale first, then applies `fallback`. A row that
/// exists for the requested locale ends the search even when its value is
/// null. `first-available` takes the first row, in load order, holding a
/// value for the attribute.
#[must_use]
pub fn pick<'v>(
    rows: &'v [LocaleVariant],
    attribute: &str,
    requested: &str,
    fallback: FallbackPolicy,
    default_locale: &str,
) -> Option<&'v Value> {
    if let Some(row) = rows.iter().find(|row| row.is_locale(requested)) {
        return row.get(attribute);
    }

    match fallback {
        FallbackPolicy::None => None,
        FallbackPolicy::AppDefault => rows
            .iter()
            .find(|row| row.is_locale(default_locale))
            .and_then(|row| row.get(attribute)),
        FallbackPolicy::FirstAvailable => rows.iter().find_map(|row| row.get(attribute)),
    }
}

/// Resolves translatable attributes of records under a fallback policy.
#[derive(Debug, Clone, Copy)]
pub struct LocaleResolver<'a> {
    registry: &'a Registry,
    fallback: FallbackPolicy,
}

impl<'a> LocaleResolver<'a> {
    /// Creates a resolver over the registered types.
    #[must_use]
    pub const fn new(registry: &'a Registry, fallback: FallbackPolicy) -> Self {
        Self { registry, fallback }
    }

    /// The fallback policy in effect.
    #[must_use]
    pub const fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    fn translatable_type(&self, record: &Record, attribute: &str) -> Result<&'a RecordType> {
        let ty = self.registry.get(&record.record_type)?;
        if ty.is_translatable(attribute) {
            Ok(ty)
        } else {
            Err(Error::config(format!(
                "{attribute} is not a translatable attribute of {}",
                ty.name()
            )))
        }
    }

    /// Loads the record's variant rows unless this instance already holds
    /// them, and returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unregistered or the load fails.
    pub fn ensure_loaded<'r, S>(&self, storage: &S, record: &'r mut Record) -> Result<&'r [LocaleVariant]>
    where
        S: Storage + ?Sized,
    {
        if record.translations.is_none() {
            let ty = self.registry.get(&record.record_type)?;
            let rows = storage.load_variants(ty, record.id)?;
            record.set_translations(rows);
        }
        Ok(record.translations.get_or_insert_with(Vec::new).as_slice())
    }

    /// Reloads the record's variant rows regardless of the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unregistered or the load fails.
    pub fn refresh<S>(&self, storage: &S, record: &mut Record) -> Result<()>
    where
        S: Storage + ?Sized,
    {
        record.invalidate_translations();
        self.ensure_loaded(storage, record)?;
        Ok(())
    }

    /// Returns the value of `attribute` for `locale`, applying the fallback
    /// policy; `ctx` supplies the default locale.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the attribute is not translatable
    /// for the record's type, or a storage error if loading fails.
    pub fn resolve<S>(
        &self,
        storage: &S,
        record: &mut Record,
        attribute: &str,
        locale: &str,
        ctx: &LocaleContext,
    ) -> Result<Option<Value>>
    where
        S: Storage + ?Sized,
    {
        self.translatable_type(record, attribute)?;
        let fallback = self.fallback;
        let rows = self.ensure_loaded(storage, record)?;
        let value = pick(rows, attribute, locale, fallback, ctx.default_locale()).cloned();
        if value.is_none() && fallback != FallbackPolicy::None {
            tracing::debug!(
                record_type = %record.record_type,
                id = record.id,
                attribute,
                locale,
                %fallback,
                "no value after fallback"
            );
        }
        Ok(value)
    }

    /// Returns every loaded locale's value of `attribute`, skipping nulls.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the attribute is not translatable
    /// for the record's type, or a storage error if loading fails.
    pub fn all_locales<S>(
        &self,
        storage: &S,
        record: &mut Record,
        attribute: &str,
    ) -> Result<BTreeMap<String, Value>>
    where
        S: Storage + ?Sized,
    {
        self.translatable_type(record, attribute)?;
        let rows = self.ensure_loaded(storage, record)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(attribute).map(|v| (row.locale.clone(), v.clone())))
            .collect())
    }

    /// Returns the whole row for a locale, without fallback.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails.
    pub fn translation<S>(
        &self,
        storage: &S,
        record: &mut Record,
        locale: &str,
    ) -> Result<Option<LocaleVariant>>
    where
        S: Storage + ?Sized,
    {
        let rows = self.ensure_loaded(storage, record)?;
        Ok(rows.iter().find(|row| row.is_locale(locale)).cloned())
    }

    /// Whether a row exists for the locale.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails.
    pub fn has_translation<S>(&self, storage: &S, record: &mut Record, locale: &str) -> Result<bool>
    where
        S: Storage + ?Sized,
    {
        let rows = self.ensure_loaded(storage, record)?;
        Ok(rows.iter().any(|row| row.is_locale(locale)))
    }

    /// Locale codes of the loaded rows, in load order.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails.
    pub fn locales<S>(&self, storage: &S, record: &mut Record) -> Result<Vec<String>>
    where
        S: Storage + ?Sized,
    {
        let rows = self.ensure_loaded(storage, record)?;
        Ok(rows.iter().map(|row| row.locale.clone()).collect())
    }

    /// Reads any attribute by name through the type's lookup table: base
    /// columns come from the record, translatable attributes resolve under
    /// the context's current locale, unknown names are absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unregistered or loading fails.
    pub fn get_attribute<S>(
        &self,
        storage: &S,
        record: &mut Record,
        name: &str,
        ctx: &LocaleContext,
    ) -> Result<Option<Value>>
    where
        S: Storage + ?Sized,
    {
        let ty = self.registry.get(&record.record_type)?;
        match ty.attribute_kind(name) {
            Some(AttributeKind::Column) => Ok(record.field(name).cloned()),
            Some(AttributeKind::Translated) => {
                self.resolve(storage, record, name, ctx.current(), ctx)
            }
            None => Ok(None),
        }
    }
}
