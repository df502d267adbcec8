//! Single-handle facade over the registry, configuration and components.

use crate::config::Config;
use crate::core::{Fields, LocaleContext, Record, Registry};
use crate::error::Result;
use crate::query::Query;
use crate::storage::Storage;
use crate::translatable::{LocaleResolver, TranslationWriter};
use serde_json::Value;
use std::collections::BTreeMap;

/// Bundles a [`Registry`] and a [`Config`] so callers can write, fetch,
/// query and resolve through one value.
///
/// # Examples
///
/// ```
/// use locale_overlay::Translator;
/// use locale_overlay::config::Config;
/// use locale_overlay::storage::SqliteStorage;
/// use serde_json::json;
///
/// let config = Config::from_json_str(
///     r#"{"fallback": "app-default",
///         "recordTypes": [{"name": "product", "columns": [{"name": "sku"}],
///                          "translatable": ["name"]}]}"#,
/// )
/// .unwrap();
/// let translator = Translator::from_config(config).unwrap();
/// let mut storage = SqliteStorage::in_memory().unwrap();
/// translator.init(&mut storage).unwrap();
///
/// let payload = json!({"sku": "LP-1", "name": {"en": "Laptop", "fr": "Ordinateur"}});
/// let mut record = translator
///     .create(&storage, "product", payload.as_object().unwrap())
///     .unwrap();
///
/// let name = translator.resolve(&storage, &mut record, "name", "de").unwrap();
/// assert_eq!(name, Some(json!("Laptop")));
/// ```
#[derive(Debug, Clone)]
pub struct Translator {
    registry: Registry,
    config: Config,
}

impl Translator {
    /// Creates a facade over an explicit registry.
    #[must_use]
    pub const fn new(registry: Registry, config: Config) -> Self {
        Self { registry, config }
    }

    /// Creates a facade whose registry comes from the config's declarations.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid declaration.
    pub fn from_config(config: Config) -> Result<Self> {
        let registry = config.registry()?;
        Ok(Self::new(registry, config))
    }

    /// The registered record types.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// A context whose current locale is the configured default.
    #[must_use]
    pub fn context(&self) -> LocaleContext {
        LocaleContext::with_default(&self.config.default_locale)
    }

    /// A context switched to `locale`, keeping the configured default.
    #[must_use]
    pub fn context_for(&self, locale: &str) -> LocaleContext {
        LocaleContext::new(locale, &self.config.default_locale)
    }

    /// The writer over this registry.
    #[must_use]
    pub const fn writer(&self) -> TranslationWriter<'_> {
        TranslationWriter::new(&self.registry)
    }

    /// The resolver over this registry with the configured fallback.
    #[must_use]
    pub const fn resolver(&self) -> LocaleResolver<'_> {
        LocaleResolver::new(&self.registry, self.config.fallback)
    }

    /// Creates the bookkeeping and per-type tables.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub fn init<S: Storage>(&self, storage: &mut S) -> Result<()> {
        storage.init(&self.registry)
    }

    /// See [`TranslationWriter::create`].
    ///
    /// # Errors
    ///
    /// Propagates the writer's errors.
    pub fn create<S: Storage>(&self, storage: &S, record_type: &str, payload: &Fields) -> Result<Record> {
        self.writer().create(storage, record_type, payload)
    }

    /// See [`TranslationWriter::update`].
    ///
    /// # Errors
    ///
    /// Propagates the writer's errors.
    pub fn update<S: Storage>(&self, storage: &S, record: &mut Record, payload: &Fields) -> Result<bool> {
        self.writer().update(storage, record, payload)
    }

    /// See [`TranslationWriter::first_or_create`].
    ///
    /// # Errors
    ///
    /// Propagates the writer's errors.
    pub fn first_or_create<S: Storage>(
        &self,
        storage: &S,
        record_type: &str,
        criteria: &Fields,
        extra: &Fields,
    ) -> Result<Record> {
        self.writer()
            .first_or_create(storage, record_type, criteria, extra)
    }

    /// See [`TranslationWriter::update_or_create`].
    ///
    /// # Errors
    ///
    /// Propagates the writer's errors.
    pub fn update_or_create<S: Storage>(
        &self,
        storage: &S,
        record_type: &str,
        criteria: &Fields,
        extra: &Fields,
    ) -> Result<Record> {
        self.writer()
            .update_or_create(storage, record_type, criteria, extra)
    }

    /// See [`TranslationWriter::delete`].
    ///
    /// # Errors
    ///
    /// Propagates the writer's errors.
    pub fn delete<S: Storage>(&self, storage: &S, record: &mut Record) -> Result<bool> {
        self.writer().delete(storage, record)
    }

    /// Fetches a record by id, loading its variant rows when `autoLoad` is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unregistered or the fetch fails.
    pub fn find<S: Storage>(&self, storage: &S, record_type: &str, id: i64) -> Result<Option<Record>> {
        let ty = self.registry.get(record_type)?;
        let Some(mut record) = storage.get_record(ty, id)? else {
            return Ok(None);
        };
        if self.config.auto_load {
            record.set_translations(storage.load_variants(ty, id)?);
        }
        Ok(Some(record))
    }

    /// Starts a query over a record type; translation clauses without an
    /// explicit locale use `ctx`'s current locale.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the type is unregistered.
    pub fn query(&self, record_type: &str, ctx: &LocaleContext) -> Result<Query<'_>> {
        Ok(Query::new(self.registry.get(record_type)?, ctx))
    }

    /// Runs a query, loading variant rows when `autoLoad` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid or the fetch fails.
    pub fn select<S: Storage>(&self, storage: &S, query: &Query<'_>) -> Result<Vec<Record>> {
        let mut records = storage.select_records(query)?;
        if self.config.auto_load {
            let ty = query.record_type();
            for record in &mut records {
                record.set_translations(storage.load_variants(ty, record.id)?);
            }
        }
        Ok(records)
    }

    /// Resolves `attribute` for `locale` under the configured fallback.
    ///
    /// # Errors
    ///
    /// See [`LocaleResolver::resolve`].
    pub fn resolve<S: Storage>(
        &self,
        storage: &S,
        record: &mut Record,
        attribute: &str,
        locale: &str,
    ) -> Result<Option<Value>> {
        let ctx = self.context_for(locale);
        self.resolver()
            .resolve(storage, record, attribute, locale, &ctx)
    }

    /// Every locale's value of `attribute`.
    ///
    /// # Errors
    ///
    /// See [`LocaleResolver::all_locales`].
    pub fn all_locales<S: Storage>(
        &self,
        storage: &S,
        record: &mut Record,
        attribute: &str,
    ) -> Result<BTreeMap<String, Value>> {
        self.resolver().all_locales(storage, record, attribute)
    }

    /// Reads any attribute by name under `ctx`.
    ///
    /// # Errors
    ///
    /// See [`LocaleResolver::get_attribute`].
    pub fn get_attribute<S: Storage>(
        &self,
        storage: &S,
        record: &mut Record,
        name: &str,
        ctx: &LocaleContext,
    ) -> Result<Option<Value>> {
        self.resolver().get_attribute(storage, record, name, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FallbackPolicy;
    use crate::error::Error;
    use crate::storage::SqliteStorage;
    use serde_json::json;

    fn translator(fallback: FallbackPolicy, auto_load: bool) -> (Translator, SqliteStorage) {
        let mut config = Config::from_json_str(
            r#"{"recordTypes": [{"name": "product", "table": "products",
                "columns": [{"name": "sku", "kind": "text"}],
                "translatable": ["name"]}]}"#,
        )
        .unwrap();
        config.fallback = fallback;
        config.auto_load = auto_load;
        let translator = Translator::from_config(config).unwrap();
        let mut storage = SqliteStorage::in_memory().unwrap();
        translator.init(&mut storage).unwrap();
        (translator, storage)
    }

    fn laptop(translator: &Translator, storage: &SqliteStorage) -> Record {
        let payload = json!({"sku": "LP-1", "name": {"en": "Laptop", "fr": "Ordinateur"}});
        translator
            .create(storage, "product", payload.as_object().unwrap())
            .unwrap()
    }

    #[test]
    fn test_find_honors_auto_load() {
        let (lazy, storage) = translator(FallbackPolicy::None, false);
        let id = laptop(&lazy, &storage).id;
        let record = lazy.find(&storage, "product", id).unwrap().unwrap();
        assert!(!record.translations_loaded());

        let (eager, storage) = translator(FallbackPolicy::None, true);
        let id = laptop(&eager, &storage).id;
        let record = eager.find(&storage, "product", id).unwrap().unwrap();
        assert_eq!(record.loaded_translations().map(<[_]>::len), Some(2));

        assert!(eager.find(&storage, "product", id + 100).unwrap().is_none());
    }

    #[test]
    fn test_resolve_with_fallbacks() {
        let (none, storage) = translator(FallbackPolicy::None, false);
        let mut record = laptop(&none, &storage);
        assert_eq!(none.resolve(&storage, &mut record, "name", "de").unwrap(), None);

        let (app, storage) = translator(FallbackPolicy::AppDefault, false);
        let mut record = laptop(&app, &storage);
        assert_eq!(
            app.resolve(&storage, &mut record, "name", "de").unwrap(),
            Some(json!("Laptop"))
        );
    }

    #[test]
    fn test_get_attribute_uses_context() {
        let (translator, storage) = translator(FallbackPolicy::None, false);
        let mut record = laptop(&translator, &storage);

        let fr = translator.context_for("fr");
        assert_eq!(
            translator.get_attribute(&storage, &mut record, "name", &fr).unwrap(),
            Some(json!("Ordinateur"))
        );
        assert_eq!(
            translator.get_attribute(&storage, &mut record, "sku", &fr).unwrap(),
            Some(json!("LP-1"))
        );
        assert_eq!(
            translator.get_attribute(&storage, &mut record, "color", &fr).unwrap(),
            None
        );
    }

    #[test]
    fn test_query_and_select() {
        let (translator, storage) = translator(FallbackPolicy::None, true);
        laptop(&translator, &storage);

        let ctx = translator.context_for("fr");
        let query = translator
            .query("product", &ctx)
            .unwrap()
            .where_translation("name", "Ordinateur", None);
        let found = translator.select(&storage, &query).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].translations_loaded());

        assert!(matches!(
            translator.query("order", &ctx),
            Err(Error::Config { .. })
        ));
    }
}
