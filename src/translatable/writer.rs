//! Transactional writes across base and variant rows.
//!
//! Every public entry point runs its whole body inside one
//! [`Storage::atomically`] call: a failure anywhere, payload validation
//! included, rolls back the base row and every variant row written so far.

use crate::core::{Fields, LocaleContext, LocaleVariant, Record, RecordType, Registry};
use crate::error::{Error, Result, StorageError};
use crate::query::Query;
use crate::storage::Storage;
use crate::translatable::splitter::split_attributes;
use serde_json::Value;

/// Orchestrates create/update/first-or-create/update-or-create.
#[derive(Debug, Clone, Copy)]
pub struct TranslationWriter<'a> {
    registry: &'a Registry,
}

impl<'a> TranslationWriter<'a> {
    /// Creates a writer over the registered types.
    #[must_use]
    pub const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Creates a record and one variant row per locale in the payload.
    ///
    /// Returns the stored record with its variant rows loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] for a malformed translatable
    /// attribute, or the storage error that aborted the write. Either way no
    /// rows are left behind.
    pub fn create<S: Storage>(
        &self,
        storage: &S,
        record_type: &str,
        payload: &Fields,
    ) -> Result<Record> {
        let ty = self.registry.get(record_type)?;
        storage.atomically(|s| create_in(s, ty, payload))
    }

    /// Applies base changes and upserts variant rows for the locales present
    /// in the payload; other locales and unmentioned attributes are left
    /// as they are.
    ///
    /// Returns whether the base row was found and updated. When it was not,
    /// no variant rows are written. The record's fields and cached variant
    /// rows are refreshed afterward.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] for a malformed translatable
    /// attribute, or the storage error that aborted the write.
    pub fn update<S: Storage>(
        &self,
        storage: &S,
        record: &mut Record,
        payload: &Fields,
    ) -> Result<bool> {
        let ty = self.registry.get(&record.record_type)?;
        storage.atomically(|s| update_in(s, ty, record, payload))
    }

    /// Returns the first record matching `criteria`, or creates one from
    /// `criteria` merged with `extra`.
    ///
    /// When a match exists nothing is written, so translations in `extra`
    /// are not applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] for malformed translatable criteria
    /// or payload, or the storage error that aborted the lookup or write.
    pub fn first_or_create<S: Storage>(
        &self,
        storage: &S,
        record_type: &str,
        criteria: &Fields,
        extra: &Fields,
    ) -> Result<Record> {
        let ty = self.registry.get(record_type)?;
        storage.atomically(|s| {
            if let Some(mut record) = find_first(s, ty, criteria)? {
                record.set_translations(s.load_variants(ty, record.id)?);
                return Ok(record);
            }
            create_in(s, ty, &merge(ty, criteria, extra))
        })
    }

    /// Updates the first record matching `criteria` with `criteria` merged
    /// with `extra`, or creates one from the same merged payload.
    ///
    /// Returns the record with its variant rows loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] for malformed translatable criteria
    /// or payload, or the storage error that aborted the lookup or write.
    pub fn update_or_create<S: Storage>(
        &self,
        storage: &S,
        record_type: &str,
        criteria: &Fields,
        extra: &Fields,
    ) -> Result<Record> {
        let ty = self.registry.get(record_type)?;
        let merged = merge(ty, criteria, extra);
        storage.atomically(|s| match find_first(s, ty, criteria)? {
            Some(mut record) => {
                update_in(s, ty, &mut record, &merged)?;
                Ok(record)
            }
            None => create_in(s, ty, &merged),
        })
    }

    /// Deletes a record; its variant rows go with it through the storage
    /// cascade.
    ///
    /// # Errors
    ///
    /// Returns the storage error that aborted the delete.
    pub fn delete<S: Storage>(&self, storage: &S, record: &mut Record) -> Result<bool> {
        let ty = self.registry.get(&record.record_type)?;
        let deleted = storage.atomically(|s| s.delete_record(ty, record.id))?;
        record.invalidate_translations();
        if deleted {
            tracing::info!(record_type = ty.name(), id = record.id, "deleted record");
        }
        Ok(deleted)
    }

    /// Deletes the record's variant rows for `locales` (all when empty) and
    /// refreshes its cached rows.
    ///
    /// # Errors
    ///
    /// Returns the storage error that aborted the delete.
    pub fn delete_translations<S: Storage>(
        &self,
        storage: &S,
        record: &mut Record,
        locales: &[String],
    ) -> Result<usize> {
        let ty = self.registry.get(&record.record_type)?;
        storage.atomically(|s| {
            let deleted = s.delete_variants(ty, record.id, locales)?;
            record.set_translations(s.load_variants(ty, record.id)?);
            Ok(deleted)
        })
    }
}

fn create_in<S: Storage>(s: &S, ty: &RecordType, payload: &Fields) -> Result<Record> {
    let split = split_attributes(ty, payload)?;
    let id = s.insert_record(ty, &split.base)?;
    for (locale, values) in split.translations {
        s.insert_variant(ty, &LocaleVariant::new(id, locale, values))?;
    }

    let mut record = s
        .get_record(ty, id)?
        .ok_or_else(|| StorageError::RecordNotFound {
            record_type: ty.name().to_string(),
            id,
        })?;
    record.set_translations(s.load_variants(ty, id)?);

    tracing::info!(
        record_type = ty.name(),
        id,
        locales = record.translations.as_ref().map_or(0, Vec::len),
        "created record"
    );
    Ok(record)
}

fn update_in<S: Storage>(
    s: &S,
    ty: &RecordType,
    record: &mut Record,
    payload: &Fields,
) -> Result<bool> {
    let split = split_attributes(ty, payload)?;
    let applied = s.update_record(ty, record.id, &split.base)?;
    if !applied {
        tracing::warn!(record_type = ty.name(), id = record.id, "update found no base row");
        record.invalidate_translations();
        return Ok(false);
    }

    for (locale, values) in split.translations {
        s.upsert_variant(ty, &LocaleVariant::new(record.id, locale, values))?;
    }

    if let Some(fresh) = s.get_record(ty, record.id)? {
        record.fields = fresh.fields;
    }
    record.set_translations(s.load_variants(ty, record.id)?);

    tracing::debug!(record_type = ty.name(), id = record.id, "updated record");
    Ok(true)
}

/// Finds the first record whose base columns equal the criteria and, for
/// translatable criteria given as locale maps, whose rows in those locales
/// hold the given values.
fn find_first<S: Storage>(s: &S, ty: &RecordType, criteria: &Fields) -> Result<Option<Record>> {
    let ctx = LocaleContext::default();
    let mut query = Query::new(ty, &ctx).limit(1);

    for (key, value) in criteria {
        if !ty.is_translatable(key) {
            query = query.where_eq(key, value.clone());
            continue;
        }
        let Value::Object(per_locale) = value else {
            return Err(Error::invalid_format(
                key.as_str(),
                "match criteria for a translatable attribute must be a map of locale to value",
            ));
        };
        for (locale, localized) in per_locale {
            query = query.where_translation(key, localized.clone(), Some(locale));
        }
    }

    Ok(s.select_records(&query)?.into_iter().next())
}

/// Criteria overlaid with the extra payload.
///
/// Base keys in `extra` replace the criteria's. Translatable locale maps are
/// merged per locale, so locales named only in the criteria survive and
/// `extra` wins only for a locale both name.
fn merge(ty: &RecordType, criteria: &Fields, extra: &Fields) -> Fields {
    let mut merged = criteria.clone();
    for (key, value) in extra {
        if ty.is_translatable(key)
            && let Value::Object(extra_locales) = value
            && let Some(Value::Object(locales)) = merged.get_mut(key)
        {
            for (locale, localized) in extra_locales {
                locales.insert(locale.clone(), localized.clone());
            }
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDef, ColumnKind};
    use crate::storage::SqliteStorage;
    use serde_json::json;

    fn setup() -> (SqliteStorage, Registry) {
        let mut registry = Registry::new();
        registry
            .register(
                RecordType::builder("product")
                    .table("products")
                    .column(ColumnDef::new("sku", ColumnKind::Text).unique().not_null())
                    .column(ColumnDef::new("price", ColumnKind::Integer))
                    .translatable(["name", "description"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage.init(&registry).unwrap();
        (storage, registry)
    }

    fn fields(v: &Value) -> Fields {
        v.as_object().cloned().unwrap_or_default()
    }

    fn counts(storage: &SqliteStorage, registry: &Registry) -> (usize, usize) {
        let ty = registry.get("product").unwrap();
        (
            storage.record_count(ty).unwrap(),
            storage.variant_count(ty, None).unwrap(),
        )
    }

    #[test]
    fn test_create_writes_one_row_per_locale() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let record = writer
            .create(
                &storage,
                "product",
                &fields(&json!({
                    "sku": "LP-1",
                    "name": {"en": "Laptop", "fr": "Ordinateur"},
                    "description": {"en": "Fast"}
                })),
            )
            .unwrap();

        assert_eq!(record.field("sku"), Some(&json!("LP-1")));
        let rows = record.loaded_translations().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(record.loaded_translation("en").unwrap().get("description"), Some(&json!("Fast")));
        assert_eq!(counts(&storage, &registry), (1, 2));
    }

    #[test]
    fn test_create_invalid_format_leaves_nothing() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let err = writer
            .create(
                &storage,
                "product",
                &fields(&json!({"sku": "LP-1", "name": {"en": "Laptop"}, "description": "oops"})),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
        assert_eq!(counts(&storage, &registry), (0, 0));
    }

    #[test]
    fn test_create_constraint_violation_rolls_back_variants() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        writer
            .create(&storage, "product", &fields(&json!({"sku": "A", "name": {"en": "x"}})))
            .unwrap();

        let err = writer
            .create(&storage, "product", &fields(&json!({"sku": "A", "name": {"en": "y"}})))
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Database(ref m)) if m.contains("UNIQUE")));
        assert_eq!(counts(&storage, &registry), (1, 1));
    }

    #[test]
    fn test_update_merges_per_locale() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let mut record = writer
            .create(
                &storage,
                "product",
                &fields(&json!({
                    "sku": "A",
                    "name": {"en": "Laptop", "fr": "Ordinateur"},
                    "description": {"en": "Fast"}
                })),
            )
            .unwrap();

        let applied = writer
            .update(
                &storage,
                &mut record,
                &fields(&json!({"price": 10, "name": {"en": "Notebook", "de": "Klapprechner"}})),
            )
            .unwrap();
        assert!(applied);
        assert_eq!(record.field("price"), Some(&json!(10)));

        let en = record.loaded_translation("en").unwrap();
        assert_eq!(en.get("name"), Some(&json!("Notebook")));
        assert_eq!(en.get("description"), Some(&json!("Fast")));
        assert_eq!(
            record.loaded_translation("fr").unwrap().get("name"),
            Some(&json!("Ordinateur"))
        );
        assert_eq!(record.loaded_translations().unwrap().len(), 3);
    }

    #[test]
    fn test_update_missing_record_returns_false() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let mut ghost = Record::new("product", 42, Fields::new());
        let applied = writer
            .update(&storage, &mut ghost, &fields(&json!({"name": {"en": "x"}})))
            .unwrap();
        assert!(!applied);
        assert_eq!(counts(&storage, &registry), (0, 0));
    }

    #[test]
    fn test_update_invalid_format_rolls_back_base_change() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let mut record = writer
            .create(&storage, "product", &fields(&json!({"sku": "A", "price": 1})))
            .unwrap();
        let err = writer
            .update(&storage, &mut record, &fields(&json!({"price": 2, "name": 5})))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));

        let ty = registry.get("product").unwrap();
        let stored = storage.get_record(ty, record.id).unwrap().unwrap();
        assert_eq!(stored.field("price"), Some(&json!(1)));
    }

    #[test]
    fn test_first_or_create_ignores_extra_when_found() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let criteria = fields(&json!({"sku": "A"}));

        let first = writer
            .first_or_create(&storage, "product", &criteria, &fields(&json!({"name": {"en": "One"}})))
            .unwrap();
        let second = writer
            .first_or_create(&storage, "product", &criteria, &fields(&json!({"name": {"en": "Two"}})))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            second.loaded_translation("en").unwrap().get("name"),
            Some(&json!("One"))
        );
        assert_eq!(counts(&storage, &registry), (1, 1));
    }

    #[test]
    fn test_first_or_create_matches_translated_criteria() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let created = writer
            .create(&storage, "product", &fields(&json!({"sku": "A", "name": {"fr": "Ordinateur"}})))
            .unwrap();

        let found = writer
            .first_or_create(
                &storage,
                "product",
                &fields(&json!({"name": {"fr": "Ordinateur"}})),
                &Fields::new(),
            )
            .unwrap();
        assert_eq!(found.id, created.id);

        let err = writer
            .first_or_create(&storage, "product", &fields(&json!({"name": "Ordinateur"})), &Fields::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn test_update_or_create_both_paths() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let criteria = fields(&json!({"sku": "A"}));

        let created = writer
            .update_or_create(&storage, "product", &criteria, &fields(&json!({"price": 1, "name": {"en": "One"}})))
            .unwrap();
        let updated = writer
            .update_or_create(&storage, "product", &criteria, &fields(&json!({"price": 2, "name": {"fr": "Un"}})))
            .unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.field("price"), Some(&json!(2)));
        assert_eq!(updated.loaded_translations().unwrap().len(), 2);
        assert_eq!(counts(&storage, &registry), (1, 2));
    }

    #[test]
    fn test_first_or_create_keeps_translated_criteria() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let criteria = fields(&json!({"name": {"fr": "Ordinateur"}}));
        let extra = fields(&json!({"sku": "LP-1", "name": {"en": "Laptop"}}));

        let first = writer
            .first_or_create(&storage, "product", &criteria, &extra)
            .unwrap();
        let second = writer
            .first_or_create(&storage, "product", &criteria, &extra)
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            first.loaded_translation("fr").unwrap().get("name"),
            Some(&json!("Ordinateur"))
        );
        assert_eq!(
            first.loaded_translation("en").unwrap().get("name"),
            Some(&json!("Laptop"))
        );
        assert_eq!(counts(&storage, &registry), (1, 2));
    }

    #[test]
    fn test_update_or_create_keeps_translated_criteria() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let criteria = fields(&json!({"name": {"fr": "Ordinateur"}}));

        let created = writer
            .update_or_create(
                &storage,
                "product",
                &criteria,
                &fields(&json!({"sku": "LP-1", "name": {"en": "Laptop"}})),
            )
            .unwrap();
        let updated = writer
            .update_or_create(
                &storage,
                "product",
                &criteria,
                &fields(&json!({"name": {"en": "Notebook"}})),
            )
            .unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(
            updated.loaded_translation("fr").unwrap().get("name"),
            Some(&json!("Ordinateur"))
        );
        assert_eq!(
            updated.loaded_translation("en").unwrap().get("name"),
            Some(&json!("Notebook"))
        );
        assert_eq!(counts(&storage, &registry), (1, 2));
    }

    #[test]
    fn test_merge_is_per_locale_for_translatable_keys() {
        let (_storage, registry) = setup();
        let ty = registry.get("product").unwrap();
        let merged = merge(
            ty,
            &fields(&json!({"sku": "A", "name": {"fr": "Ordinateur", "en": "Laptop"}})),
            &fields(&json!({"sku": "B", "name": {"en": "Notebook"}})),
        );
        assert_eq!(
            merged,
            fields(&json!({"sku": "B", "name": {"fr": "Ordinateur", "en": "Notebook"}}))
        );
    }

    #[test]
    fn test_delete_cascades() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let mut record = writer
            .create(&storage, "product", &fields(&json!({"sku": "A", "name": {"en": "x", "fr": "y"}})))
            .unwrap();
        assert!(writer.delete(&storage, &mut record).unwrap());
        assert!(!record.translations_loaded());
        assert_eq!(counts(&storage, &registry), (0, 0));
    }

    #[test]
    fn test_delete_translations_refreshes_cache() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let mut record = writer
            .create(&storage, "product", &fields(&json!({"sku": "A", "name": {"en": "x", "fr": "y"}})))
            .unwrap();
        let deleted = writer
            .delete_translations(&storage, &mut record, &["fr".to_string()])
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(record.loaded_translation("fr").is_none());
        assert!(record.loaded_translation("en").is_some());
    }

    #[test]
    fn test_unregistered_type_is_config_error() {
        let (storage, registry) = setup();
        let writer = TranslationWriter::new(&registry);
        let err = writer.create(&storage, "order", &Fields::new()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
