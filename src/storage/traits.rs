//! Storage trait definition.
//!
//! Defines the storage-engine interface the overlay needs: atomic
//! transactions, base CRUD, variant row access with an atomic upsert keyed
//! by (record, locale), and query execution.

use crate::core::{Fields, LocaleVariant, Record, RecordType, Registry};
use crate::error::Result;
use crate::query::Query;
use serde::Serialize;

/// Trait for persistent storage backends.
///
/// Every method taking `&self` participates in the transaction opened by
/// [`Storage::atomically`] when called from inside its closure.
pub trait Storage {
    /// Initializes storage: bookkeeping schema plus the tables of every
    /// registered record type.
    ///
    /// Should be idempotent - safe to call multiple times.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    fn init(&mut self, registry: &Registry) -> Result<()>;

    /// Checks if storage is initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn is_initialized(&self) -> Result<bool>;

    /// Deletes every record of every registered type, preserving the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn reset(&mut self, registry: &Registry) -> Result<()>;

    /// Runs `f` inside one transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back and returns the original
    /// error otherwise. Calls nested inside an open transaction join it.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a storage error if the transaction
    /// cannot be opened or committed.
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
        Self: Sized;

    // ==================== Record Operations ====================

    /// Inserts a base row and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error for undeclared columns or constraint violations.
    fn insert_record(&self, ty: &RecordType, fields: &Fields) -> Result<i64>;

    /// Updates base columns of a row.
    ///
    /// Returns whether the row exists (and was updated).
    ///
    /// # Errors
    ///
    /// Returns an error for undeclared columns or constraint violations.
    fn update_record(&self, ty: &RecordType, id: i64, fields: &Fields) -> Result<bool>;

    /// Retrieves a record by ID, without translations.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_record(&self, ty: &RecordType, id: i64) -> Result<Option<Record>>;

    /// Runs a query and returns matching records, without translations.
    ///
    /// # Errors
    ///
    /// Returns an error if the query does not compile or fails.
    fn select_records(&self, query: &Query<'_>) -> Result<Vec<Record>>;

    /// Deletes a record; its variant rows go with it through the cascade.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn delete_record(&self, ty: &RecordType, id: i64) -> Result<bool>;

    /// Counts base rows of a type.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    fn record_count(&self, ty: &RecordType) -> Result<usize>;

    // ==================== Variant Operations ====================

    /// Loads a record's variant rows, ordered by row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn load_variants(&self, ty: &RecordType, record_id: i64) -> Result<Vec<LocaleVariant>>;

    /// Inserts a new variant row and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the row already exists for (record, locale) or the
    /// insert fails.
    fn insert_variant(&self, ty: &RecordType, variant: &LocaleVariant) -> Result<i64>;

    /// Inserts or merges a variant row keyed by (record, locale).
    ///
    /// Only the attributes present in `variant.values` are written; other
    /// columns of an existing row keep their values.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    fn upsert_variant(&self, ty: &RecordType, variant: &LocaleVariant) -> Result<()>;

    /// Deletes a record's variant rows for the given locales (all when empty).
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn delete_variants(&self, ty: &RecordType, record_id: i64, locales: &[String])
    -> Result<usize>;

    /// Counts variant rows of a type, optionally for one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    fn variant_count(&self, ty: &RecordType, record_id: Option<i64>) -> Result<usize>;

    // ==================== Utility Operations ====================

    /// Gets storage statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    fn stats(&self, registry: &Registry) -> Result<StorageStats>;
}

/// Storage statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    /// Per record type counts.
    pub record_types: Vec<RecordTypeStats>,
    /// Schema version.
    pub schema_version: u32,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
}

/// Row counts for one record type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordTypeStats {
    /// Record type name.
    pub name: String,
    /// Number of base rows.
    pub records: usize,
    /// Number of variant rows.
    pub variants: usize,
    /// Distinct locales present, sorted.
    pub locales: Vec<String>,
}
