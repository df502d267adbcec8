//! `SQLite` storage implementation.
//!
//! Provides persistent storage using `SQLite` with transaction management,
//! foreign-key cascades and `ON CONFLICT` upserts for variant rows.

// SQLite stores all integers as i64. Counts are never negative.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::core::record_type::LOCALE_COLUMN;
use crate::core::{ColumnKind, Fields, LocaleVariant, Record, RecordType, Registry};
use crate::error::{Error, Result, StorageError};
use crate::query::Query;
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_RECORD_TYPE_SQL, GET_VERSION_SQL, SCHEMA_SQL,
    SET_VERSION_SQL, UPSERT_RECORD_TYPE_SQL, create_tables_sql, quote_ident,
};
use crate::storage::traits::{RecordTypeStats, Storage, StorageStats};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// SQLite-based storage implementation.
///
/// # Examples
///
/// ```
/// use locale_overlay::core::{RecordType, Registry};
/// use locale_overlay::storage::{SqliteStorage, Storage};
///
/// let mut registry = Registry::new();
/// registry
///     .register(RecordType::builder("post").translatable(["title"]).build().unwrap())
///     .unwrap();
/// let mut storage = SqliteStorage::in_memory().unwrap();
/// storage.init(&registry).unwrap();
/// assert!(storage.is_initialized().unwrap());
/// ```
pub struct SqliteStorage {
    /// `SQLite` connection.
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Opens or creates a `SQLite` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Database(e.to_string()))?;
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;

        // Cascading deletes of variant rows depend on this
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;

        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;

        tracing::debug!(path = %path.display(), "opened database");

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Creates an in-memory `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;

        Ok(Self { conn, path: None })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Creates the base and variant tables of one record type.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the type was stored earlier with a
    /// different table layout or translatable set, or a storage error if the
    /// DDL fails.
    pub fn ensure_tables(&self, ty: &RecordType) -> Result<()> {
        self.check_stored_layout(ty)?;

        self.conn
            .execute_batch(&create_tables_sql(ty))
            .map_err(StorageError::from)?;

        let translatable = serde_json::to_string(ty.translatable()).map_err(StorageError::from)?;
        let now = Self::now();
        self.conn
            .execute(
                UPSERT_RECORD_TYPE_SQL,
                params![
                    ty.name(),
                    ty.table(),
                    ty.variant_table(),
                    ty.foreign_key(),
                    translatable,
                    now,
                    now
                ],
            )
            .map_err(StorageError::from)?;

        tracing::debug!(record_type = ty.name(), "ensured tables");
        Ok(())
    }

    /// Compares a declaration against the layout recorded by an earlier init.
    fn check_stored_layout(&self, ty: &RecordType) -> Result<()> {
        let stored: Option<(String, String, String, String)> = self
            .conn
            .query_row(GET_RECORD_TYPE_SQL, params![ty.name()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()
            .map_err(StorageError::from)?;

        let Some((base_table, variant_table, foreign_key, translatable)) = stored else {
            return Ok(());
        };

        let mut stored_attrs: Vec<String> =
            serde_json::from_str(&translatable).map_err(StorageError::from)?;
        let mut declared_attrs = ty.translatable().to_vec();
        stored_attrs.sort();
        declared_attrs.sort();

        let mismatch = if base_table != ty.table() {
            Some(format!("base table {base_table} is now {}", ty.table()))
        } else if variant_table != ty.variant_table() {
            Some(format!("variant table {variant_table} is now {}", ty.variant_table()))
        } else if foreign_key != ty.foreign_key() {
            Some(format!("foreign key {foreign_key} is now {}", ty.foreign_key()))
        } else if stored_attrs != declared_attrs {
            Some(format!(
                "translatable attributes [{}] are now [{}]",
                stored_attrs.join(", "),
                declared_attrs.join(", ")
            ))
        } else {
            None
        };

        match mismatch {
            Some(detail) => Err(Error::config(format!(
                "record type {} does not match the stored layout: {detail}",
                ty.name()
            ))),
            None => Ok(()),
        }
    }

    /// Lists the column names of a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma query fails.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .map_err(StorageError::from)?;

        let columns = stmt
            .query_map(params![table], |row| row.get(0))
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(StorageError::from)?;

        Ok(columns)
    }

    /// Gets the current schema version.
    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<String> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;

        Ok(version.and_then(|v| v.parse().ok()))
    }

    /// Sets the schema version.
    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute(SET_VERSION_SQL, params![version.to_string()])
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Returns current Unix timestamp.
    #[allow(clippy::cast_possible_wrap)]
    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn count(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(sql, params_from_iter(params.iter()), |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count as usize)
    }
}

// ==================== Value Conversion ====================

/// Converts a payload value into an `SQLite` value.
///
/// Arrays and objects are stored as JSON text.
fn value_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| n.as_f64().map_or(SqlValue::Null, SqlValue::Real), SqlValue::Integer),
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Converts a stored value back, using the column kind for booleans.
fn value_from_sql(value: ValueRef<'_>, kind: ColumnKind) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if kind == ColumnKind::Boolean => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

fn row_to_record(ty: &RecordType, row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let id: i64 = row.get(0)?;
    let mut fields = Fields::new();
    for (i, column) in ty.columns().iter().enumerate() {
        fields.insert(
            column.name.clone(),
            value_from_sql(row.get_ref(i + 1)?, column.kind),
        );
    }
    Ok(Record::new(ty.name(), id, fields))
}

fn ensure_columns<'a>(
    ty: &RecordType,
    names: impl IntoIterator<Item = &'a String>,
    allowed: impl Fn(&str) -> bool,
) -> Result<()> {
    for name in names {
        if !allowed(name) {
            return Err(StorageError::UnknownColumn {
                record_type: ty.name().to_string(),
                column: name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl Storage for SqliteStorage {
    fn init(&mut self, registry: &Registry) -> Result<()> {
        let is_init: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;

        if is_init == 0 {
            self.conn
                .execute_batch(SCHEMA_SQL)
                .map_err(StorageError::from)?;
            self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
            tracing::info!(version = CURRENT_SCHEMA_VERSION, "initialized schema");
        } else if let Some(current) = self.get_schema_version()?
            && current > CURRENT_SCHEMA_VERSION
        {
            return Err(StorageError::Database(format!(
                "database schema v{current} is newer than supported v{CURRENT_SCHEMA_VERSION}"
            ))
            .into());
        }

        for ty in registry.iter() {
            self.ensure_tables(ty)?;
        }

        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count > 0)
    }

    fn reset(&mut self, registry: &Registry) -> Result<()> {
        self.atomically(|storage| {
            for ty in registry.iter() {
                // Variant rows are deleted via CASCADE
                storage
                    .conn
                    .execute(&format!("DELETE FROM {}", quote_ident(ty.table())), [])
                    .map_err(StorageError::from)?;
            }
            Ok(())
        })
    }

    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
        Self: Sized,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        match f(self) {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| StorageError::Transaction(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                tracing::debug!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }

    // ==================== Record Operations ====================

    fn insert_record(&self, ty: &RecordType, fields: &Fields) -> Result<i64> {
        ensure_columns(ty, fields.keys(), |name| ty.is_column(name))?;

        let sql = if fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(ty.table()))
        } else {
            let columns: Vec<String> = fields.keys().map(|k| quote_ident(k)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(ty.table()),
                columns.join(", "),
                placeholders(fields.len())
            )
        };

        let values: Vec<SqlValue> = fields.values().map(value_to_sql).collect();
        self.conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(StorageError::from)?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!(record_type = ty.name(), id, "inserted record");
        Ok(id)
    }

    fn update_record(&self, ty: &RecordType, id: i64, fields: &Fields) -> Result<bool> {
        ensure_columns(ty, fields.keys(), |name| ty.is_column(name))?;

        if fields.is_empty() {
            let exists = self.count(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE \"id\" = ?",
                    quote_ident(ty.table())
                ),
                &[SqlValue::Integer(id)],
            )?;
            return Ok(exists > 0);
        }

        let assignments: Vec<String> = fields
            .keys()
            .map(|k| format!("{} = ?", quote_ident(k)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = ?",
            quote_ident(ty.table()),
            assignments.join(", ")
        );

        let mut values: Vec<SqlValue> = fields.values().map(value_to_sql).collect();
        values.push(SqlValue::Integer(id));
        let changed = self
            .conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(StorageError::from)?;

        tracing::debug!(record_type = ty.name(), id, changed, "updated record");
        Ok(changed > 0)
    }

    fn get_record(&self, ty: &RecordType, id: i64) -> Result<Option<Record>> {
        let columns: Vec<String> = std::iter::once("id")
            .chain(ty.columns().iter().map(|c| c.name.as_str()))
            .map(quote_ident)
            .collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE \"id\" = ?",
            columns.join(", "),
            quote_ident(ty.table())
        );

        let record = self
            .conn
            .query_row(&sql, params![id], |row| row_to_record(ty, row))
            .optional()
            .map_err(StorageError::from)?;

        Ok(record)
    }

    fn select_records(&self, query: &Query<'_>) -> Result<Vec<Record>> {
        let compiled = query.to_sql()?;
        let ty = query.record_type();
        let values: Vec<SqlValue> = compiled.params.iter().map(value_to_sql).collect();

        let mut stmt = self.conn.prepare(&compiled.sql).map_err(StorageError::from)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), |row| row_to_record(ty, row))
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        tracing::debug!(record_type = ty.name(), matched = records.len(), "selected records");
        Ok(records)
    }

    fn delete_record(&self, ty: &RecordType, id: i64) -> Result<bool> {
        // Variant rows are deleted automatically via CASCADE
        let deleted = self
            .conn
            .execute(
                &format!("DELETE FROM {} WHERE \"id\" = ?", quote_ident(ty.table())),
                params![id],
            )
            .map_err(StorageError::from)?;
        Ok(deleted > 0)
    }

    fn record_count(&self, ty: &RecordType) -> Result<usize> {
        self.count(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(ty.table())),
            &[],
        )
    }

    // ==================== Variant Operations ====================

    fn load_variants(&self, ty: &RecordType, record_id: i64) -> Result<Vec<LocaleVariant>> {
        let attributes: Vec<String> = ty.translatable().iter().map(|a| quote_ident(a)).collect();
        let sql = format!(
            "SELECT \"id\", {}, {} FROM {} WHERE {} = ? ORDER BY \"id\"",
            quote_ident(LOCALE_COLUMN),
            attributes.join(", "),
            quote_ident(ty.variant_table()),
            quote_ident(ty.foreign_key())
        );

        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![record_id], |row| {
                let mut values = Fields::new();
                for (i, attribute) in ty.translatable().iter().enumerate() {
                    values.insert(
                        attribute.clone(),
                        value_from_sql(row.get_ref(i + 2)?, ColumnKind::Any),
                    );
                }
                Ok(LocaleVariant {
                    id: Some(row.get(0)?),
                    record_id,
                    locale: row.get(1)?,
                    values,
                })
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        tracing::debug!(
            record_type = ty.name(),
            record_id,
            rows = rows.len(),
            "loaded variant rows"
        );
        Ok(rows)
    }

    fn insert_variant(&self, ty: &RecordType, variant: &LocaleVariant) -> Result<i64> {
        ensure_columns(ty, variant.values.keys(), |name| ty.is_translatable(name))?;

        let mut columns = vec![quote_ident(ty.foreign_key()), quote_ident(LOCALE_COLUMN)];
        columns.extend(variant.values.keys().map(|k| quote_ident(k)));
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(ty.variant_table()),
            columns.join(", "),
            placeholders(columns.len())
        );

        let mut values = vec![
            SqlValue::Integer(variant.record_id),
            SqlValue::Text(variant.locale.clone()),
        ];
        values.extend(variant.values.values().map(value_to_sql));
        self.conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(StorageError::from)?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!(
            record_type = ty.name(),
            record_id = variant.record_id,
            locale = %variant.locale,
            "inserted variant row"
        );
        Ok(id)
    }

    fn upsert_variant(&self, ty: &RecordType, variant: &LocaleVariant) -> Result<()> {
        ensure_columns(ty, variant.values.keys(), |name| ty.is_translatable(name))?;

        let fk = quote_ident(ty.foreign_key());
        let locale = quote_ident(LOCALE_COLUMN);
        let mut columns = vec![fk.clone(), locale.clone()];
        columns.extend(variant.values.keys().map(|k| quote_ident(k)));

        let conflict = if variant.values.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let assignments: Vec<String> = variant
                .values
                .keys()
                .map(|k| {
                    let column = quote_ident(k);
                    format!("{column} = excluded.{column}")
                })
                .collect();
            format!("DO UPDATE SET {}", assignments.join(", "))
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({fk}, {locale}) {conflict}",
            quote_ident(ty.variant_table()),
            columns.join(", "),
            placeholders(columns.len())
        );

        let mut values = vec![
            SqlValue::Integer(variant.record_id),
            SqlValue::Text(variant.locale.clone()),
        ];
        values.extend(variant.values.values().map(value_to_sql));
        self.conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(StorageError::from)?;

        tracing::debug!(
            record_type = ty.name(),
            record_id = variant.record_id,
            locale = %variant.locale,
            "upserted variant row"
        );
        Ok(())
    }

    fn delete_variants(
        &self,
        ty: &RecordType,
        record_id: i64,
        locales: &[String],
    ) -> Result<usize> {
        let mut sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(ty.variant_table()),
            quote_ident(ty.foreign_key())
        );
        let mut values = vec![SqlValue::Integer(record_id)];
        if !locales.is_empty() {
            sql.push_str(&format!(
                " AND {} IN ({})",
                quote_ident(LOCALE_COLUMN),
                placeholders(locales.len())
            ));
            values.extend(locales.iter().cloned().map(SqlValue::Text));
        }

        let deleted = self
            .conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(StorageError::from)?;
        Ok(deleted)
    }

    fn variant_count(&self, ty: &RecordType, record_id: Option<i64>) -> Result<usize> {
        let table = quote_ident(ty.variant_table());
        match record_id {
            Some(id) => self.count(
                &format!(
                    "SELECT COUNT(*) FROM {table} WHERE {} = ?",
                    quote_ident(ty.foreign_key())
                ),
                &[SqlValue::Integer(id)],
            ),
            None => self.count(&format!("SELECT COUNT(*) FROM {table}"), &[]),
        }
    }

    // ==================== Utility Operations ====================

    fn stats(&self, registry: &Registry) -> Result<StorageStats> {
        let mut record_types = Vec::with_capacity(registry.len());
        for ty in registry.iter() {
            let mut stmt = self
                .conn
                .prepare(&format!(
                    "SELECT DISTINCT {locale} FROM {} ORDER BY {locale}",
                    quote_ident(ty.variant_table()),
                    locale = quote_ident(LOCALE_COLUMN)
                ))
                .map_err(StorageError::from)?;
            let locales = stmt
                .query_map([], |row| row.get(0))
                .map_err(StorageError::from)?
                .collect::<std::result::Result<Vec<String>, _>>()
                .map_err(StorageError::from)?;

            record_types.push(RecordTypeStats {
                name: ty.name().to_string(),
                records: self.record_count(ty)?,
                variants: self.variant_count(ty, None)?,
                locales,
            });
        }

        let schema_version = self.get_schema_version()?.unwrap_or(0);

        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok().map(|m| m.len()));

        Ok(StorageStats {
            record_types,
            schema_version,
            db_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDef, LocaleContext};
    use crate::error::Error;
    use serde_json::json;

    fn product() -> RecordType {
        RecordType::builder("product")
            .table("products")
            .column(ColumnDef::new("sku", ColumnKind::Text).unique().not_null())
            .column(ColumnDef::new("price", ColumnKind::Integer))
            .column(ColumnDef::new("active", ColumnKind::Boolean))
            .translatable(["name", "description"])
            .build()
            .unwrap()
    }

    fn setup() -> (SqliteStorage, Registry) {
        let mut registry = Registry::new();
        registry.register(product()).unwrap();
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage.init(&registry).unwrap();
        (storage, registry)
    }

    fn fields(v: &Value) -> Fields {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_init_idempotent() {
        let (mut storage, registry) = setup();
        assert!(storage.is_initialized().unwrap());
        assert!(storage.init(&registry).is_ok());
    }

    #[test]
    fn test_changed_translatable_set_rejected() {
        let (mut storage, _) = setup();
        let mut changed = Registry::new();
        changed
            .register(
                RecordType::builder("product")
                    .table("products")
                    .column(ColumnDef::new("sku", ColumnKind::Text).unique().not_null())
                    .column(ColumnDef::new("price", ColumnKind::Integer))
                    .column(ColumnDef::new("active", ColumnKind::Boolean))
                    .translatable(["name", "description", "slogan"])
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let err = storage.init(&changed).unwrap_err();
        assert!(matches!(err, Error::Config { ref message } if message.contains("slogan")));
    }

    #[test]
    fn test_reordered_translatable_set_accepted() {
        let (mut storage, _) = setup();
        let mut reordered = Registry::new();
        reordered
            .register(
                RecordType::builder("product")
                    .table("products")
                    .column(ColumnDef::new("sku", ColumnKind::Text).unique().not_null())
                    .translatable(["description", "name"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert!(storage.init(&reordered).is_ok());
    }

    #[test]
    fn test_base_table_lacks_translatable_columns() {
        let (storage, _) = setup();
        let columns = storage.table_columns("products").unwrap();
        assert_eq!(columns, vec!["id", "sku", "price", "active"]);
        let variant_columns = storage.table_columns("products_translations").unwrap();
        assert_eq!(
            variant_columns,
            vec!["id", "record_id", "locale", "name", "description"]
        );
    }

    #[test]
    fn test_record_crud() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();

        let id = storage
            .insert_record(ty, &fields(&json!({"sku": "LP-1", "price": 999, "active": true})))
            .unwrap();
        let record = storage.get_record(ty, id).unwrap().unwrap();
        assert_eq!(record.field("sku"), Some(&json!("LP-1")));
        assert_eq!(record.field("price"), Some(&json!(999)));
        assert_eq!(record.field("active"), Some(&json!(true)));

        assert!(storage.update_record(ty, id, &fields(&json!({"price": 899}))).unwrap());
        assert!(storage.update_record(ty, id, &Fields::new()).unwrap());
        assert!(!storage.update_record(ty, id + 1, &Fields::new()).unwrap());
        let record = storage.get_record(ty, id).unwrap().unwrap();
        assert_eq!(record.field("price"), Some(&json!(899)));

        assert!(storage.delete_record(ty, id).unwrap());
        assert!(storage.get_record(ty, id).unwrap().is_none());
        assert!(!storage.delete_record(ty, id).unwrap());
    }

    #[test]
    fn test_unknown_column_rejected() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();
        let err = storage
            .insert_record(ty, &fields(&json!({"sku": "A", "name": "x"})))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_upsert_merges_supplied_fields_only() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();
        let id = storage.insert_record(ty, &fields(&json!({"sku": "A"}))).unwrap();

        storage
            .insert_variant(
                ty,
                &LocaleVariant::new(id, "en", fields(&json!({"name": "Laptop", "description": "Fast"}))),
            )
            .unwrap();
        storage
            .upsert_variant(ty, &LocaleVariant::new(id, "en", fields(&json!({"name": "Notebook"}))))
            .unwrap();
        storage
            .upsert_variant(ty, &LocaleVariant::new(id, "fr", fields(&json!({"name": "Portable"}))))
            .unwrap();

        let rows = storage.load_variants(ty, id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].locale, "en");
        assert_eq!(rows[0].get("name"), Some(&json!("Notebook")));
        assert_eq!(rows[0].get("description"), Some(&json!("Fast")));
        assert_eq!(rows[1].locale, "fr");
        assert_eq!(rows[1].get("description"), None);
    }

    #[test]
    fn test_duplicate_locale_insert_violates_unique() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();
        let id = storage.insert_record(ty, &fields(&json!({"sku": "A"}))).unwrap();
        let row = LocaleVariant::new(id, "en", fields(&json!({"name": "x"})));
        storage.insert_variant(ty, &row).unwrap();
        let err = storage.insert_variant(ty, &row).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
        assert_eq!(storage.variant_count(ty, Some(id)).unwrap(), 1);
    }

    #[test]
    fn test_cascade_delete() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();
        let id = storage.insert_record(ty, &fields(&json!({"sku": "A"}))).unwrap();
        storage
            .insert_variant(ty, &LocaleVariant::new(id, "en", fields(&json!({"name": "x"}))))
            .unwrap();
        storage.delete_record(ty, id).unwrap();
        assert_eq!(storage.variant_count(ty, None).unwrap(), 0);
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();

        let result: Result<()> = storage.atomically(|s| {
            s.insert_record(ty, &fields(&json!({"sku": "A"})))?;
            Err(Error::invalid_format("name", "boom"))
        });
        assert!(result.is_err());
        assert_eq!(storage.record_count(ty).unwrap(), 0);

        let id = storage
            .atomically(|s| s.insert_record(ty, &fields(&json!({"sku": "B"}))))
            .unwrap();
        assert!(storage.get_record(ty, id).unwrap().is_some());
    }

    #[test]
    fn test_nested_atomically_joins_outer() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();

        let result: Result<()> = storage.atomically(|s| {
            s.atomically(|inner| inner.insert_record(ty, &fields(&json!({"sku": "A"}))))?;
            Err(Error::invalid_format("name", "late failure"))
        });
        assert!(result.is_err());
        assert_eq!(storage.record_count(ty).unwrap(), 0);
    }

    #[test]
    fn test_select_records_by_translation() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();
        let id = storage.insert_record(ty, &fields(&json!({"sku": "A"}))).unwrap();
        storage
            .insert_variant(ty, &LocaleVariant::new(id, "fr", fields(&json!({"name": "Ordinateur"}))))
            .unwrap();
        storage.insert_record(ty, &fields(&json!({"sku": "B"}))).unwrap();

        let ctx = LocaleContext::new("fr", "en");
        let found = storage
            .select_records(&Query::new(ty, &ctx).where_translation("name", "Ordinateur", None))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);

        let untranslated = storage
            .select_records(&Query::new(ty, &ctx).not_translated_in("fr"))
            .unwrap();
        assert_eq!(untranslated.len(), 1);
        assert_eq!(untranslated[0].field("sku"), Some(&json!("B")));
    }

    #[test]
    fn test_delete_variants_by_locale() {
        let (storage, registry) = setup();
        let ty = registry.get("product").unwrap();
        let id = storage.insert_record(ty, &fields(&json!({"sku": "A"}))).unwrap();
        for locale in ["en", "fr", "de"] {
            storage
                .insert_variant(ty, &LocaleVariant::new(id, locale, fields(&json!({"name": locale}))))
                .unwrap();
        }
        assert_eq!(storage.delete_variants(ty, id, &["fr".to_string()]).unwrap(), 1);
        assert_eq!(storage.delete_variants(ty, id, &[]).unwrap(), 2);
    }

    #[test]
    fn test_reset_and_stats() {
        let (mut storage, registry) = setup();
        let ty = registry.get("product").unwrap();
        let id = storage.insert_record(ty, &fields(&json!({"sku": "A"}))).unwrap();
        storage
            .insert_variant(ty, &LocaleVariant::new(id, "fr", fields(&json!({"name": "x"}))))
            .unwrap();
        storage
            .insert_variant(ty, &LocaleVariant::new(id, "en", fields(&json!({"name": "y"}))))
            .unwrap();

        let stats = storage.stats(&registry).unwrap();
        assert_eq!(stats.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(stats.record_types[0].records, 1);
        assert_eq!(stats.record_types[0].variants, 2);
        assert_eq!(stats.record_types[0].locales, vec!["en", "fr"]);

        storage.reset(&registry).unwrap();
        let stats = storage.stats(&registry).unwrap();
        assert_eq!(stats.record_types[0].records, 0);
        assert_eq!(stats.record_types[0].variants, 0);
    }
}
