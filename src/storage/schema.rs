//! Database schema definitions.
//!
//! Holds the fixed bookkeeping schema and generates the per-type DDL: one
//! base table and one variant table per registered record type.

use crate::core::RecordType;
use crate::core::record_type::LOCALE_COLUMN;
use std::fmt::Write;

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for the bookkeeping tables.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Record types whose tables exist in this database
CREATE TABLE IF NOT EXISTS record_types (
    name TEXT PRIMARY KEY,
    base_table TEXT NOT NULL,
    variant_table TEXT NOT NULL,
    foreign_key TEXT NOT NULL,
    translatable TEXT NOT NULL,  -- JSON array of attribute names
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
";

/// SQL to check if schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// SQL to record a registered type's layout.
pub const UPSERT_RECORD_TYPE_SQL: &str = r"
INSERT INTO record_types (
    name, base_table, variant_table, foreign_key, translatable, created_at, updated_at
) VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(name) DO UPDATE SET
    base_table = excluded.base_table,
    variant_table = excluded.variant_table,
    foreign_key = excluded.foreign_key,
    translatable = excluded.translatable,
    updated_at = excluded.updated_at;
";

/// SQL to read the stored layout of a record type.
pub const GET_RECORD_TYPE_SQL: &str = r"
SELECT base_table, variant_table, foreign_key, translatable
FROM record_types WHERE name = ?
";

/// Quotes a validated identifier for use in generated SQL.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Generates the base and variant table DDL for a record type.
///
/// The variant table carries the foreign key with `ON DELETE CASCADE` and a
/// unique (foreign key, locale) constraint used as the upsert conflict
/// target.
#[must_use]
pub fn create_tables_sql(ty: &RecordType) -> String {
    let mut sql = String::new();

    let _ = write!(
        sql,
        "CREATE TABLE IF NOT EXISTS {} (\n    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT",
        quote_ident(ty.table())
    );
    for column in ty.columns() {
        let _ = write!(sql, ",\n    {}", quote_ident(&column.name));
        let sql_type = column.kind.sql_type();
        if !sql_type.is_empty() {
            let _ = write!(sql, " {sql_type}");
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if column.unique {
            sql.push_str(" UNIQUE");
        }
    }
    sql.push_str("\n);\n\n");

    let fk = quote_ident(ty.foreign_key());
    let locale = quote_ident(LOCALE_COLUMN);
    let _ = write!(
        sql,
        "CREATE TABLE IF NOT EXISTS {} (\n    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,\n    {fk} INTEGER NOT NULL,\n    {locale} TEXT NOT NULL",
        quote_ident(ty.variant_table())
    );
    for attribute in ty.translatable() {
        let _ = write!(sql, ",\n    {}", quote_ident(attribute));
    }
    let _ = write!(
        sql,
        ",\n    UNIQUE ({fk}, {locale}),\n    FOREIGN KEY ({fk}) REFERENCES {}(\"id\") ON DELETE CASCADE\n);\n\n",
        quote_ident(ty.table())
    );

    let _ = writeln!(
        sql,
        "CREATE INDEX IF NOT EXISTS {} ON {}({locale});",
        quote_ident(&format!("idx_{}_locale", ty.variant_table())),
        quote_ident(ty.variant_table())
    );

    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDef, ColumnKind};

    fn product() -> RecordType {
        RecordType::builder("product")
            .table("products")
            .column(ColumnDef::new("sku", ColumnKind::Text).unique().not_null())
            .column(ColumnDef::new("extra", ColumnKind::Any))
            .translatable(["name", "description"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_sql_not_empty() {
        assert!(!SCHEMA_SQL.is_empty());
        assert!(SCHEMA_SQL.contains("CREATE TABLE"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("name"), "\"name\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_base_table_has_no_translatable_columns() {
        let sql = create_tables_sql(&product());
        let base = sql.split("\n);").next().unwrap();
        assert!(base.contains("\"sku\" TEXT NOT NULL UNIQUE"));
        assert!(base.contains("\"extra\""));
        assert!(!base.contains("\"name\""));
        assert!(!base.contains("\"description\""));
    }

    #[test]
    fn test_variant_table_layout() {
        let sql = create_tables_sql(&product());
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"products_translations\""));
        assert!(sql.contains("UNIQUE (\"record_id\", \"locale\")"));
        assert!(sql.contains("REFERENCES \"products\"(\"id\") ON DELETE CASCADE"));
        assert!(sql.contains("\"name\",\n    \"description\""));
    }
}
