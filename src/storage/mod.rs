//! Storage layer for locale-overlay.
//!
//! Provides persistent storage for records and their per-locale variant rows
//! using `SQLite`, with transaction support and referential cascades.

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use schema::{CURRENT_SCHEMA_VERSION, SCHEMA_SQL, create_tables_sql};
pub use sqlite::SqliteStorage;
pub use traits::{RecordTypeStats, Storage, StorageStats};

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".locale-overlay/overlay.db";
