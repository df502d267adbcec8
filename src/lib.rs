//! # locale-overlay
//!
//! Locale-variant attribute overlay for records in a relational store.
//!
//! Each record type keeps its locale-invariant fields in a base table and
//! the values of its translatable attributes in a companion table holding
//! one row per (record, locale). Reads resolve an attribute for a locale
//! with an optional fallback, and queries filter base records by
//! translation values through `EXISTS` sub-queries.
//!
//! ## Features
//!
//! - **Attribute splitting**: write payloads carry translatable attributes as
//!   `locale -> value` maps and are split into base and variant rows
//! - **Transactional writes**: create, update, first-or-create and
//!   update-or-create touch both tables atomically
//! - **Fallback resolution**: `none`, `app-default` or `first-available`
//! - **Translation predicates**: single-locale and any-locale filters, AND/OR
//! - **`SQLite` storage**: foreign-key cascades and per-locale upserts

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod query;
pub mod storage;
pub mod translatable;
pub mod translator;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{
    FallbackPolicy, Fields, LocaleContext, LocaleVariant, Record, RecordType, Registry,
};

// Re-export configuration and facade
pub use config::Config;
pub use translator::Translator;

// Re-export query types
pub use query::{Operator, Query};

// Re-export storage types
pub use storage::{DEFAULT_DB_PATH, SqliteStorage, Storage};

// Re-export translatable components
pub use translatable::{LocaleResolver, TranslationWriter, split_attributes};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
