//! Core domain models for locale-overlay.
//!
//! This module contains the fundamental data structures: records, their
//! per-locale variant rows, record type declarations and the registry, and
//! the locale context. These are pure domain models with no I/O
//! dependencies.

pub mod locale;
pub mod record;
pub mod record_type;
pub mod registry;
pub mod variant;

pub use locale::{DEFAULT_LOCALE, FallbackPolicy, LocaleContext};
pub use record::{Fields, Record};
pub use record_type::{AttributeKind, ColumnDef, ColumnKind, RecordType, RecordTypeBuilder};
pub use registry::Registry;
pub use variant::LocaleVariant;
