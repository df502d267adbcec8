//! Translatable attribute handling.
//!
//! Splitting write payloads into base and per-locale parts, resolving
//! attribute values under a fallback policy, and writing both tables in one
//! transaction.

pub mod resolver;
pub mod splitter;
pub mod writer;

pub use resolver::{LocaleResolver, pick};
pub use splitter::{SplitPayload, split_attributes};
pub use writer::TranslationWriter;
