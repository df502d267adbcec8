//! CLI layer for locale-overlay.
//!
//! Provides the command-line interface using clap, with commands for
//! initializing the database and writing, reading and finding records.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
