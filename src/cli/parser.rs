//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default config file path relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "locale-overlay.json";

/// locale-overlay: per-locale attribute storage for SQLite records.
///
/// Record types and their translatable attributes are declared in a JSON
/// config file; translatable values are written as `{"<locale>": value}`
/// maps.
#[derive(Parser, Debug)]
#[command(name = "locale-overlay")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the database file.
    ///
    /// Defaults to `.locale-overlay/overlay.db` in the current directory.
    #[arg(short, long = "db", env = "LOCALE_OVERLAY_DB", global = true)]
    pub db_path: Option<PathBuf>,

    /// Path to the JSON config file declaring record types.
    #[arg(
        short,
        long,
        env = "LOCALE_OVERLAY_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        global = true
    )]
    pub config: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the database.
    ///
    /// Creates the database file and the tables of every configured record
    /// type.
    Init {
        /// Force re-initialization (destroys existing data).
        #[arg(short, long)]
        force: bool,
    },

    /// Show row counts per record type.
    Status,

    /// Create a record from a JSON payload.
    Create {
        /// Record type name.
        record_type: String,

        /// JSON object; translatable attributes as locale maps.
        payload: String,
    },

    /// Update a record from a JSON payload.
    Update {
        /// Record type name.
        record_type: String,

        /// Record ID.
        id: i64,

        /// JSON object; only the locales present are written.
        payload: String,
    },

    /// Update the first record matching the criteria, or create one.
    Upsert {
        /// Record type name.
        record_type: String,

        /// JSON object of match criteria.
        criteria: String,

        /// JSON object of values to write.
        #[arg(default_value = "{}")]
        payload: String,
    },

    /// Show a record.
    Get {
        /// Record type name.
        record_type: String,

        /// Record ID.
        id: i64,

        /// Resolve translatable attributes for this locale.
        #[arg(short, long, conflicts_with = "all")]
        locale: Option<String>,

        /// Show every locale's values.
        #[arg(short, long)]
        all: bool,
    },

    /// Find records by a translatable attribute's value.
    Find {
        /// Record type name.
        record_type: String,

        /// Translatable attribute name.
        attribute: String,

        /// Value to compare against (parsed as JSON, else taken as a string).
        value: String,

        /// Comparison operator (=, !=, <, <=, >, >=, like, not like).
        #[arg(long, default_value = "=")]
        op: String,

        /// Only match rows in this locale (defaults to the default locale).
        #[arg(short, long, conflicts_with = "any_locale")]
        locale: Option<String>,

        /// Match rows in any locale.
        #[arg(long)]
        any_locale: bool,

        /// Maximum number of records.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete a record and its translations.
    #[command(alias = "rm")]
    Delete {
        /// Record type name.
        record_type: String,

        /// Record ID.
        id: i64,
    },
}

impl Cli {
    /// Returns the database path, using default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}
