//! Error types for locale-overlay operations.
//!
//! This module provides the error hierarchy using `thiserror` for
//! registration, payload validation, storage, and CLI commands.

use thiserror::Error;

/// Result type alias for locale-overlay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-related errors (database operations).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A declared translatable attribute was supplied in the wrong shape.
    ///
    /// Raised by the attribute splitter; aborts the enclosing write.
    #[error("invalid format for attribute `{attribute}`: {reason}")]
    InvalidFormat {
        /// Name of the offending attribute.
        attribute: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// Configuration errors (record type declarations, config files).
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),
}

impl Error {
    /// Builds a configuration error from any message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Builds an invalid-format error for an attribute.
    pub fn invalid_format(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}

/// Storage-specific errors for database operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database error, carrying the engine's own message.
    #[error("database error: {0}")]
    Database(String),

    /// Storage not initialized (init command not run).
    #[error("database not initialized. Run: locale-overlay init")]
    NotInitialized,

    /// Record not found by ID.
    #[error("{record_type} record not found: {id}")]
    RecordNotFound {
        /// Record type name.
        record_type: String,
        /// Record ID that was not found.
        id: i64,
    },

    /// A payload or criteria key that is not a declared column.
    #[error("unknown column `{column}` for record type {record_type}")]
    UnknownColumn {
        /// Record type name.
        record_type: String,
        /// Column name that was not declared.
        column: String,
    },

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
