//! Error types for the Siphon core library.

use thiserror::Error;

/// Top-level error type for all Siphon operations.
#[derive(Error, Debug)]
pub enum SiphonError {
    /// Datagram payload could not be decoded into a flat JSON record.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// The record named a table that is not in the registry.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A payload value does not fit the declared column.
    #[error("Column mismatch in {table}.{column}: {detail}")]
    ColumnMismatch {
        /// Target table name.
        table: String,
        /// Offending column name.
        column: String,
        /// What went wrong.
        detail: String,
    },

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool exhausted or closed.
    #[error("Pool error: {0}")]
    Pool(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SiphonError {
    /// Stable short name for this error, recorded in the `error_class`
    /// column of error rows so operators can aggregate by kind.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_payload",
            Self::UnknownTable(_) => "unknown_table",
            Self::ColumnMismatch { .. } => "column_mismatch",
            Self::Database(_) => "database",
            Self::Pool(_) => "pool",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SiphonError>;
