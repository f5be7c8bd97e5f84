//! Error types for the store crate.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Display-name encoding/decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A permission identifier was assigned before being created.
    #[error("unknown permission `{name}` (guard `{guard}`)")]
    UnknownPermission { name: String, guard: String },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking task or lock failed.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
