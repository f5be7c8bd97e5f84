//! Error types for role resolution.

use roleforge_store::StoreError;
use thiserror::Error;

/// Errors that can occur while resolving a role spec.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Reading persisted state failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
