//! Error types for the reconciliation engine.

use std::collections::BTreeSet;

use roleforge_core::ConfigError;
use roleforge_resolve::ResolveError;
use roleforge_store::StoreError;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error (fatal, raised before any write).
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Storage error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Role resolution error.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Syncing a role's membership failed.
    ///
    /// Carries the role identity and the attempted permission set for
    /// operator diagnosis; permission creation up to this point is
    /// idempotent, so re-invocation is the recovery mechanism.
    #[error("failed to sync role `{role}` (guard `{guard}`, {} permissions): {source}", .permissions.len())]
    RoleSync {
        role: String,
        guard: String,
        permissions: BTreeSet<String>,
        source: StoreError,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
