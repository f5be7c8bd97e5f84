//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal: validation runs before the engine performs
/// any write, so a bad config never leaves partial state behind.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The raw config document could not be deserialized.
    #[error("config parse error: {0}")]
    Parse(String),

    /// Two role entries share a name.
    #[error("duplicate role `{0}`")]
    DuplicateRole(String),

    /// A role entry is malformed.
    #[error("invalid role `{role}`: {reason}")]
    InvalidRole { role: String, reason: String },

    /// An additional operation set is malformed.
    #[error("invalid additional operation set `{set}`: {reason}")]
    InvalidOperationSet { set: String, reason: String },

    /// A default permission is not a parseable identifier.
    #[error("invalid default permission `{0}`: expected `<operation>-<entity-slug>`")]
    InvalidDefaultPermission(String),

    /// The default guard name is empty.
    #[error("default guard is empty")]
    EmptyDefaultGuard,
}

/// A single entity failed discovery.
///
/// Non-fatal: the registry logs it, excludes the entity, and the run
/// continues.
#[derive(Debug, Error)]
#[error("entity `{entity}` failed discovery: {reason}")]
pub struct DiscoveryError {
    /// Name of the entity as reported by the discovery source.
    pub entity: String,
    /// Human-readable failure description.
    pub reason: String,
}

impl DiscoveryError {
    /// Create a new discovery error.
    pub fn new(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
