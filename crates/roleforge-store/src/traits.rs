//! Store trait: the abstract interface for role/permission persistence.
//!
//! This trait keeps the engine storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use roleforge_core::{DisplayName, Permission, Role};

use crate::error::Result;

/// Result of an idempotent upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertResult<T> {
    /// The record was created by this call.
    Created(T),
    /// The record already existed (idempotent - not an error).
    Existing(T),
}

impl<T> UpsertResult<T> {
    /// The upserted record, regardless of outcome.
    pub fn into_inner(self) -> T {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    /// Borrow the upserted record.
    pub fn record(&self) -> &T {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    /// Whether this call created the record.
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// The store trait: async interface for catalog persistence.
///
/// All methods are async to support both sync (SQLite) and async
/// backends. For SQLite, calls run under `spawn_blocking` to avoid
/// stalling the runtime.
///
/// # Design Notes
///
/// - **Idempotent upserts**: `(name, guard_name)` is the identity for
///   both roles and permissions; upserting an existing pair refreshes
///   its display name and leaves identity untouched.
/// - **Full-replace sync**: [`sync_role_permissions`] replaces a role's
///   membership with exactly the given set, never patches.
/// - **Create-then-assign**: syncing an identifier with no backing
///   permission row is an error, not a silent skip.
/// - **Permissions only grow**: nothing here deletes a permission;
///   [`clear_catalog`] is the explicit reset hook and spares roles.
///
/// [`sync_role_permissions`]: RoleStore::sync_role_permissions
/// [`clear_catalog`]: RoleStore::clear_catalog
#[async_trait]
pub trait RoleStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Role Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up a role by `(name, guard)`, with its permission names loaded.
    async fn find_role(&self, name: &str, guard: &str) -> Result<Option<Role>>;

    /// Upsert a role by `(name, guard)`.
    ///
    /// Creates the role when absent; refreshes its display name when
    /// present.
    async fn find_or_create_role(
        &self,
        name: &str,
        guard: &str,
        display_name: &DisplayName,
    ) -> Result<UpsertResult<Role>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Upsert a permission by `(name, guard)`.
    ///
    /// Creates the permission when absent; refreshes its display name
    /// when present. `group` is fixed at creation.
    async fn find_or_create_permission(
        &self,
        name: &str,
        guard: &str,
        group: &str,
        display_name: &DisplayName,
    ) -> Result<UpsertResult<Permission>>;

    /// All permissions under a guard, ordered by name.
    async fn list_permissions(&self, guard: &str) -> Result<Vec<Permission>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Membership
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the role's permission membership with exactly `names`.
    ///
    /// Atomic: on failure the previous membership is kept. Every name
    /// must already exist under the role's guard.
    async fn sync_role_permissions(&self, role: &Role, names: &BTreeSet<String>) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop any cached permission lookups.
    ///
    /// Must be called after bulk assignment changes; a stale cache
    /// silently corrupts inheritance resolution on the next read.
    async fn invalidate_permission_cache(&self) -> Result<()>;

    /// Delete all permissions and role-permission associations.
    ///
    /// Roles survive. This is the explicit reset operation; normal
    /// reconciliation never deletes.
    async fn clear_catalog(&self) -> Result<()>;
}

#[async_trait]
impl<S: RoleStore + ?Sized> RoleStore for Arc<S> {
    async fn find_role(&self, name: &str, guard: &str) -> Result<Option<Role>> {
        (**self).find_role(name, guard).await
    }

    async fn find_or_create_role(
        &self,
        name: &str,
        guard: &str,
        display_name: &DisplayName,
    ) -> Result<UpsertResult<Role>> {
        (**self).find_or_create_role(name, guard, display_name).await
    }

    async fn find_or_create_permission(
        &self,
        name: &str,
        guard: &str,
        group: &str,
        display_name: &DisplayName,
    ) -> Result<UpsertResult<Permission>> {
        (**self)
            .find_or_create_permission(name, guard, group, display_name)
            .await
    }

    async fn list_permissions(&self, guard: &str) -> Result<Vec<Permission>> {
        (**self).list_permissions(guard).await
    }

    async fn sync_role_permissions(&self, role: &Role, names: &BTreeSet<String>) -> Result<()> {
        (**self).sync_role_permissions(role, names).await
    }

    async fn invalidate_permission_cache(&self) -> Result<()> {
        (**self).invalidate_permission_cache().await
    }

    async fn clear_catalog(&self) -> Result<()> {
        (**self).clear_catalog().await
    }
}
