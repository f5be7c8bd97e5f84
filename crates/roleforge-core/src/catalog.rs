//! Persisted role/permission catalog records.
//!
//! These mirror what the store keeps. Identity fields (`name`,
//! `guard_name`) are immutable after creation; display names may be
//! refreshed on later runs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::labels::DisplayName;
use crate::naming::PermissionKey;

/// Store-assigned role identifier.
pub type RoleId = i64;

/// Store-assigned permission identifier.
pub type PermissionId = i64;

/// A persisted role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub guard_name: String,
    pub display_name: DisplayName,

    /// Permission names currently attached to the role. Membership is
    /// owned by reconciliation and always replaced in full, never
    /// patched additively.
    pub permissions: BTreeSet<String>,
}

impl Role {
    /// Whether the role currently holds a permission.
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }
}

/// A persisted permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub guard_name: String,

    /// Grouping key: the owning entity's slug.
    pub group: String,

    pub display_name: DisplayName,
}

impl Permission {
    /// The (operation, entity) pair behind this permission's name.
    pub fn key(&self) -> Option<PermissionKey> {
        PermissionKey::parse(&self.name)
    }
}
