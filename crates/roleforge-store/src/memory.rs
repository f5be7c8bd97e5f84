//! In-memory implementation of the RoleStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use roleforge_core::{DisplayName, Permission, PermissionId, Role, RoleId};

use crate::error::{Result, StoreError};
use crate::traits::{RoleStore, UpsertResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Roles keyed by (name, guard_name).
    roles: HashMap<(String, String), Role>,

    /// Permissions keyed by (name, guard_name).
    permissions: HashMap<(String, String), Permission>,

    next_role_id: RoleId,
    next_permission_id: PermissionId,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Runtime("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Runtime("store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_role(&self, name: &str, guard: &str) -> Result<Option<Role>> {
        let inner = self.read()?;
        Ok(inner
            .roles
            .get(&(name.to_string(), guard.to_string()))
            .cloned())
    }

    async fn find_or_create_role(
        &self,
        name: &str,
        guard: &str,
        display_name: &DisplayName,
    ) -> Result<UpsertResult<Role>> {
        let mut inner = self.write()?;
        let key = (name.to_string(), guard.to_string());

        if let Some(role) = inner.roles.get_mut(&key) {
            role.display_name = display_name.clone();
            return Ok(UpsertResult::Existing(role.clone()));
        }

        inner.next_role_id += 1;
        let role = Role {
            id: inner.next_role_id,
            name: name.to_string(),
            guard_name: guard.to_string(),
            display_name: display_name.clone(),
            permissions: BTreeSet::new(),
        };
        inner.roles.insert(key, role.clone());
        Ok(UpsertResult::Created(role))
    }

    async fn find_or_create_permission(
        &self,
        name: &str,
        guard: &str,
        group: &str,
        display_name: &DisplayName,
    ) -> Result<UpsertResult<Permission>> {
        let mut inner = self.write()?;
        let key = (name.to_string(), guard.to_string());

        if let Some(permission) = inner.permissions.get_mut(&key) {
            permission.display_name = display_name.clone();
            return Ok(UpsertResult::Existing(permission.clone()));
        }

        inner.next_permission_id += 1;
        let permission = Permission {
            id: inner.next_permission_id,
            name: name.to_string(),
            guard_name: guard.to_string(),
            group: group.to_string(),
            display_name: display_name.clone(),
        };
        inner.permissions.insert(key, permission.clone());
        Ok(UpsertResult::Created(permission))
    }

    async fn list_permissions(&self, guard: &str) -> Result<Vec<Permission>> {
        let inner = self.read()?;
        let mut permissions: Vec<Permission> = inner
            .permissions
            .values()
            .filter(|p| p.guard_name == guard)
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn sync_role_permissions(&self, role: &Role, names: &BTreeSet<String>) -> Result<()> {
        let mut inner = self.write()?;

        for name in names {
            let key = (name.clone(), role.guard_name.clone());
            if !inner.permissions.contains_key(&key) {
                return Err(StoreError::UnknownPermission {
                    name: name.clone(),
                    guard: role.guard_name.clone(),
                });
            }
        }

        let key = (role.name.clone(), role.guard_name.clone());
        match inner.roles.get_mut(&key) {
            Some(stored) => {
                stored.permissions = names.clone();
                Ok(())
            }
            None => Err(StoreError::Runtime(format!(
                "role `{}` vanished during sync",
                role.name
            ))),
        }
    }

    async fn invalidate_permission_cache(&self) -> Result<()> {
        // Nothing cached; reads always see the latest writes.
        Ok(())
    }

    async fn clear_catalog(&self) -> Result<()> {
        let mut inner = self.write()?;
        inner.permissions.clear();
        for role in inner.roles.values_mut() {
            role.permissions.clear();
        }
        Ok(())
    }
}
