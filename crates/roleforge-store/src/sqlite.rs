//! SQLite implementation of the RoleStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Permission id
//! lookups are cached per `(name, guard)`; the cache is dropped on
//! [`RoleStore::invalidate_permission_cache`].

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use roleforge_core::{DisplayName, Permission, PermissionId, Role};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{RoleStore, UpsertResult};

type PermissionIdCache = HashMap<(String, String), PermissionId>;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,

    /// Permission id lookups, keyed by (name, guard_name).
    permission_ids: Arc<Mutex<PermissionIdCache>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(&path)?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.as_ref().display(), "opened role store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            permission_ids: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            permission_ids: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Run a blocking closure against the connection off the runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::Runtime("connection mutex poisoned".to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Runtime(format!("spawn_blocking failed: {}", e)))?
    }
}

fn encode_display_name(display_name: &DisplayName) -> Result<String> {
    serde_json::to_string(display_name).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_display_name(raw: &str) -> Result<DisplayName> {
    serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn lock_cache(cache: &Mutex<PermissionIdCache>) -> Result<std::sync::MutexGuard<'_, PermissionIdCache>> {
    cache
        .lock()
        .map_err(|_| StoreError::Runtime("permission cache mutex poisoned".to_string()))
}

/// Load a role with its permission names.
fn load_role(conn: &Connection, name: &str, guard: &str) -> Result<Option<Role>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, display_name FROM roles WHERE name = ?1 AND guard_name = ?2",
            params![name, guard],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((id, display_raw)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT p.name FROM permissions p
         JOIN role_has_permissions rp ON rp.permission_id = p.id
         WHERE rp.role_id = ?1",
    )?;
    let permissions: BTreeSet<String> = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;

    Ok(Some(Role {
        id,
        name: name.to_string(),
        guard_name: guard.to_string(),
        display_name: decode_display_name(&display_raw)?,
        permissions,
    }))
}

#[async_trait]
impl RoleStore for SqliteStore {
    async fn find_role(&self, name: &str, guard: &str) -> Result<Option<Role>> {
        let name = name.to_string();
        let guard = guard.to_string();

        self.with_conn(move |conn| load_role(conn, &name, &guard))
            .await
    }

    async fn find_or_create_role(
        &self,
        name: &str,
        guard: &str,
        display_name: &DisplayName,
    ) -> Result<UpsertResult<Role>> {
        let name = name.to_string();
        let guard = guard.to_string();
        let display_name = display_name.clone();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let now = now_millis();
            let display_raw = encode_display_name(&display_name)?;

            let result = match load_role(&tx, &name, &guard)? {
                Some(mut role) => {
                    tx.execute(
                        "UPDATE roles SET display_name = ?1, updated_at = ?2 WHERE id = ?3",
                        params![display_raw, now, role.id],
                    )?;
                    role.display_name = display_name;
                    UpsertResult::Existing(role)
                }
                None => {
                    tx.execute(
                        "INSERT INTO roles (name, guard_name, display_name, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![name, guard, display_raw, now, now],
                    )?;
                    UpsertResult::Created(Role {
                        id: tx.last_insert_rowid(),
                        name,
                        guard_name: guard,
                        display_name,
                        permissions: BTreeSet::new(),
                    })
                }
            };

            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn find_or_create_permission(
        &self,
        name: &str,
        guard: &str,
        group: &str,
        display_name: &DisplayName,
    ) -> Result<UpsertResult<Permission>> {
        let name = name.to_string();
        let guard = guard.to_string();
        let group = group.to_string();
        let display_name = display_name.clone();
        let cache = Arc::clone(&self.permission_ids);

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let now = now_millis();
            let display_raw = encode_display_name(&display_name)?;

            let existing: Option<(i64, String)> = tx
                .query_row(
                    "SELECT id, group_name FROM permissions WHERE name = ?1 AND guard_name = ?2",
                    params![name, guard],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let result = match existing {
                Some((id, group_name)) => {
                    tx.execute(
                        "UPDATE permissions SET display_name = ?1, updated_at = ?2 WHERE id = ?3",
                        params![display_raw, now, id],
                    )?;
                    UpsertResult::Existing(Permission {
                        id,
                        name: name.clone(),
                        guard_name: guard.clone(),
                        group: group_name,
                        display_name,
                    })
                }
                None => {
                    tx.execute(
                        "INSERT INTO permissions
                            (name, guard_name, group_name, display_name, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![name, guard, group, display_raw, now, now],
                    )?;
                    UpsertResult::Created(Permission {
                        id: tx.last_insert_rowid(),
                        name: name.clone(),
                        guard_name: guard.clone(),
                        group,
                        display_name,
                    })
                }
            };

            tx.commit()?;
            lock_cache(&cache)?.insert((name, guard), result.record().id);
            Ok(result)
        })
        .await
    }

    async fn list_permissions(&self, guard: &str) -> Result<Vec<Permission>> {
        let guard = guard.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, group_name, display_name FROM permissions
                 WHERE guard_name = ?1 ORDER BY name",
            )?;

            let rows = stmt
                .query_map(params![guard], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(id, name, group, display_raw)| {
                    Ok(Permission {
                        id,
                        name,
                        guard_name: guard.clone(),
                        group,
                        display_name: decode_display_name(&display_raw)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn sync_role_permissions(&self, role: &Role, names: &BTreeSet<String>) -> Result<()> {
        let role_id = role.id;
        let guard = role.guard_name.clone();
        let names: Vec<String> = names.iter().cloned().collect();
        let cache = Arc::clone(&self.permission_ids);

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM role_has_permissions WHERE role_id = ?1",
                params![role_id],
            )?;

            let mut ids = lock_cache(&cache)?;
            for name in &names {
                let key = (name.clone(), guard.clone());
                let permission_id = match ids.get(&key) {
                    Some(&id) => id,
                    None => {
                        let found: Option<i64> = tx
                            .query_row(
                                "SELECT id FROM permissions WHERE name = ?1 AND guard_name = ?2",
                                params![name, guard],
                                |row| row.get(0),
                            )
                            .optional()?;
                        // Missing row: the caller assigned before creating.
                        let id = found.ok_or_else(|| StoreError::UnknownPermission {
                            name: name.clone(),
                            guard: guard.clone(),
                        })?;
                        ids.insert(key, id);
                        id
                    }
                };

                tx.execute(
                    "INSERT OR IGNORE INTO role_has_permissions (role_id, permission_id)
                     VALUES (?1, ?2)",
                    params![role_id, permission_id],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn invalidate_permission_cache(&self) -> Result<()> {
        lock_cache(&self.permission_ids)?.clear();
        Ok(())
    }

    async fn clear_catalog(&self) -> Result<()> {
        let cache = Arc::clone(&self.permission_ids);

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let associations = tx.execute("DELETE FROM role_has_permissions", [])?;
            let permissions = tx.execute("DELETE FROM permissions", [])?;
            tx.commit()?;

            lock_cache(&cache)?.clear();
            tracing::debug!(permissions, associations, "catalog cleared");
            Ok(())
        })
        .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(label: &str) -> DisplayName {
        DisplayName::from([("en".to_string(), label.to_string())])
    }

    #[tokio::test]
    async fn test_role_upsert_idempotent() {
        let store = SqliteStore::open_memory().unwrap();

        let first = store
            .find_or_create_role("auditor", "api", &display("Auditor"))
            .await
            .unwrap();
        assert!(first.was_created());

        let second = store
            .find_or_create_role("auditor", "api", &display("Auditor v2"))
            .await
            .unwrap();
        assert!(!second.was_created());
        assert_eq!(second.record().id, first.record().id);
        assert_eq!(second.record().display_name, display("Auditor v2"));
    }

    #[tokio::test]
    async fn test_permission_group_fixed_at_creation() {
        let store = SqliteStore::open_memory().unwrap();

        let first = store
            .find_or_create_permission("read-invoice", "api", "invoice", &display("p"))
            .await
            .unwrap();
        assert!(first.was_created());

        // A later upsert with a different group keeps the original.
        let second = store
            .find_or_create_permission("read-invoice", "api", "other", &display("p2"))
            .await
            .unwrap();
        assert!(!second.was_created());
        assert_eq!(second.record().group, "invoice");
        assert_eq!(second.record().display_name, display("p2"));
    }

    #[tokio::test]
    async fn test_sync_replaces_membership() {
        let store = SqliteStore::open_memory().unwrap();
        let role = store
            .find_or_create_role("auditor", "api", &display("Auditor"))
            .await
            .unwrap()
            .into_inner();

        for name in ["read-invoice", "create-invoice", "read-customer"] {
            store
                .find_or_create_permission(name, "api", "invoice", &display(name))
                .await
                .unwrap();
        }

        let first: BTreeSet<String> = ["read-invoice", "create-invoice"]
            .map(String::from)
            .into();
        store.sync_role_permissions(&role, &first).await.unwrap();

        let second: BTreeSet<String> = ["read-customer"].map(String::from).into();
        store.sync_role_permissions(&role, &second).await.unwrap();

        let fetched = store.find_role("auditor", "api").await.unwrap().unwrap();
        assert_eq!(fetched.permissions, second);
        assert_eq!(store.list_permissions("api").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_sync_rejects_unknown_and_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let role = store
            .find_or_create_role("auditor", "api", &display("Auditor"))
            .await
            .unwrap()
            .into_inner();
        store
            .find_or_create_permission("read-invoice", "api", "invoice", &display("p"))
            .await
            .unwrap();

        let good: BTreeSet<String> = ["read-invoice"].map(String::from).into();
        store.sync_role_permissions(&role, &good).await.unwrap();

        let bad: BTreeSet<String> = ["read-invoice", "read-ghost"].map(String::from).into();
        let err = store.sync_role_permissions(&role, &bad).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownPermission { name, .. } if name == "read-ghost"));

        // Failed sync left the previous membership intact.
        let fetched = store.find_role("auditor", "api").await.unwrap().unwrap();
        assert_eq!(fetched.permissions, good);
    }

    #[tokio::test]
    async fn test_cache_invalidation_allows_resync() {
        let store = SqliteStore::open_memory().unwrap();
        let role = store
            .find_or_create_role("auditor", "api", &display("Auditor"))
            .await
            .unwrap()
            .into_inner();
        store
            .find_or_create_permission("read-invoice", "api", "invoice", &display("p"))
            .await
            .unwrap();

        store.invalidate_permission_cache().await.unwrap();

        // Resolution falls back to the database after invalidation.
        let names: BTreeSet<String> = ["read-invoice"].map(String::from).into();
        store.sync_role_permissions(&role, &names).await.unwrap();
        let fetched = store.find_role("auditor", "api").await.unwrap().unwrap();
        assert_eq!(fetched.permissions, names);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let role = store
                .find_or_create_role("auditor", "api", &display("Auditor"))
                .await
                .unwrap()
                .into_inner();
            store
                .find_or_create_permission("read-invoice", "api", "invoice", &display("p"))
                .await
                .unwrap();
            let names: BTreeSet<String> = ["read-invoice"].map(String::from).into();
            store.sync_role_permissions(&role, &names).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let fetched = store.find_role("auditor", "api").await.unwrap().unwrap();
        assert!(fetched.has_permission("read-invoice"));
    }

    #[tokio::test]
    async fn test_clear_catalog_spares_roles() {
        let store = SqliteStore::open_memory().unwrap();
        let role = store
            .find_or_create_role("auditor", "api", &display("Auditor"))
            .await
            .unwrap()
            .into_inner();
        store
            .find_or_create_permission("read-invoice", "api", "invoice", &display("p"))
            .await
            .unwrap();
        let names: BTreeSet<String> = ["read-invoice"].map(String::from).into();
        store.sync_role_permissions(&role, &names).await.unwrap();

        store.clear_catalog().await.unwrap();

        assert!(store.list_permissions("api").await.unwrap().is_empty());
        let fetched = store.find_role("auditor", "api").await.unwrap().unwrap();
        assert!(fetched.permissions.is_empty());
    }
}
