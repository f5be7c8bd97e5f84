//! The Reconciler: unified entry point for catalog synthesis.
//!
//! Brings discovery, resolution, and storage together: it materializes
//! the full permission catalog for the built-in roles, then walks the
//! declarative role table in declaration order, syncing each role's
//! membership to exactly its resolved set.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use roleforge_core::{
    permission_display_name, role_display_name, Discovery, EntityRegistry, LabelSource,
    PermissionKey, Role, RoleSpec, RolesConfig,
};
use roleforge_resolve::{resolve_role, spec_operations};
use roleforge_store::RoleStore;

use crate::error::{EngineError, Result};

/// Roles that always receive the full permission catalog, independent
/// of the declarative role table.
pub const BASIC_ROLES: [&str; 2] = ["root", "admin"];

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Roles whose membership was synced, in processing order.
    pub roles_synced: Vec<String>,

    /// Permissions newly created during the run. Zero on a repeat run
    /// with unchanged inputs.
    pub permissions_created: usize,
}

/// The reconciliation engine.
///
/// Single-threaded and batch-oriented: one call to [`reconcile`] runs
/// to completion, awaiting store calls strictly in order. The catalog
/// seeding pass is durable before any declarative role is resolved,
/// because `like`/`models` resolution reads persisted state back.
///
/// [`reconcile`]: Reconciler::reconcile
pub struct Reconciler<S: RoleStore> {
    /// The storage backend.
    store: Arc<S>,
    /// Per-run view of discovered entities and operation sets.
    registry: EntityRegistry,
    /// Declarative configuration, read-only for the run.
    config: RolesConfig,
    /// Display-label collaborator.
    labels: Arc<dyn LabelSource>,
}

impl<S: RoleStore> Reconciler<S> {
    /// Build a reconciler.
    ///
    /// Validates the config and builds the entity registry; nothing is
    /// written until [`reconcile`](Reconciler::reconcile) runs, so a
    /// bad config never leaves partial state behind.
    pub fn new(
        store: S,
        discovery: &dyn Discovery,
        config: RolesConfig,
        labels: Arc<dyn LabelSource>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = EntityRegistry::from_discovery(discovery, &config.additional_operations);
        Ok(Self {
            store: Arc::new(store),
            registry,
            config,
            labels,
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The per-run entity view.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one reconciliation.
    ///
    /// The catalog seeding pass for [`BASIC_ROLES`] always runs first.
    /// With `skip_declarative` set, the run stops there and the
    /// declarative role table is left untouched.
    pub async fn reconcile(&self, skip_declarative: bool) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        self.seed_basic_roles(&mut report).await?;

        if skip_declarative {
            return Ok(report);
        }

        // Declaration order: parents must be materialized before roles
        // that inherit from them.
        for spec in &self.config.roles {
            if BASIC_ROLES.contains(&spec.name.as_str()) {
                tracing::warn!(
                    role = %spec.name,
                    "built-in roles always carry the full catalog; declarative entry ignored"
                );
                continue;
            }
            self.reconcile_declared_role(spec, &mut report).await?;
        }

        tracing::info!(
            roles = report.roles_synced.len(),
            permissions_created = report.permissions_created,
            "reconciliation complete"
        );
        Ok(report)
    }

    /// Reset the catalog and rebuild it.
    ///
    /// With `skip` unset, all permissions and role-permission
    /// associations are deleted first (roles survive); the run then
    /// delegates to [`reconcile`](Reconciler::reconcile) with the same
    /// flag.
    pub async fn reset(&self, skip: bool) -> Result<ReconcileReport> {
        if !skip {
            self.store.clear_catalog().await?;
            tracing::info!("permission catalog cleared");
        }
        self.reconcile(skip).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Passes
    // ─────────────────────────────────────────────────────────────────────────

    /// Materialize the full permission catalog and attach it to the
    /// built-in roles.
    ///
    /// Seeds every `(entity, operation)` pair for every catalog name,
    /// so later `like`/`models` lookups read a complete persisted
    /// catalog.
    async fn seed_basic_roles(&self, report: &mut ReconcileReport) -> Result<()> {
        let guard = self.config.default_guard.as_str();

        let mut catalog: BTreeSet<String> = BTreeSet::new();
        for entity_name in self.registry.catalog_names() {
            let entity = self.registry.descriptor_or_virtual(&entity_name);
            let entity_guard = entity.guard_name.as_deref().unwrap_or(guard);

            for operation in self.registry.operations_for(&entity_name) {
                let key = PermissionKey::new(&entity_name, &operation);
                let display = permission_display_name(
                    self.labels.as_ref(),
                    &self.config.translate,
                    &entity_name,
                    &operation,
                );
                let upserted = self
                    .store
                    .find_or_create_permission(&key.name(), entity_guard, key.group(), &display)
                    .await?;
                if upserted.was_created() {
                    report.permissions_created += 1;
                }
                // Roles live under the default guard; entities guarded
                // differently keep their permissions out of them.
                if entity_guard == guard {
                    catalog.insert(key.name());
                }
            }
        }

        catalog.extend(self.materialize_defaults(report).await?);

        for role_name in BASIC_ROLES {
            let role = self.upsert_role(role_name).await?;
            self.sync(&role, &catalog).await?;
            report.roles_synced.push(role_name.to_string());
        }

        self.store.invalidate_permission_cache().await?;
        Ok(())
    }

    /// Upsert one declarative role and sync its resolved membership.
    async fn reconcile_declared_role(
        &self,
        spec: &RoleSpec,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let guard = self.config.default_guard.as_str();
        let role = self.upsert_role(&spec.name).await?;

        let resolved = resolve_role(
            self.store.as_ref(),
            &self.registry,
            guard,
            &self.config.default_permissions,
            spec,
        )
        .await?;

        // Create-then-assign: every member must exist before the sync.
        let provenance = self.declared_provenance(spec);
        for name in &resolved {
            let (entity, operation) = match provenance.get(name) {
                Some((entity, operation)) => (entity.clone(), operation.clone()),
                None => match PermissionKey::parse(name) {
                    Some(key) => (key.entity_slug, key.operation),
                    // Inherited names that don't parse are already persisted.
                    None => continue,
                },
            };
            let display = permission_display_name(
                self.labels.as_ref(),
                &self.config.translate,
                &entity,
                &operation,
            );
            let group = PermissionKey::new(&entity, &operation);
            let upserted = self
                .store
                .find_or_create_permission(name, guard, group.group(), &display)
                .await?;
            if upserted.was_created() {
                report.permissions_created += 1;
            }
        }

        self.sync(&role, &resolved).await?;
        // A stale cache would feed the next role's inheritance lookup.
        self.store.invalidate_permission_cache().await?;

        tracing::debug!(role = %spec.name, permissions = resolved.len(), "role synced");
        report.roles_synced.push(spec.name.clone());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Identifier -> (entity, operation) provenance for a spec's own
    /// expansions, used to derive display labels from the names the
    /// config actually wrote.
    fn declared_provenance(&self, spec: &RoleSpec) -> HashMap<String, (String, String)> {
        let mut provenance = HashMap::new();
        for (entity, op_spec) in &spec.permissions {
            for operation in spec_operations(&self.registry, entity, op_spec) {
                let name = PermissionKey::new(entity, &operation).name();
                provenance.insert(name, (entity.clone(), operation));
            }
        }
        if let Some(models) = &spec.models {
            for model in models {
                for operation in self.registry.operations_for(model) {
                    let name = PermissionKey::new(model, &operation).name();
                    provenance.insert(name, (model.clone(), operation));
                }
            }
        }
        provenance
    }

    /// Materialize configured default permissions so they can be
    /// assigned to any role.
    async fn materialize_defaults(&self, report: &mut ReconcileReport) -> Result<BTreeSet<String>> {
        let guard = self.config.default_guard.as_str();
        let mut names = BTreeSet::new();

        for identifier in &self.config.default_permissions {
            // Validation guarantees these parse.
            let Some(key) = PermissionKey::parse(identifier) else {
                continue;
            };
            let display = permission_display_name(
                self.labels.as_ref(),
                &self.config.translate,
                &key.entity_slug,
                &key.operation,
            );
            let upserted = self
                .store
                .find_or_create_permission(identifier, guard, key.group(), &display)
                .await?;
            if upserted.was_created() {
                report.permissions_created += 1;
            }
            names.insert(identifier.clone());
        }

        Ok(names)
    }

    /// Upsert a role under the default guard with its display name.
    async fn upsert_role(&self, name: &str) -> Result<Role> {
        let display = role_display_name(self.labels.as_ref(), &self.config.translate, name);
        let upserted = self
            .store
            .find_or_create_role(name, &self.config.default_guard, &display)
            .await?;
        Ok(upserted.into_inner())
    }

    /// Full-replace sync with role-identifying error context.
    async fn sync(&self, role: &Role, names: &BTreeSet<String>) -> Result<()> {
        self.store
            .sync_role_permissions(role, names)
            .await
            .map_err(|source| EngineError::RoleSync {
                role: role.name.clone(),
                guard: role.guard_name.clone(),
                permissions: names.clone(),
                source,
            })
    }
}
