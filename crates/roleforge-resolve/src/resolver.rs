//! Role-spec resolution.
//!
//! Turns a declarative [`RoleSpec`] into its final permission-name set.
//! Expansion of `"basic"`/`"*"`/explicit specs is pure computation over
//! the registry; `like` inheritance reads the parent role's *currently
//! persisted* set, so resolution order follows config declaration order.

use std::collections::BTreeSet;

use roleforge_core::{
    EntityRegistry, OperationSpec, PermissionKey, RoleModifier, RoleSpec, BASIC_OPERATIONS,
};
use roleforge_store::RoleStore;

use crate::error::Result;

/// Operation names an operations spec grants on an entity.
///
/// `Basic` means the four basic operations regardless of what the
/// entity supports; `Wildcard` means the entity's full resolved
/// operation set, through the same resolver used for catalog synthesis.
pub fn spec_operations(
    registry: &EntityRegistry,
    entity: &str,
    spec: &OperationSpec,
) -> Vec<String> {
    match spec {
        OperationSpec::Basic => BASIC_OPERATIONS.iter().map(|op| op.to_string()).collect(),
        OperationSpec::Wildcard => registry.operations_for(entity),
        OperationSpec::Explicit(ops) => ops.clone(),
    }
}

/// Expand one entity's operations spec into permission identifiers.
pub fn expand_operation_spec(
    registry: &EntityRegistry,
    entity: &str,
    spec: &OperationSpec,
) -> BTreeSet<String> {
    spec_operations(registry, entity, spec)
        .iter()
        .map(|op| PermissionKey::new(entity, op).name())
        .collect()
}

/// Expand a role's declared permission map into a flat identifier set.
pub fn expand_declared(registry: &EntityRegistry, spec: &RoleSpec) -> BTreeSet<String> {
    spec.permissions
        .iter()
        .flat_map(|(entity, ops)| expand_operation_spec(registry, entity, ops))
        .collect()
}

/// Full permission expansion for a list of entity names.
///
/// Names with no discovered entity fall back to virtual entities.
pub fn expand_models(registry: &EntityRegistry, models: &[String]) -> BTreeSet<String> {
    models
        .iter()
        .flat_map(|name| {
            registry
                .operations_for(name)
                .into_iter()
                .map(move |op| PermissionKey::new(name, &op).name())
        })
        .collect()
}

/// Combine a base set with declared entries per the modifier.
///
/// Without a modifier the declared entries are ignored entirely.
fn apply_modifier(
    base: BTreeSet<String>,
    declared: &BTreeSet<String>,
    modifier: Option<RoleModifier>,
) -> BTreeSet<String> {
    match modifier {
        Some(RoleModifier::Exception) => base.difference(declared).cloned().collect(),
        Some(RoleModifier::Added) => base.union(declared).cloned().collect(),
        None => base,
    }
}

/// Resolve a role spec to its final permission-name set.
///
/// A `like` parent that has not been materialized yet contributes an
/// empty set; this keeps resolution strictly dependent on persisted
/// state and makes declaration order significant.
pub async fn resolve_role<S: RoleStore>(
    store: &S,
    registry: &EntityRegistry,
    guard: &str,
    default_permissions: &[String],
    spec: &RoleSpec,
) -> Result<BTreeSet<String>> {
    let declared = expand_declared(registry, spec);

    let mut resolved = if let Some(parent) = &spec.like {
        let parent_set = match store.find_role(parent, guard).await? {
            Some(role) => role.permissions,
            None => {
                tracing::warn!(
                    role = %spec.name,
                    parent = %parent,
                    "`like` parent not persisted yet; inheriting empty set"
                );
                BTreeSet::new()
            }
        };
        apply_modifier(parent_set, &declared, spec.modifier)
    } else if let Some(models) = &spec.models {
        apply_modifier(expand_models(registry, models), &declared, spec.modifier)
    } else {
        declared
    };

    resolved.extend(default_permissions.iter().cloned());
    Ok(resolved)
}
