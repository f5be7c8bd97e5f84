//! Effective-operation resolution.
//!
//! Pure and side-effect free: the same inputs produce the same list
//! whether called during permission synthesis or while expanding a
//! wildcard in a role spec.

use crate::entity::{AdditionalOperationSet, EntityDescriptor};

/// The default operation set granted to every entity.
pub const BASIC_OPERATIONS: [&str; 4] = ["create", "read", "update", "delete"];

/// Compute the effective operation list for an entity.
///
/// Precedence, lowest to highest:
/// 1. the four basic operations;
/// 2. the entity's `basic_operation_override` replaces them;
/// 3. `special_operations` are unioned in;
/// 4. a matching [`AdditionalOperationSet`] wins over all of the above:
///    union when `extends_basic`, full replace otherwise.
///
/// Duplicates are removed, first occurrence kept; downstream consumers
/// treat the result as a set.
pub fn resolve_operations(
    entity: &EntityDescriptor,
    additional: Option<&AdditionalOperationSet>,
) -> Vec<String> {
    let mut operations: Vec<String> = Vec::with_capacity(BASIC_OPERATIONS.len());

    match &entity.basic_operation_override {
        Some(overridden) => {
            for op in overridden {
                push_unique(&mut operations, op);
            }
        }
        None => {
            for op in BASIC_OPERATIONS {
                operations.push(op.to_string());
            }
        }
    }

    for op in &entity.special_operations {
        push_unique(&mut operations, op);
    }

    if let Some(set) = additional {
        if !set.extends_basic {
            operations.clear();
        }
        for op in &set.operations {
            push_unique(&mut operations, op);
        }
    }

    operations
}

fn push_unique(operations: &mut Vec<String>, op: &str) {
    if !operations.iter().any(|existing| existing == op) {
        operations.push(op.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_basic() {
        let entity = EntityDescriptor::new("Invoice");
        assert_eq!(
            resolve_operations(&entity, None),
            vec!["create", "read", "update", "delete"]
        );
    }

    #[test]
    fn test_override_replaces_basic() {
        let entity = EntityDescriptor::new("Session").with_basic_operations(["read", "delete"]);
        assert_eq!(resolve_operations(&entity, None), vec!["read", "delete"]);
    }

    #[test]
    fn test_special_operations_unioned() {
        let entity = EntityDescriptor::new("Invoice").with_special_operations(["export", "read"]);
        assert_eq!(
            resolve_operations(&entity, None),
            vec!["create", "read", "update", "delete", "export"]
        );
    }

    #[test]
    fn test_replacing_set_discards_everything() {
        let entity = EntityDescriptor::new("Report").with_special_operations(["archive"]);
        let set = AdditionalOperationSet::replacing("Report", ["generate"]);
        assert_eq!(resolve_operations(&entity, Some(&set)), vec!["generate"]);
    }

    #[test]
    fn test_extending_set_unions() {
        let entity = EntityDescriptor::new("Invoice");
        let set = AdditionalOperationSet::extending("Invoice", ["export", "read"]);
        assert_eq!(
            resolve_operations(&entity, Some(&set)),
            vec!["create", "read", "update", "delete", "export"]
        );
    }

    #[test]
    fn test_duplicates_removed_first_seen() {
        let entity = EntityDescriptor::new("Job")
            .with_basic_operations(["run", "run", "cancel"])
            .with_special_operations(["cancel", "retry"]);
        assert_eq!(
            resolve_operations(&entity, None),
            vec!["run", "cancel", "retry"]
        );
    }

    #[test]
    fn test_stable_across_calls() {
        let entity = EntityDescriptor::new("Invoice").with_special_operations(["export"]);
        let set = AdditionalOperationSet::extending("Invoice", ["approve"]);
        let first = resolve_operations(&entity, Some(&set));
        let second = resolve_operations(&entity, Some(&set));
        assert_eq!(first, second);
    }
}
