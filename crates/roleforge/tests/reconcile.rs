//! End-to-end reconciliation behavior over the in-memory store.
//!
//! Exercises the full pipeline: discovery -> catalog seeding ->
//! declarative role resolution -> idempotent sync.

use std::collections::BTreeSet;
use std::sync::Arc;

use roleforge::{
    AdditionalOperationSet, EntityDescriptor, KeyLabels, MemoryStore, OperationSpec, Reconciler,
    RoleModifier, RoleSpec, RoleStore, RolesConfig, StaticDiscovery,
};

/// Two live entities plus one purely declarative operation group.
fn discovery() -> StaticDiscovery {
    StaticDiscovery::new([
        EntityDescriptor::new("Invoice"),
        EntityDescriptor::new("Customer").with_special_operations(["export"]),
    ])
}

fn base_config() -> RolesConfig {
    RolesConfig {
        additional_operations: vec![AdditionalOperationSet::replacing("Report", ["generate"])],
        ..RolesConfig::default()
    }
}

fn engine(store: Arc<MemoryStore>, config: RolesConfig) -> Reconciler<Arc<MemoryStore>> {
    Reconciler::new(store, &discovery(), config, Arc::new(KeyLabels)).unwrap()
}

fn names(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// The full catalog for `discovery()` + `base_config()`.
fn full_catalog() -> BTreeSet<String> {
    names(&[
        "create-invoice",
        "read-invoice",
        "update-invoice",
        "delete-invoice",
        "create-customer",
        "read-customer",
        "update-customer",
        "delete-customer",
        "export-customer",
        "generate-report",
    ])
}

#[tokio::test]
async fn builtin_roles_receive_full_catalog() {
    let store = Arc::new(MemoryStore::new());
    engine(store.clone(), base_config())
        .reconcile(false)
        .await
        .unwrap();

    for role_name in ["root", "admin"] {
        let role = store.find_role(role_name, "api").await.unwrap().unwrap();
        assert_eq!(role.permissions, full_catalog(), "role {role_name}");
    }
    assert_eq!(store.list_permissions("api").await.unwrap().len(), 10);
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        roles: vec![
            RoleSpec::new("manager").permit("Invoice", OperationSpec::Basic),
            RoleSpec::new("clerk")
                .like("manager")
                .modifier(RoleModifier::Exception)
                .permit("Invoice", OperationSpec::ops(["delete"])),
        ],
        ..base_config()
    };
    let engine = engine(store.clone(), config);

    let first = engine.reconcile(false).await.unwrap();
    assert!(first.permissions_created > 0);

    let before: Vec<_> = store.list_permissions("api").await.unwrap();
    let clerk_before = store.find_role("clerk", "api").await.unwrap().unwrap();

    let second = engine.reconcile(false).await.unwrap();
    assert_eq!(second.permissions_created, 0);

    let after: Vec<_> = store.list_permissions("api").await.unwrap();
    let clerk_after = store.find_role("clerk", "api").await.unwrap().unwrap();

    assert_eq!(before.len(), after.len());
    assert_eq!(clerk_before.permissions, clerk_after.permissions);
}

#[tokio::test]
async fn wildcard_expands_to_exactly_the_supported_operations() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        roles: vec![RoleSpec::new("billing").permit("Invoice", OperationSpec::Wildcard)],
        ..base_config()
    };
    engine(store.clone(), config).reconcile(false).await.unwrap();

    let role = store.find_role("billing", "api").await.unwrap().unwrap();
    assert_eq!(
        role.permissions,
        names(&[
            "create-invoice",
            "read-invoice",
            "update-invoice",
            "delete-invoice"
        ])
    );
}

#[tokio::test]
async fn replacing_operation_set_discards_basic_operations() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        roles: vec![RoleSpec::new("reporter").permit("Report", OperationSpec::Wildcard)],
        ..base_config()
    };
    engine(store.clone(), config).reconcile(false).await.unwrap();

    let role = store.find_role("reporter", "api").await.unwrap().unwrap();
    assert_eq!(role.permissions, names(&["generate-report"]));
}

#[tokio::test]
async fn exception_inheritance_removes_declared_entries() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        roles: vec![
            RoleSpec::new("manager").permit("Invoice", OperationSpec::Basic),
            RoleSpec::new("clerk")
                .like("manager")
                .modifier(RoleModifier::Exception)
                .permit("Invoice", OperationSpec::ops(["update", "delete"])),
        ],
        ..base_config()
    };
    engine(store.clone(), config).reconcile(false).await.unwrap();

    let clerk = store.find_role("clerk", "api").await.unwrap().unwrap();
    assert_eq!(clerk.permissions, names(&["create-invoice", "read-invoice"]));
}

#[tokio::test]
async fn added_inheritance_extends_the_parent_set() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        roles: vec![
            RoleSpec::new("manager").permit("Invoice", OperationSpec::ops(["read", "update"])),
            RoleSpec::new("supervisor")
                .like("manager")
                .modifier(RoleModifier::Added)
                .permit("Customer", OperationSpec::ops(["export"])),
        ],
        ..base_config()
    };
    engine(store.clone(), config).reconcile(false).await.unwrap();

    let supervisor = store.find_role("supervisor", "api").await.unwrap().unwrap();
    assert_eq!(
        supervisor.permissions,
        names(&["read-invoice", "update-invoice", "export-customer"])
    );
}

#[tokio::test]
async fn defaults_are_a_subset_of_every_role() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        default_permissions: vec!["view-dashboard".to_string()],
        roles: vec![RoleSpec::new("clerk").permit("Invoice", OperationSpec::ops(["read"]))],
        ..base_config()
    };
    engine(store.clone(), config).reconcile(false).await.unwrap();

    for role_name in ["root", "admin", "clerk"] {
        let role = store.find_role(role_name, "api").await.unwrap().unwrap();
        assert!(
            role.has_permission("view-dashboard"),
            "role {role_name} is missing the default permission"
        );
    }
}

#[tokio::test]
async fn shrinking_config_removes_membership_but_keeps_permissions() {
    let store = Arc::new(MemoryStore::new());

    let wide = RolesConfig {
        roles: vec![RoleSpec::new("clerk").permit("Invoice", OperationSpec::ops(["read", "update"]))],
        ..base_config()
    };
    engine(store.clone(), wide).reconcile(false).await.unwrap();

    let narrow = RolesConfig {
        roles: vec![RoleSpec::new("clerk").permit("Invoice", OperationSpec::ops(["read"]))],
        ..base_config()
    };
    engine(store.clone(), narrow).reconcile(false).await.unwrap();

    let clerk = store.find_role("clerk", "api").await.unwrap().unwrap();
    assert_eq!(clerk.permissions, names(&["read-invoice"]));

    // The permission entity itself is never deleted.
    let catalog: Vec<String> = store
        .list_permissions("api")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert!(catalog.contains(&"update-invoice".to_string()));
}

#[tokio::test]
async fn skip_flag_seeds_catalog_without_declarative_roles() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        roles: vec![RoleSpec::new("clerk").permit("Invoice", OperationSpec::ops(["read"]))],
        ..base_config()
    };
    engine(store.clone(), config).reconcile(true).await.unwrap();

    assert!(store.find_role("root", "api").await.unwrap().is_some());
    assert!(store.find_role("clerk", "api").await.unwrap().is_none());
    assert_eq!(store.list_permissions("api").await.unwrap().len(), 10);
}

#[tokio::test]
async fn like_before_parent_inherits_persisted_state_only() {
    let store = Arc::new(MemoryStore::new());
    // The child is declared before its parent: on the first run it sees
    // no persisted parent and inherits nothing.
    let config = RolesConfig {
        roles: vec![
            RoleSpec::new("clerk").like("manager"),
            RoleSpec::new("manager").permit("Invoice", OperationSpec::Basic),
        ],
        ..base_config()
    };
    let engine = engine(store.clone(), config);

    engine.reconcile(false).await.unwrap();
    let clerk = store.find_role("clerk", "api").await.unwrap().unwrap();
    assert!(clerk.permissions.is_empty());

    // The second run sees the parent persisted by the first.
    engine.reconcile(false).await.unwrap();
    let clerk = store.find_role("clerk", "api").await.unwrap().unwrap();
    assert_eq!(
        clerk.permissions,
        names(&[
            "create-invoice",
            "read-invoice",
            "update-invoice",
            "delete-invoice"
        ])
    );
}

#[tokio::test]
async fn declarative_entries_cannot_shrink_builtin_roles() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        roles: vec![RoleSpec::new("root").permit("Invoice", OperationSpec::ops(["read"]))],
        ..base_config()
    };
    engine(store.clone(), config).reconcile(false).await.unwrap();

    let root = store.find_role("root", "api").await.unwrap().unwrap();
    assert_eq!(root.permissions, full_catalog());
}

#[tokio::test]
async fn reset_rebuilds_the_catalog() {
    let store = Arc::new(MemoryStore::new());
    let config = RolesConfig {
        roles: vec![RoleSpec::new("clerk").permit("Invoice", OperationSpec::ops(["read"]))],
        ..base_config()
    };
    let engine = engine(store.clone(), config);

    engine.reconcile(false).await.unwrap();
    let report = engine.reset(false).await.unwrap();

    // Everything was recreated from scratch.
    assert_eq!(report.permissions_created, 10);
    let clerk = store.find_role("clerk", "api").await.unwrap().unwrap();
    assert_eq!(clerk.permissions, names(&["read-invoice"]));
}

#[tokio::test]
async fn permission_display_names_are_composed() {
    let store = Arc::new(MemoryStore::new());
    engine(store.clone(), base_config())
        .reconcile(false)
        .await
        .unwrap();

    let permissions = store.list_permissions("api").await.unwrap();
    let create_invoice = permissions
        .iter()
        .find(|p| p.name == "create-invoice")
        .unwrap();
    assert_eq!(create_invoice.group, "invoice");
    assert_eq!(create_invoice.display_name["en"], "Invoice (create)");
    assert_eq!(create_invoice.display_name["ar"], "Invoice (create)");
}

#[tokio::test]
async fn custom_declared_operations_are_created_on_demand() {
    let store = Arc::new(MemoryStore::new());
    // "archive" is not in Invoice's resolved operation set; the sync
    // still succeeds because assignment creates it first.
    let config = RolesConfig {
        roles: vec![RoleSpec::new("archivist").permit("Invoice", OperationSpec::ops(["archive"]))],
        ..base_config()
    };
    engine(store.clone(), config).reconcile(false).await.unwrap();

    let archivist = store.find_role("archivist", "api").await.unwrap().unwrap();
    assert_eq!(archivist.permissions, names(&["archive-invoice"]));
}
