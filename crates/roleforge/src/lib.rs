//! # Roleforge
//!
//! Synthesizes and reconciles a role/permission catalog from declarative
//! configuration plus a discoverable set of permission-bearing entities.
//!
//! ## Overview
//!
//! One reconciliation run derives, for every entity, the operations it
//! supports; derives, for every declared role, its final permission set
//! (honoring inheritance and add/remove modifiers); and persists both
//! idempotently, keeping the backing store's role/permission tables
//! consistent with configuration across repeated runs.
//!
//! ## Key Types
//!
//! - [`Reconciler`] - The engine entry point
//! - [`ReconcileReport`] - Summary counters for one run
//! - [`RolesConfig`] - The declarative configuration surface
//! - [`RoleStore`] - The persistence collaborator trait
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roleforge::{
//!     EntityDescriptor, KeyLabels, Reconciler, RolesConfig, SqliteStore, StaticDiscovery,
//! };
//!
//! async fn example() {
//!     let store = SqliteStore::open("catalog.db").unwrap();
//!     let discovery = StaticDiscovery::new([
//!         EntityDescriptor::new("Invoice"),
//!         EntityDescriptor::new("Customer"),
//!     ]);
//!     let config = RolesConfig::default();
//!
//!     let engine = Reconciler::new(store, &discovery, config, Arc::new(KeyLabels)).unwrap();
//!     let report = engine.reconcile(false).await.unwrap();
//!     println!("synced {} roles", report.roles_synced.len());
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Idempotent**: re-running with unchanged inputs is a no-op in effect
//! - **Convergent**: role membership is replaced in full, so removing a
//!   permission from config removes it from the role on the next run
//! - **Create-then-assign**: every assigned permission exists first
//! - **Ordered**: catalog seeding is durable before declarative roles
//!   resolve, and roles resolve in declaration order

pub mod engine;
pub mod error;

pub use engine::{Reconciler, ReconcileReport, BASIC_ROLES};
pub use error::{EngineError, Result};

pub use roleforge_core::{
    canonical_name, entity_slug, AdditionalOperationSet, ConfigError, Discovery, DiscoveryError,
    DisplayName, EntityDescriptor, EntityRegistry, KeyLabels, LabelSource, OperationSpec,
    Permission, PermissionKey, Role, RoleModifier, RoleSpec, RolesConfig, StaticDiscovery,
    TranslateConfig, BASIC_OPERATIONS,
};
pub use roleforge_resolve::ResolveError;
pub use roleforge_store::{MemoryStore, RoleStore, SqliteStore, StoreError, UpsertResult};
