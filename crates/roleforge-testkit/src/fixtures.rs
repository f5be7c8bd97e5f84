//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use roleforge::{Reconciler, Result};
use roleforge_core::{
    AdditionalOperationSet, EntityDescriptor, KeyLabels, LabelSource, RolesConfig, StaticDiscovery,
};
use roleforge_store::MemoryStore;

/// A test fixture with a sample entity set and a memory store.
///
/// The entity set covers the interesting shapes: a plain entity, an
/// entity with special operations, and a purely declarative operation
/// group with a replacing operation set.
pub struct TestFixture {
    pub discovery: StaticDiscovery,
    pub config: RolesConfig,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// Create a new fixture with the default sample entities.
    pub fn new() -> Self {
        Self {
            discovery: StaticDiscovery::new([
                EntityDescriptor::new("Invoice"),
                EntityDescriptor::new("Customer").with_special_operations(["export"]),
            ]),
            config: RolesConfig {
                additional_operations: vec![AdditionalOperationSet::replacing(
                    "Report",
                    ["generate"],
                )],
                ..RolesConfig::default()
            },
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Build a reconciler over the fixture's store and config.
    ///
    /// The store is shared: building a second reconciler (e.g. with an
    /// edited config) reuses the same persisted state.
    pub fn reconciler(&self) -> Result<Reconciler<Arc<MemoryStore>>> {
        Reconciler::new(
            self.store.clone(),
            &self.discovery,
            self.config.clone(),
            Arc::new(KeyLabels),
        )
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Label source backed by an in-memory map.
///
/// Falls back to the key itself, like a real locale-file lookup with a
/// missing entry.
#[derive(Debug, Default, Clone)]
pub struct StaticLabels {
    entries: HashMap<(String, String), String>,
}

impl StaticLabels {
    /// Create an empty label map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a label for (locale, key).
    pub fn insert(
        mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.entries
            .insert((locale.into(), key.into()), label.into());
        self
    }
}

impl LabelSource for StaticLabels {
    fn resolve(&self, key: &str, _page: &str, locale: &str) -> String {
        self.entries
            .get(&(locale.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
