//! Entity descriptors and the discovery registry.
//!
//! Entities are registered statically (an explicit descriptor list)
//! rather than reflected at runtime; the [`Discovery`] trait is the seam
//! where a host application plugs in whatever produces that list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

pub(crate) fn default_true() -> bool {
    true
}

/// Normalized view of a permission-bearing entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity name, possibly `::`-qualified.
    pub name: String,

    /// Guard override; the configured default guard applies when absent.
    #[serde(default)]
    pub guard_name: Option<String>,

    /// Excluded from the permission catalog only when explicitly false.
    #[serde(default = "default_true")]
    pub include_in_permissions: bool,

    /// Replaces the basic operation set when present.
    #[serde(default)]
    pub basic_operation_override: Option<Vec<String>>,

    /// Extra operations unioned into the resolved set.
    #[serde(default)]
    pub special_operations: Vec<String>,
}

impl EntityDescriptor {
    /// Descriptor with default operation metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard_name: None,
            include_in_permissions: true,
            basic_operation_override: None,
            special_operations: Vec::new(),
        }
    }

    /// Descriptor for a name with no backing discoverable type.
    ///
    /// Used when a role spec or operation set references a purely
    /// declarative group (e.g. a reporting area with no model).
    pub fn virtual_entity(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    /// Set a per-entity guard override.
    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard_name = Some(guard.into());
        self
    }

    /// Replace the basic operations for this entity.
    pub fn with_basic_operations<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.basic_operation_override = Some(operations.into_iter().map(Into::into).collect());
        self
    }

    /// Add special operations unioned into the resolved set.
    pub fn with_special_operations<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.special_operations = operations.into_iter().map(Into::into).collect();
        self
    }

    /// Mark this entity as excluded from the permission catalog.
    pub fn excluded(mut self) -> Self {
        self.include_in_permissions = false;
        self
    }
}

/// Named operation override/extension applied to one entity by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalOperationSet {
    /// Entity name this set applies to (live or virtual).
    pub name: String,

    /// Operations carried by the set.
    pub operations: Vec<String>,

    /// Union into the entity's resolved set instead of replacing it.
    #[serde(default)]
    pub extends_basic: bool,
}

impl AdditionalOperationSet {
    /// Set that replaces the entity's operations entirely.
    pub fn replacing<I, S>(name: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            operations: operations.into_iter().map(Into::into).collect(),
            extends_basic: false,
        }
    }

    /// Set that extends the entity's operations.
    pub fn extending<I, S>(name: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extends_basic: true,
            ..Self::replacing(name, operations)
        }
    }
}

/// Source of discoverable entities.
///
/// Implementations enumerate candidate entities; per-entity failures are
/// reported in place so the registry can exclude them and keep going.
pub trait Discovery: Send + Sync {
    /// Enumerate candidate entities.
    fn list_entities(&self) -> Vec<Result<EntityDescriptor, DiscoveryError>>;

    /// Named operation sets contributed by the discovery source.
    fn list_additional_operation_sets(&self) -> Vec<AdditionalOperationSet> {
        Vec::new()
    }
}

/// Discovery over an explicit registration list.
#[derive(Debug, Default, Clone)]
pub struct StaticDiscovery {
    entities: Vec<EntityDescriptor>,
    operation_sets: Vec<AdditionalOperationSet>,
}

impl StaticDiscovery {
    /// Discovery yielding exactly the given descriptors.
    pub fn new<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = EntityDescriptor>,
    {
        Self {
            entities: entities.into_iter().collect(),
            operation_sets: Vec::new(),
        }
    }

    /// Attach additional operation sets to this source.
    pub fn with_operation_sets<I>(mut self, sets: I) -> Self
    where
        I: IntoIterator<Item = AdditionalOperationSet>,
    {
        self.operation_sets = sets.into_iter().collect();
        self
    }
}

impl Discovery for StaticDiscovery {
    fn list_entities(&self) -> Vec<Result<EntityDescriptor, DiscoveryError>> {
        self.entities.iter().cloned().map(Ok).collect()
    }

    fn list_additional_operation_sets(&self) -> Vec<AdditionalOperationSet> {
        self.operation_sets.clone()
    }
}

/// Immutable, per-run view of discovered entities and operation sets.
pub struct EntityRegistry {
    entities: Vec<EntityDescriptor>,
    index: HashMap<String, usize>,
    set_order: Vec<String>,
    sets: HashMap<String, AdditionalOperationSet>,
}

impl EntityRegistry {
    /// Build a registry from explicit lists.
    ///
    /// Duplicate entity or set names keep the first occurrence.
    pub fn new(
        entities: Vec<EntityDescriptor>,
        operation_sets: Vec<AdditionalOperationSet>,
    ) -> Self {
        let mut deduped = Vec::with_capacity(entities.len());
        let mut index = HashMap::new();
        for entity in entities {
            if !index.contains_key(&entity.name) {
                index.insert(entity.name.clone(), deduped.len());
                deduped.push(entity);
            }
        }

        let mut set_order = Vec::with_capacity(operation_sets.len());
        let mut sets = HashMap::new();
        for set in operation_sets {
            if !sets.contains_key(&set.name) {
                set_order.push(set.name.clone());
                sets.insert(set.name.clone(), set);
            }
        }

        Self {
            entities: deduped,
            index,
            set_order,
            sets,
        }
    }

    /// Build a registry from a discovery source plus configured sets.
    ///
    /// Entities that failed discovery are logged and excluded; the run
    /// continues. Configured operation sets take precedence over
    /// discovery-supplied ones with the same name.
    pub fn from_discovery(
        discovery: &dyn Discovery,
        configured_sets: &[AdditionalOperationSet],
    ) -> Self {
        let mut entities = Vec::new();
        for item in discovery.list_entities() {
            match item {
                Ok(entity) => entities.push(entity),
                Err(err) => {
                    tracing::warn!(entity = %err.entity, "excluding entity: {err}");
                }
            }
        }

        let mut sets: Vec<AdditionalOperationSet> = configured_sets.to_vec();
        sets.extend(discovery.list_additional_operation_sets());

        Self::new(entities, sets)
    }

    /// All permission-bearing entities, in discovery order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.iter().filter(|e| e.include_in_permissions)
    }

    /// Look up a discovered entity by name.
    pub fn lookup(&self, name: &str) -> Option<&EntityDescriptor> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    /// Descriptor for a name, falling back to a virtual entity.
    pub fn descriptor_or_virtual(&self, name: &str) -> EntityDescriptor {
        self.lookup(name)
            .cloned()
            .unwrap_or_else(|| EntityDescriptor::virtual_entity(name))
    }

    /// The additional operation set registered for a name, if any.
    pub fn additional_set(&self, name: &str) -> Option<&AdditionalOperationSet> {
        self.sets.get(name)
    }

    /// Effective operation list for a name (live or virtual entity).
    pub fn operations_for(&self, name: &str) -> Vec<String> {
        let entity = self.descriptor_or_virtual(name);
        crate::operations::resolve_operations(&entity, self.additional_set(name))
    }

    /// Ordered, deduplicated names covered by the full catalog pass:
    /// permission-bearing entities plus additional-set names.
    pub fn catalog_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entity in self.entities() {
            if !names.iter().any(|n| n == &entity.name) {
                names.push(entity.name.clone());
            }
        }
        for name in &self.set_order {
            if !names.iter().any(|n| n == name) {
                names.push(name.clone());
            }
        }
        names
    }
}
