//! Declarative configuration consumed by the engine.
//!
//! The whole surface is read-only for one run: the role table,
//! additional operation sets, default permissions, guard, and the
//! translation switch. Everything is parsed into typed values up front;
//! validation runs before the engine performs any write.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entity::{default_true, AdditionalOperationSet};
use crate::error::{ConfigError, Result};
use crate::naming::PermissionKey;

fn default_guard() -> String {
    "api".to_string()
}

fn default_label_file() -> String {
    "roles".to_string()
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string(), "ar".to_string()]
}

/// Top-level configuration for one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Guard partitioning the synthesized roles and permissions.
    #[serde(default = "default_guard")]
    pub default_guard: String,

    /// Declarative role table, processed in declaration order.
    #[serde(default)]
    pub roles: Vec<RoleSpec>,

    /// Named operation overrides applied by entity name.
    #[serde(default)]
    pub additional_operations: Vec<AdditionalOperationSet>,

    /// Permission identifiers unioned into every role's final set.
    #[serde(default)]
    pub default_permissions: Vec<String>,

    /// Display-label translation settings.
    #[serde(default)]
    pub translate: TranslateConfig,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            default_guard: default_guard(),
            roles: Vec::new(),
            additional_operations: Vec::new(),
            default_permissions: Vec::new(),
            translate: TranslateConfig::default(),
        }
    }
}

impl RolesConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config. Fatal on failure; runs before any write.
    pub fn validate(&self) -> Result<()> {
        if self.default_guard.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultGuard);
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for role in &self.roles {
            role.validate()?;
            if !seen.insert(role.name.as_str()) {
                return Err(ConfigError::DuplicateRole(role.name.clone()));
            }
        }

        for set in &self.additional_operations {
            if set.name.trim().is_empty() {
                return Err(ConfigError::InvalidOperationSet {
                    set: set.name.clone(),
                    reason: "set name is empty".to_string(),
                });
            }
            if set.operations.iter().any(|op| op.trim().is_empty()) {
                return Err(ConfigError::InvalidOperationSet {
                    set: set.name.clone(),
                    reason: "empty operation name".to_string(),
                });
            }
        }

        for identifier in &self.default_permissions {
            if PermissionKey::parse(identifier).is_none() {
                return Err(ConfigError::InvalidDefaultPermission(identifier.clone()));
            }
        }

        Ok(())
    }
}

/// Translation settings for display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// When false, raw entity/operation/role strings are used verbatim.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Label page handed to the label resolver.
    #[serde(default = "default_label_file")]
    pub file: String,

    /// Locales a display name is produced for.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: default_label_file(),
            locales: default_locales(),
        }
    }
}

/// Declarative spec for one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name; also the key for `like` references.
    pub name: String,

    /// Inherit the named role's currently persisted permission set.
    #[serde(default)]
    pub like: Option<String>,

    /// How declared permissions combine with an inherited or
    /// model-derived base set.
    #[serde(default, rename = "type")]
    pub modifier: Option<RoleModifier>,

    /// Declared permissions: entity name to operations spec.
    pub permissions: BTreeMap<String, OperationSpec>,

    /// Entity names whose full operation sets seed this role
    /// (ignored when `like` is present).
    #[serde(default)]
    pub models: Option<Vec<String>>,
}

impl RoleSpec {
    /// Empty spec for a named role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            like: None,
            modifier: None,
            permissions: BTreeMap::new(),
            models: None,
        }
    }

    /// Inherit from the named role.
    pub fn like(mut self, parent: impl Into<String>) -> Self {
        self.like = Some(parent.into());
        self
    }

    /// Set the combine modifier.
    pub fn modifier(mut self, modifier: RoleModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Declare permissions for an entity.
    pub fn permit(mut self, entity: impl Into<String>, spec: OperationSpec) -> Self {
        self.permissions.insert(entity.into(), spec);
        self
    }

    /// Seed from the full operation sets of the named entities.
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ConfigError::InvalidRole {
            role: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("role name is empty"));
        }
        if matches!(&self.like, Some(parent) if parent.trim().is_empty()) {
            return Err(invalid("`like` target is empty"));
        }
        for (entity, spec) in &self.permissions {
            if entity.trim().is_empty() {
                return Err(invalid("permission entity name is empty"));
            }
            if let OperationSpec::Explicit(ops) = spec {
                if ops.iter().any(|op| op.trim().is_empty()) {
                    return Err(invalid("empty operation name"));
                }
            }
        }
        if let Some(models) = &self.models {
            if models.iter().any(|m| m.trim().is_empty()) {
                return Err(invalid("empty model name"));
            }
        }
        Ok(())
    }
}

/// How a role's declared permissions combine with its base set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleModifier {
    /// Declared entries are removed from the base set.
    Exception,
    /// Declared entries are added to the base set.
    Added,
}

/// Operations granted on one entity within a role spec.
///
/// Serialized as the literal `"basic"`, the literal `"*"`, or a
/// sequence of operation names; the three forms are disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationSpec {
    /// The four basic operations.
    Basic,
    /// Every operation the entity supports.
    Wildcard,
    /// Exactly the listed operations.
    Explicit(Vec<String>),
}

impl OperationSpec {
    /// Explicit spec from an operation list.
    pub fn ops<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Explicit(operations.into_iter().map(Into::into).collect())
    }
}

impl Serialize for OperationSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Basic => serializer.serialize_str("basic"),
            Self::Wildcard => serializer.serialize_str("*"),
            Self::Explicit(ops) => ops.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for OperationSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = OperationSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"basic\", \"*\", or a sequence of operation names")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
                match value {
                    "basic" => Ok(OperationSpec::Basic),
                    "*" => Ok(OperationSpec::Wildcard),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut ops = Vec::new();
                while let Some(op) = seq.next_element::<String>()? {
                    ops.push(op);
                }
                Ok(OperationSpec::Explicit(ops))
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}
