//! Canonical permission naming.
//!
//! A permission is identified by `"<operation>-<entity-slug>"`. The slug
//! is derived the same way at every call site, so re-deriving the name
//! for a given (entity, operation) pair always yields the same string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reduce a possibly qualified entity name to its simple name.
///
/// Qualifier segments (`billing::Invoice`) are stripped before slugging.
fn simple_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// Hyphen-separated lowercase form of an entity's simple name.
///
/// `InvoiceItem` becomes `invoice-item`; whitespace and underscores are
/// treated as separators.
pub fn entity_slug(name: &str) -> String {
    let simple = simple_name(name.trim());
    let mut slug = String::with_capacity(simple.len() + 4);

    for ch in simple.chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
            continue;
        }
        if ch.is_uppercase() && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        slug.extend(ch.to_lowercase());
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// The (operation, entity) pair behind a permission identifier.
///
/// `name()` produces the canonical identifier; `parse()` recovers the
/// pair from one. Together with `entity_slug` this is the single
/// canonicalization used by both direct synthesis and wildcard
/// expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    /// Lowercase operation name.
    pub operation: String,
    /// Slug of the owning entity; doubles as the permission group.
    pub entity_slug: String,
}

impl PermissionKey {
    /// Derive the key for an entity/operation pair.
    pub fn new(entity_name: &str, operation: &str) -> Self {
        Self {
            operation: operation.trim().to_lowercase(),
            entity_slug: entity_slug(entity_name),
        }
    }

    /// The canonical identifier, `"<operation>-<entity-slug>"`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.operation, self.entity_slug)
    }

    /// Recover a key from a canonical identifier.
    ///
    /// Splits on the first `-`; returns `None` when either side is
    /// empty. Used to re-derive group and labels for identifiers that
    /// arrive as raw strings (e.g. configured default permissions).
    pub fn parse(identifier: &str) -> Option<Self> {
        let (operation, entity_slug) = identifier.split_once('-')?;
        if operation.is_empty() || entity_slug.is_empty() {
            return None;
        }
        Some(Self {
            operation: operation.to_string(),
            entity_slug: entity_slug.to_string(),
        })
    }

    /// The permission group this key belongs to (its entity slug).
    pub fn group(&self) -> &str {
        &self.entity_slug
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.operation, self.entity_slug)
    }
}

/// Canonical identifier for an entity/operation pair.
pub fn canonical_name(entity_name: &str, operation: &str) -> String {
    PermissionKey::new(entity_name, operation).name()
}
