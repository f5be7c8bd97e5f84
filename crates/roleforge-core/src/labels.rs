//! Display-label resolution and composition.
//!
//! Label lookup itself lives outside the engine: [`LabelSource`] is the
//! seam a host application implements over its locale files. The engine
//! only composes the resolved pieces into per-locale display names.

use std::collections::BTreeMap;

use crate::config::TranslateConfig;

/// Per-locale display labels, keyed by locale code.
pub type DisplayName = BTreeMap<String, String>;

/// Resolves a label for a key from a named label page.
///
/// Total function: implementations fall back to the key itself when no
/// translation exists.
pub trait LabelSource: Send + Sync {
    fn resolve(&self, key: &str, page: &str, locale: &str) -> String;
}

/// Pass-through source used when no label files are wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyLabels;

impl LabelSource for KeyLabels {
    fn resolve(&self, key: &str, _page: &str, _locale: &str) -> String {
        if key.is_empty() {
            "---".to_string()
        } else {
            key.to_string()
        }
    }
}

/// Display name for a role, one entry per configured locale.
pub fn role_display_name(
    labels: &dyn LabelSource,
    translate: &TranslateConfig,
    role: &str,
) -> DisplayName {
    translate
        .locales
        .iter()
        .map(|locale| {
            let label = if translate.enabled {
                labels.resolve(role, &translate.file, locale)
            } else {
                role.to_string()
            };
            (locale.clone(), label)
        })
        .collect()
}

/// Display name for a permission: `"<entityLabel> (<operationLabel>)"`.
pub fn permission_display_name(
    labels: &dyn LabelSource,
    translate: &TranslateConfig,
    entity: &str,
    operation: &str,
) -> DisplayName {
    translate
        .locales
        .iter()
        .map(|locale| {
            let label = if translate.enabled {
                format!(
                    "{} ({})",
                    labels.resolve(entity, &translate.file, locale),
                    labels.resolve(operation, &translate.file, locale)
                )
            } else {
                format!("{} ({})", entity, operation)
            };
            (locale.clone(), label)
        })
        .collect()
}
