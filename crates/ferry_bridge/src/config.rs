//! Bridge configuration

use crate::collection::PolicyKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Embedding-level settings for one script environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Global name under which the import entry point is installed.
    pub root_binding: String,
    /// Name of the import function on the root binding.
    pub import_function: String,
    pub access: AccessConfig,
    /// Collection policy overrides, keyed by class name (`[]` for arrays).
    pub collections: BTreeMap<String, PolicyKind>,
}

/// Which classes scripts may import.
///
/// Patterns are exact class names, `prefix.*` for a whole package tree, or `*`.
/// A class must match an allow pattern and no deny pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            root_binding: "host".to_string(),
            import_function: "importClass".to_string(),
            access: AccessConfig::default(),
            collections: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn allow(mut self, pattern: impl Into<String>) -> Self {
        self.access.allow.push(pattern.into());
        self
    }

    pub fn deny(mut self, pattern: impl Into<String>) -> Self {
        self.access.deny.push(pattern.into());
        self
    }

    pub fn collection(mut self, class: impl Into<String>, kind: PolicyKind) -> Self {
        self.collections.insert(class.into(), kind);
        self
    }
}
