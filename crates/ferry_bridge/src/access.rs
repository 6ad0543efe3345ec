//! Import access policy

use crate::config::AccessConfig;
use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Any,
    /// Matches the package itself and everything below it.
    Prefix(String),
    Exact(String),
}

impl Pattern {
    fn parse(source: &str) -> Self {
        let source = source.trim();
        if source == "*" {
            Pattern::Any
        } else if let Some(prefix) = source.strip_suffix(".*") {
            Pattern::Prefix(prefix.to_string())
        } else {
            Pattern::Exact(source.to_string())
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Prefix(prefix) => name
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with('.')),
            Pattern::Exact(exact) => exact == name,
        }
    }
}

/// Allowlist/denylist over qualified class names. Deny wins; nothing is
/// importable unless some allow pattern matches.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    allow: Vec<Pattern>,
    deny: Vec<Pattern>,
}

impl AccessPolicy {
    /// Policy that denies every class.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Policy that permits every class. Only for trusted scripts.
    pub fn allow_all() -> Self {
        Self {
            allow: vec![Pattern::Any],
            deny: Vec::new(),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self {
            allow: config.allow.iter().map(|p| Pattern::parse(p)).collect(),
            deny: config.deny.iter().map(|p| Pattern::parse(p)).collect(),
        }
    }

    pub fn allow(mut self, pattern: &str) -> Self {
        self.allow.push(Pattern::parse(pattern));
        self
    }

    pub fn deny(mut self, pattern: &str) -> Self {
        self.deny.push(Pattern::parse(pattern));
        self
    }

    pub fn permits(&self, name: &str) -> bool {
        if self.deny.iter().any(|pattern| pattern.matches(name)) {
            return false;
        }
        self.allow.iter().any(|pattern| pattern.matches(name))
    }

    pub fn check(&self, name: &str) -> Result<()> {
        if self.permits(name) {
            Ok(())
        } else {
            tracing::warn!(class = %name, "class import denied by access policy");
            Err(BridgeError::AccessDenied {
                name: name.to_string(),
            })
        }
    }
}
