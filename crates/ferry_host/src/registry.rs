//! Class lookup
//!
//! [`HostRuntime`] is the reflection capability the bridge consumes.
//! [`ClassRegistry`] implements it for classes registered from Rust.

use crate::class::HostClass;
use crate::error::{HostError, HostResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Reflection capability of the host: class lookup by qualified name.
pub trait HostRuntime: Send + Sync {
    fn find_class(&self, name: &str) -> Option<Arc<HostClass>>;

    /// Every class name the runtime can resolve, sorted.
    fn class_names(&self) -> Vec<String>;
}

/// In-process class table, shareable between script environments.
#[derive(Default)]
pub struct ClassRegistry {
    classes: RwLock<HashMap<String, Arc<HostClass>>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class: HostClass) -> HostResult<Arc<HostClass>> {
        let mut classes = self.classes.write();
        let name = class.name().to_string();
        if classes.contains_key(&name) {
            return Err(HostError::DuplicateClass { name });
        }

        tracing::debug!(class = %name, "registered host class");
        let class = Arc::new(class);
        classes.insert(name, Arc::clone(&class));
        Ok(class)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl HostRuntime for ClassRegistry {
    fn find_class(&self, name: &str) -> Option<Arc<HostClass>> {
        self.classes.read().get(name).cloned()
    }

    fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;

    #[test]
    fn registers_and_finds() {
        let registry = ClassRegistry::new();
        registry.register(ClassBuilder::new("b.Second").build()).unwrap();
        registry.register(ClassBuilder::new("a.First").build()).unwrap();

        assert!(registry.contains("a.First"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find_class("b.Second").unwrap().name(), "b.Second");
        assert!(registry.find_class("c.Missing").is_none());
        assert_eq!(registry.class_names(), vec!["a.First", "b.Second"]);
    }

    #[test]
    fn rejects_duplicates() {
        let registry = ClassRegistry::new();
        registry.register(ClassBuilder::new("a.First").build()).unwrap();
        let err = registry.register(ClassBuilder::new("a.First").build()).unwrap_err();
        assert!(matches!(err, HostError::DuplicateClass { name } if name == "a.First"));
    }
}
