//! Script environment
//!
//! One [`ScriptEnvironment`] per running script. It owns everything the bridge
//! caches on the script's behalf (resolved classes, proxy handles, global
//! bindings) so nothing leaks between environments running side by side.
//! The environment is single-threaded by construction: every operation takes
//! `&mut self` and blocks until the host call returns.

use crate::access::AccessPolicy;
use crate::bootstrap::Binding;
use crate::collection::CollectionPolicy;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::proxy::{HandleTable, ProxyTarget};
use crate::reflect::{ClassHandle, Reflector};
use crate::value::ScriptValue;
use ferry_host::HostRuntime;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, bootstrap hook not yet run.
    Fresh,
    /// Bootstrap hook ran; bindings are in place.
    Initialized,
    /// Torn down; every handle issued so far is stale.
    TornDown,
}

pub struct ScriptEnvironment {
    pub(crate) reflector: Reflector,
    pub(crate) handles: HandleTable,
    pub(crate) collections: CollectionPolicy,
    pub(crate) root_binding: String,
    pub(crate) import_function: String,
    pub(crate) globals: BTreeMap<String, Binding>,
    pub(crate) lifecycle: Lifecycle,
}

impl ScriptEnvironment {
    pub fn new(runtime: Arc<dyn HostRuntime>, config: &BridgeConfig) -> Self {
        let mut env = Self::with_policies(
            runtime,
            AccessPolicy::from_config(&config.access),
            CollectionPolicy::from_config(&config.collections),
        );
        env.root_binding = config.root_binding.clone();
        env.import_function = config.import_function.clone();
        env
    }

    pub fn with_policies(
        runtime: Arc<dyn HostRuntime>,
        access: AccessPolicy,
        collections: CollectionPolicy,
    ) -> Self {
        let defaults = BridgeConfig::default();
        Self {
            reflector: Reflector::new(runtime, access),
            handles: HandleTable::default(),
            collections,
            root_binding: defaults.root_binding,
            import_function: defaults.import_function,
            globals: BTreeMap::new(),
            lifecycle: Lifecycle::Fresh,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Initialized
    }

    pub fn root_binding(&self) -> &str {
        &self.root_binding
    }

    pub fn import_function(&self) -> &str {
        &self.import_function
    }

    /// Global bindings installed by the bootstrap hook.
    pub fn globals(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.globals.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    pub fn reflector(&self) -> &Reflector {
        &self.reflector
    }

    pub fn collections(&self) -> &CollectionPolicy {
        &self.collections
    }

    pub fn collections_mut(&mut self) -> &mut CollectionPolicy {
        &mut self.collections
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    pub fn resolve_class(&mut self, name: &str) -> Result<ClassHandle> {
        self.reflector.resolve_class(name)
    }

    /// The root API: resolves `name` and returns a constructible class proxy.
    pub fn import_class(&mut self, name: &str) -> Result<ScriptValue> {
        let class = self.reflector.resolve_class(name)?;
        tracing::debug!(class = %name, "class imported by script");
        let handle = self.handles.insert(ProxyTarget::Class(class));
        Ok(ScriptValue::Proxy(handle))
    }

    /// Releases every cached class and proxy. Handles issued before this call
    /// fail with `StaleHandle` afterwards.
    pub fn teardown(&mut self) {
        tracing::debug!(
            classes = self.reflector.cached_len(),
            proxies = self.handles.len(),
            "tearing down script environment"
        );
        self.reflector.clear();
        self.handles.clear();
        self.globals.clear();
        self.lifecycle = Lifecycle::TornDown;
    }
}

impl Drop for ScriptEnvironment {
    fn drop(&mut self) {
        if self.lifecycle != Lifecycle::TornDown {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::test_support::{demo_environment, demo_registry};

    #[test]
    fn import_returns_class_proxy() {
        let mut env = demo_environment();
        let value = env.import_class("demo.Interaction").unwrap();
        let handle = value.as_proxy().unwrap();
        assert!(env.handles().get(handle).unwrap().is_class());
    }

    #[test]
    fn importing_twice_reuses_the_handle() {
        let mut env = demo_environment();
        let first = env.import_class("demo.Interaction").unwrap();
        let second = env.import_class("demo.Interaction").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_class_yields_no_proxy() {
        let mut env = demo_environment();
        let before = env.handles().len();
        let err = env.import_class("demo.Missing").unwrap_err();
        assert!(matches!(err, BridgeError::ClassNotFound { .. }));
        assert_eq!(env.handles().len(), before);
    }

    #[test]
    fn config_drives_access() {
        let config = BridgeConfig::default().allow("demo.*").deny("demo.Secret");
        let mut env = ScriptEnvironment::new(demo_registry(), &config);
        assert!(env.import_class("demo.Interaction").is_ok());
        let err = env.import_class("demo.Secret").unwrap_err();
        assert!(matches!(err, BridgeError::AccessDenied { .. }));
    }

    #[test]
    fn environments_do_not_share_caches() {
        let registry = demo_registry();
        let mut a = ScriptEnvironment::with_policies(
            registry.clone(),
            AccessPolicy::allow_all(),
            CollectionPolicy::default(),
        );
        let b = ScriptEnvironment::with_policies(
            registry,
            AccessPolicy::allow_all(),
            CollectionPolicy::default(),
        );
        a.import_class("demo.Interaction").unwrap();
        assert!(a.reflector().is_cached("demo.Interaction"));
        assert!(!b.reflector().is_cached("demo.Interaction"));
    }

    #[test]
    fn teardown_invalidates_handles() {
        let mut env = demo_environment();
        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        env.teardown();

        assert_eq!(env.lifecycle(), Lifecycle::TornDown);
        assert_eq!(env.reflector().cached_len(), 0);
        let err = env.get(class, "LIMIT").unwrap_err();
        assert!(matches!(err, BridgeError::StaleHandle { .. }));

        // A fresh import gets a fresh, valid handle
        let again = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        assert_ne!(again, class);
        assert!(env.handles().get(again).is_ok());
    }
}
