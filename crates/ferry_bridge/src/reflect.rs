//! Host reflection adapter
//!
//! Resolves classes by qualified name through the host's [`HostRuntime`],
//! gated by the [`AccessPolicy`], and caches each resolution for the lifetime
//! of the owning environment. A resolved class carries a dispatch table that
//! merges members across its superclass and interface hierarchy, so member
//! lookup never walks the hierarchy again.

use crate::access::AccessPolicy;
use crate::error::{BridgeError, Result};
use ferry_host::{FieldDescriptor, HostClass, HostRuntime, MethodDescriptor};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// A resolved, immutable class.
pub type ClassHandle = Arc<ResolvedClass>;

/// What a name refers to on a particular proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
    None,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberKind::Field => "field",
            MemberKind::Method => "method",
            MemberKind::None => "none",
        }
    }
}

/// Members reachable on a class, grouped by name.
#[derive(Debug, Default)]
pub struct DispatchTable {
    methods: HashMap<String, Vec<MethodDescriptor>>,
    fields: HashMap<String, FieldDescriptor>,
}

impl DispatchTable {
    /// Adds members of one class in the hierarchy. Classes must be fed
    /// most-derived first: an inherited method with an already-seen signature
    /// is hidden by the override.
    fn absorb(&mut self, class: &HostClass) {
        for method in class.methods() {
            let overloads = self.methods.entry(method.name().to_string()).or_default();
            let overridden = overloads
                .iter()
                .any(|existing| existing.params() == method.params());
            if !overridden {
                overloads.push(method.clone());
            }
        }
        for field in class.fields() {
            self.fields
                .entry(field.name().to_string())
                .or_insert_with(|| field.clone());
        }
    }

    pub fn methods(&self, name: &str) -> &[MethodDescriptor] {
        self.methods.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn all_methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values().flatten()
    }

    pub fn all_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }
}

#[derive(Debug)]
pub struct ResolvedClass {
    class: Arc<HostClass>,
    /// Every ancestor (self included) with its distance from this class.
    ancestors: Vec<(String, u32)>,
    dispatch: DispatchTable,
}

impl ResolvedClass {
    pub fn name(&self) -> &str {
        self.class.name()
    }

    pub fn host_class(&self) -> &HostClass {
        &self.class
    }

    pub fn constructors(&self) -> &[MethodDescriptor] {
        self.class.constructors()
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub fn ancestors(&self) -> impl Iterator<Item = (&str, u32)> {
        self.ancestors.iter().map(|(name, depth)| (name.as_str(), *depth))
    }

    /// Number of inheritance steps from this class up to `ancestor`, if it is one.
    pub fn distance_to(&self, ancestor: &str) -> Option<u32> {
        self.ancestors
            .iter()
            .find(|(name, _)| name == ancestor)
            .map(|(_, depth)| *depth)
    }

    /// Classifies `name` on an instance (`statics_only == false`) or on the class itself.
    pub fn member_kind(&self, name: &str, statics_only: bool) -> MemberKind {
        if let Some(field) = self.dispatch.field(name) {
            if !statics_only || field.is_static() {
                return MemberKind::Field;
            }
        }
        let methods = self.dispatch.methods(name);
        if methods.iter().any(|m| !statics_only || m.is_static()) {
            return MemberKind::Method;
        }
        MemberKind::None
    }
}

/// Class resolution with a per-environment cache.
pub struct Reflector {
    runtime: Arc<dyn HostRuntime>,
    access: AccessPolicy,
    cache: HashMap<String, ClassHandle>,
}

impl Reflector {
    pub fn new(runtime: Arc<dyn HostRuntime>, access: AccessPolicy) -> Self {
        Self {
            runtime,
            access,
            cache: HashMap::new(),
        }
    }

    /// Resolves `name`, consulting the access policy first and the cache second.
    pub fn resolve_class(&mut self, name: &str) -> Result<ClassHandle> {
        self.access.check(name)?;
        if let Some(handle) = self.cache.get(name) {
            return Ok(Arc::clone(handle));
        }

        let class = self
            .runtime
            .find_class(name)
            .ok_or_else(|| BridgeError::ClassNotFound {
                name: name.to_string(),
            })?;
        let handle = Arc::new(self.build(class));
        tracing::debug!(
            class = %name,
            methods = handle.dispatch.methods.len(),
            fields = handle.dispatch.fields.len(),
            "resolved host class"
        );
        self.cache.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    pub fn list_constructors<'a>(&self, class: &'a ClassHandle) -> &'a [MethodDescriptor] {
        class.constructors()
    }

    /// All methods reachable on `class`, sorted by name then signature.
    pub fn list_members<'a>(&self, class: &'a ClassHandle) -> Vec<&'a MethodDescriptor> {
        let mut methods: Vec<_> = class.dispatch.all_methods().collect();
        methods.sort_by_key(|m| m.signature());
        methods
    }

    /// All fields reachable on `class`, sorted by name.
    pub fn list_fields<'a>(&self, class: &'a ClassHandle) -> Vec<&'a FieldDescriptor> {
        let mut fields: Vec<_> = class.dispatch.all_fields().collect();
        fields.sort_by(|a, b| a.name().cmp(b.name()));
        fields
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Walks the hierarchy breadth-first. Ancestors are looked up without the
    /// access policy: their members are only reachable through the subclass.
    fn build(&self, class: Arc<HostClass>) -> ResolvedClass {
        let mut dispatch = DispatchTable::default();
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([(class.clone(), 0_u32)]);

        while let Some((current, depth)) = queue.pop_front() {
            if !seen.insert(current.name().to_string()) {
                continue;
            }
            dispatch.absorb(&current);
            ancestors.push((current.name().to_string(), depth));

            let parents = current
                .superclass()
                .into_iter()
                .chain(current.interfaces().iter().map(String::as_str));
            for parent in parents {
                match self.runtime.find_class(parent) {
                    Some(parent_class) => queue.push_back((parent_class, depth + 1)),
                    None => {
                        // Unregistered ancestors still count for subtype checks
                        if seen.insert(parent.to_string()) {
                            ancestors.push((parent.to_string(), depth + 1));
                        }
                    }
                }
            }
        }

        ResolvedClass {
            class,
            ancestors,
            dispatch,
        }
    }
}
