//! Collection translation policy
//!
//! Decides per host type whether a returned collection stays an opaque proxy
//! (`size()` and `get(index)` only) or is materialized into a script sequence.
//! Arrays are translated by default. Any other class is proxied unless it, or
//! one of its ancestors, is registered for full translation.

use crate::environment::ScriptEnvironment;
use crate::error::{BridgeError, Result};
use crate::proxy::ProxyTarget;
use crate::reflect::{ClassHandle, ResolvedClass};
use crate::value::ScriptValue;
use ferry_host::{HostArray, HostRef, HostType, HostValue, MethodDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Opaque proxy with indexed access; no native iteration.
    ProxyAccess,
    /// Materialized as a native sequence.
    FullTranslation,
}

/// Host type identity a policy entry is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// Every host array, whatever its element type.
    Array,
    Class(String),
}

impl TypeKey {
    /// `[]` names arrays; anything else is a class name.
    pub fn parse(key: &str) -> Self {
        match key {
            "[]" => TypeKey::Array,
            name => TypeKey::Class(name.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectionPolicy {
    entries: HashMap<TypeKey, PolicyKind>,
}

impl Default for CollectionPolicy {
    fn default() -> Self {
        Self {
            entries: HashMap::from([(TypeKey::Array, PolicyKind::FullTranslation)]),
        }
    }
}

impl CollectionPolicy {
    /// Defaults overlaid with configured entries.
    pub fn from_config(entries: &BTreeMap<String, PolicyKind>) -> Self {
        entries
            .iter()
            .fold(Self::default(), |policy, (key, kind)| policy.with(TypeKey::parse(key), *kind))
    }

    pub fn register(&mut self, key: TypeKey, kind: PolicyKind) {
        self.entries.insert(key, kind);
    }

    pub fn with(mut self, key: TypeKey, kind: PolicyKind) -> Self {
        self.register(key, kind);
        self
    }

    pub fn lookup(&self, key: &TypeKey) -> Option<PolicyKind> {
        self.entries.get(key).copied()
    }

    pub fn for_array(&self) -> PolicyKind {
        self.lookup(&TypeKey::Array).unwrap_or(PolicyKind::ProxyAccess)
    }

    /// The nearest registered ancestor decides; unregistered types are proxied.
    pub fn for_class(&self, class: &ResolvedClass) -> PolicyKind {
        let mut ancestors: Vec<_> = class.ancestors().collect();
        ancestors.sort_by_key(|(_, distance)| *distance);
        ancestors
            .into_iter()
            .find_map(|(name, _)| self.lookup(&TypeKey::Class(name.to_string())))
            .unwrap_or(PolicyKind::ProxyAccess)
    }
}

impl ScriptEnvironment {
    /// Applies the collection policy to a host instance of a known class.
    pub fn translate(&mut self, object: HostRef, class: ClassHandle) -> Result<ScriptValue> {
        match self.collections.for_class(&class) {
            PolicyKind::FullTranslation => self.materialize(&object, &class),
            PolicyKind::ProxyAccess => Ok(self.wrap(ProxyTarget::Instance { object, class })),
        }
    }

    pub(crate) fn translate_object(&mut self, object: HostRef) -> Result<ScriptValue> {
        let class = self.reflector.resolve_class(object.class_name())?;
        self.translate(object, class)
    }

    pub(crate) fn translate_array(&mut self, array: Arc<HostArray>) -> Result<ScriptValue> {
        match self.collections.for_array() {
            PolicyKind::FullTranslation => {
                let items = array
                    .items
                    .iter()
                    .map(|item| self.to_script(item.clone()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ScriptValue::Sequence(items))
            }
            PolicyKind::ProxyAccess => Ok(self.wrap(ProxyTarget::Array(array))),
        }
    }

    /// Walks a list-like instance through its `size()` and `get(int)` members.
    fn materialize(&mut self, object: &HostRef, class: &ClassHandle) -> Result<ScriptValue> {
        let size = list_accessor(class, "size", &[])?;
        let get = list_accessor(class, "get", &[HostType::Int])?;

        let len = size
            .invoke(Some(object), Vec::new())
            .map_err(|err| BridgeError::invocation(format!("{}.size", class.name()), err))?;
        let len = len
            .as_i32()
            .ok_or_else(|| BridgeError::coercion(HostType::Int, len.host_type()))?;

        let mut items = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
        for index in 0..len {
            let item = get
                .invoke(Some(object), vec![HostValue::Int(index)])
                .map_err(|err| BridgeError::invocation(format!("{}.get", class.name()), err))?;
            items.push(self.to_script(item)?);
        }
        tracing::trace!(class = %class.name(), len, "collection fully translated");
        Ok(ScriptValue::Sequence(items))
    }
}

fn list_accessor<'c>(
    class: &'c ClassHandle,
    name: &str,
    params: &[HostType],
) -> Result<&'c MethodDescriptor> {
    class
        .dispatch()
        .methods(name)
        .iter()
        .find(|m| !m.is_static() && m.params() == params)
        .ok_or_else(|| BridgeError::NoSuchMember {
            class: class.name().to_string(),
            member: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{demo_environment, message_list};

    #[test]
    fn policy_kinds_use_snake_case() {
        let json = serde_json::to_string(&PolicyKind::FullTranslation).unwrap();
        assert_eq!(json, "\"full_translation\"");
        let kind: PolicyKind = serde_json::from_str("\"proxy_access\"").unwrap();
        assert_eq!(kind, PolicyKind::ProxyAccess);
    }

    #[test]
    fn arrays_translate_by_default() {
        let policy = CollectionPolicy::default();
        assert_eq!(policy.for_array(), PolicyKind::FullTranslation);
        assert_eq!(policy.lookup(&TypeKey::parse("demo.MessageList")), None);
    }

    #[test]
    fn config_overrides_defaults() {
        let entries = BTreeMap::from([
            ("[]".to_string(), PolicyKind::ProxyAccess),
            ("demo.MessageList".to_string(), PolicyKind::FullTranslation),
        ]);
        let policy = CollectionPolicy::from_config(&entries);
        assert_eq!(policy.for_array(), PolicyKind::ProxyAccess);
        assert_eq!(
            policy.lookup(&TypeKey::Class("demo.MessageList".into())),
            Some(PolicyKind::FullTranslation)
        );
    }

    #[test]
    fn nearest_ancestor_decides() {
        let mut env = demo_environment();
        let class = env.resolve_class("demo.MessageList").unwrap();
        assert_eq!(env.collections().for_class(&class), PolicyKind::ProxyAccess);

        let policy = CollectionPolicy::default()
            .with(TypeKey::Class(ferry_host::ROOT_CLASS.into()), PolicyKind::FullTranslation)
            .with(TypeKey::Class("demo.AbstractList".into()), PolicyKind::ProxyAccess);
        assert_eq!(policy.for_class(&class), PolicyKind::ProxyAccess);

        let policy = CollectionPolicy::default()
            .with(TypeKey::Class("demo.List".into()), PolicyKind::FullTranslation);
        assert_eq!(policy.for_class(&class), PolicyKind::FullTranslation);
    }

    #[test]
    fn full_translation_preserves_length_and_elements() {
        let mut env = demo_environment();
        env.collections_mut()
            .register(TypeKey::parse("demo.MessageList"), PolicyKind::FullTranslation);

        for items in [vec![], vec!["x"], vec!["a", "b", "c"]] {
            let list = message_list(&items);
            let translated = env.to_script(HostValue::Object(list)).unwrap();
            let sequence = translated.as_sequence().unwrap();
            assert_eq!(sequence.len(), items.len());
            for (i, item) in items.iter().enumerate() {
                assert_eq!(sequence[i], ScriptValue::from(*item));
            }
        }
    }

    #[test]
    fn proxy_access_exposes_size_and_get() {
        let mut env = demo_environment();
        let items = ["a", "b", "c", "d"];
        let list = env
            .to_script(HostValue::Object(message_list(&items)))
            .unwrap()
            .as_proxy()
            .unwrap();

        assert_eq!(
            env.call(list, "size", &[]).unwrap(),
            ScriptValue::Integer(items.len() as i64)
        );
        for (i, item) in items.iter().enumerate() {
            assert_eq!(
                env.call(list, "get", &[ScriptValue::Integer(i as i64)]).unwrap(),
                ScriptValue::from(*item)
            );
        }
        let err = env.check_iterable(list).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotIterable);
    }

    #[test]
    fn arrays_materialize_elementwise() {
        let mut env = demo_environment();
        let nested = HostValue::array(
            HostType::Any,
            vec![
                HostValue::Int(1),
                HostValue::Object(message_list(&["m"])),
                HostValue::Null,
            ],
        );
        let translated = env.to_script(nested).unwrap();
        let sequence = translated.as_sequence().unwrap();
        assert_eq!(sequence[0], ScriptValue::Integer(1));
        assert!(sequence[1].as_proxy().is_some());
        assert_eq!(sequence[2], ScriptValue::Null);
    }

    #[test]
    fn denied_element_classes_fail_translation() {
        let config = crate::config::BridgeConfig::default()
            .allow("demo.Interaction")
            .allow(ferry_host::ROOT_CLASS);
        let mut env = ScriptEnvironment::new(crate::test_support::demo_registry(), &config);
        let err = env
            .to_script(HostValue::Object(message_list(&["a"])))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }
}
