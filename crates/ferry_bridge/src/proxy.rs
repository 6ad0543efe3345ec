//! Proxy object layer
//!
//! Scripts never hold host objects directly. They hold a [`ProxyHandle`] into
//! the environment's [`HandleTable`], and every property read, write, call and
//! construction on that handle is routed through the methods below.

use crate::environment::ScriptEnvironment;
use crate::error::{BridgeError, Result};
use crate::marshal::canonical_string;
use crate::overload::{self, Selection};
use crate::reflect::{ClassHandle, MemberKind};
use crate::value::{ProxyHandle, ScriptValue};
use ferry_host::{HostArray, HostError, HostRef, HostType, HostValue, MethodDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// What a proxy stands for.
#[derive(Debug, Clone)]
pub enum ProxyTarget {
    /// A class: static members plus construction.
    Class(ClassHandle),
    /// A live host instance, with the class it dispatches through.
    Instance { object: HostRef, class: ClassHandle },
    /// A host array kept opaque by the collection policy.
    Array(Arc<HostArray>),
}

#[derive(Debug, Clone)]
pub struct ObjectProxy {
    handle: ProxyHandle,
    target: ProxyTarget,
}

impl ObjectProxy {
    pub fn handle(&self) -> ProxyHandle {
        self.handle
    }

    pub fn target(&self) -> &ProxyTarget {
        &self.target
    }

    pub fn is_class(&self) -> bool {
        matches!(self.target, ProxyTarget::Class(_))
    }

    /// Class the proxy dispatches through. Arrays have none.
    pub fn class(&self) -> Option<&ClassHandle> {
        match &self.target {
            ProxyTarget::Class(class) | ProxyTarget::Instance { class, .. } => Some(class),
            ProxyTarget::Array(_) => None,
        }
    }

    /// Human-readable type, used in error messages.
    pub fn type_label(&self) -> String {
        match &self.target {
            ProxyTarget::Class(class) => format!("class {}", class.name()),
            ProxyTarget::Instance { class, .. } => class.name().to_string(),
            ProxyTarget::Array(array) => format!("{}[]", array.element),
        }
    }

    /// The wrapped host value, unchanged.
    pub fn host_value(&self) -> HostValue {
        match &self.target {
            ProxyTarget::Class(class) => HostValue::Class(class.name().to_string()),
            ProxyTarget::Instance { object, .. } => HostValue::Object(object.clone()),
            ProxyTarget::Array(array) => HostValue::Array(array.clone()),
        }
    }

    /// Receiver passed to instance members.
    pub fn receiver(&self) -> Option<&HostRef> {
        match &self.target {
            ProxyTarget::Instance { object, .. } => Some(object),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identity {
    Class(String),
    Object(usize),
    Array(usize),
}

impl Identity {
    fn of(target: &ProxyTarget) -> Self {
        match target {
            ProxyTarget::Class(class) => Identity::Class(class.name().to_string()),
            ProxyTarget::Instance { object, .. } => Identity::Object(object.identity()),
            ProxyTarget::Array(array) => Identity::Array(Arc::as_ptr(array) as usize),
        }
    }
}

#[derive(Debug)]
struct Slot {
    proxy: ObjectProxy,
    holders: u32,
}

/// Per-environment proxy storage.
///
/// The same host instance is always wrapped by the same handle while that
/// handle is live. Script-side holders [`retain`](Self::retain) a handle and
/// [`release`](Self::release) it; the proxy goes with its last holder.
/// Handle numbers are never reused, so a dropped handle can never alias a
/// newer proxy.
#[derive(Debug, Default)]
pub struct HandleTable {
    slots: HashMap<ProxyHandle, Slot>,
    by_identity: HashMap<Identity, ProxyHandle>,
    next: u32,
}

impl HandleTable {
    pub fn insert(&mut self, target: ProxyTarget) -> ProxyHandle {
        let identity = Identity::of(&target);
        if let Some(handle) = self.by_identity.get(&identity) {
            return *handle;
        }

        let handle = ProxyHandle(self.next);
        self.next = self.next.wrapping_add(1);
        let proxy = ObjectProxy { handle, target };
        self.slots.insert(handle, Slot { proxy, holders: 0 });
        self.by_identity.insert(identity, handle);
        handle
    }

    pub fn get(&self, handle: ProxyHandle) -> Result<&ObjectProxy> {
        self.slots
            .get(&handle)
            .map(|slot| &slot.proxy)
            .ok_or(BridgeError::StaleHandle { handle: handle.0 })
    }

    /// Records one more holder of `handle`.
    pub fn retain(&mut self, handle: ProxyHandle) -> Result<()> {
        let slot = self
            .slots
            .get_mut(&handle)
            .ok_or(BridgeError::StaleHandle { handle: handle.0 })?;
        slot.holders = slot.holders.saturating_add(1);
        Ok(())
    }

    /// Drops one holder of `handle`. The proxy, and its reference to the
    /// host value, goes away with the last holder, or at once if the handle
    /// was never retained. Returns true if the proxy went away.
    pub fn release(&mut self, handle: ProxyHandle) -> bool {
        let Some(slot) = self.slots.get_mut(&handle) else {
            return false;
        };
        if slot.holders > 1 {
            slot.holders -= 1;
            return false;
        }

        let Some(slot) = self.slots.remove(&handle) else {
            return false;
        };
        let identity = Identity::of(&slot.proxy.target);
        if self.by_identity.get(&identity) == Some(&handle) {
            self.by_identity.remove(&identity);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops every proxy. Outstanding handles become stale.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.by_identity.clear();
    }
}

impl ScriptEnvironment {
    pub fn proxy(&self, handle: ProxyHandle) -> Result<&ObjectProxy> {
        self.handles.get(handle)
    }

    /// Records a script-side holder of `handle`.
    pub fn retain(&mut self, handle: ProxyHandle) -> Result<()> {
        self.handles.retain(handle)
    }

    /// Drops a script-side holder of `handle`; see [`HandleTable::release`].
    pub fn release(&mut self, handle: ProxyHandle) -> bool {
        let released = self.handles.release(handle);
        if released {
            tracing::trace!(handle = handle.0, live = self.handles.len(), "proxy released");
        }
        released
    }

    pub(crate) fn wrap(&mut self, target: ProxyTarget) -> ScriptValue {
        ScriptValue::Proxy(self.handles.insert(target))
    }

    /// Wraps a host instance without applying the collection policy.
    pub fn wrap_object(&mut self, object: HostRef) -> Result<ScriptValue> {
        let class = self.reflector.resolve_class(object.class_name())?;
        Ok(self.wrap(ProxyTarget::Instance { object, class }))
    }

    /// Classifies `name` on the proxy. Class proxies only see static members.
    pub fn member_kind(&self, handle: ProxyHandle, name: &str) -> Result<MemberKind> {
        let proxy = self.handles.get(handle)?;
        let kind = match proxy.target() {
            ProxyTarget::Class(class) => class.member_kind(name, true),
            ProxyTarget::Instance { class, .. } => class.member_kind(name, false),
            ProxyTarget::Array(_) => match name {
                "length" => MemberKind::Field,
                "get" | "size" => MemberKind::Method,
                _ => MemberKind::None,
            },
        };
        Ok(kind)
    }

    pub fn has(&self, handle: ProxyHandle, name: &str) -> Result<bool> {
        Ok(self.member_kind(handle, name)? != MemberKind::None)
    }

    /// Property read: a field, or else a zero-argument method, marshaled back.
    pub fn get(&mut self, handle: ProxyHandle, name: &str) -> Result<ScriptValue> {
        let proxy = self.handles.get(handle)?.clone();
        let Some(class) = proxy.class() else {
            return match name {
                "length" => self.call(handle, "size", &[]),
                _ => Err(no_such_member(&proxy, name)),
            };
        };

        let statics_only = proxy.is_class();
        if let Some(field) = class.dispatch().field(name) {
            if !statics_only || field.is_static() {
                let receiver = if field.is_static() { None } else { proxy.receiver() };
                let value = field
                    .get(receiver)
                    .map_err(|err| BridgeError::invocation(member_path(class, name), err))?;
                return self.to_script(value);
            }
        }

        let accessor = class
            .dispatch()
            .methods(name)
            .iter()
            .find(|m| m.params().is_empty() && (!statics_only || m.is_static()));
        match accessor {
            Some(method) => {
                let value = invoke(&proxy, class, method, Vec::new())?;
                self.to_script(value)
            }
            None => Err(no_such_member(&proxy, name)),
        }
    }

    /// Property write, coerced to the field's declared type.
    pub fn set(&mut self, handle: ProxyHandle, name: &str, value: &ScriptValue) -> Result<()> {
        let proxy = self.handles.get(handle)?;
        let Some(class) = proxy.class() else {
            return Err(match name {
                "length" => read_only(proxy, name),
                _ => no_such_member(proxy, name),
            });
        };

        let statics_only = proxy.is_class();
        match class.dispatch().field(name) {
            Some(field) if !statics_only || field.is_static() => {
                let converted = self.to_host(value, field.ty())?;
                let receiver = if field.is_static() { None } else { proxy.receiver() };
                field.set(receiver, converted).map_err(|err| match err {
                    HostError::FinalField { .. } => read_only(proxy, name),
                    other => BridgeError::invocation(member_path(class, name), other),
                })?;
                tracing::trace!(member = %member_path(class, name), "field written");
                Ok(())
            }
            _ if class.member_kind(name, statics_only) == MemberKind::Method => {
                Err(read_only(proxy, name))
            }
            _ => Err(no_such_member(proxy, name)),
        }
    }

    /// Method invocation with overload resolution.
    pub fn call(&mut self, handle: ProxyHandle, name: &str, args: &[ScriptValue]) -> Result<ScriptValue> {
        let proxy = self.handles.get(handle)?.clone();
        let Some(class) = proxy.class() else {
            return self.call_array(&proxy, name, args);
        };

        let candidates = visible_methods(&proxy, class, name)?;
        let target = member_path(class, name);
        let Selection { method, args } = overload::select(&target, &candidates, args, &self.handles)?;
        let value = invoke(&proxy, class, method, args)?;
        self.to_script(value)
    }

    /// Invocation of the overload declared with exactly `signature`.
    pub fn call_with_signature(
        &mut self,
        handle: ProxyHandle,
        name: &str,
        signature: &[HostType],
        args: &[ScriptValue],
    ) -> Result<ScriptValue> {
        let proxy = self.handles.get(handle)?.clone();
        let Some(class) = proxy.class() else {
            return self.call_array(&proxy, name, args);
        };

        let candidates = visible_methods(&proxy, class, name)?;
        let target = member_path(class, name);
        let Selection { method, args } =
            overload::select_exact(&target, &candidates, signature, args, &self.handles)?;
        let value = invoke(&proxy, class, method, args)?;
        self.to_script(value)
    }

    /// `new` on a class proxy. The new instance is always proxied, whatever
    /// the collection policy says about its class.
    pub fn construct(&mut self, handle: ProxyHandle, args: &[ScriptValue]) -> Result<ScriptValue> {
        let proxy = self.handles.get(handle)?.clone();
        let ProxyTarget::Class(class) = proxy.target() else {
            return Err(BridgeError::NotConstructible {
                class: proxy.type_label(),
            });
        };

        let candidates: Vec<&MethodDescriptor> = class.constructors().iter().collect();
        if candidates.is_empty() {
            return Err(BridgeError::NotConstructible {
                class: class.name().to_string(),
            });
        }

        let target = format!("new {}", class.name());
        let Selection { method, args } = overload::select(&target, &candidates, args, &self.handles)?;
        let created = method
            .invoke(None, args)
            .map_err(|err| BridgeError::invocation(target.clone(), err))?;
        tracing::trace!(class = %class.name(), signature = %method.signature(), "constructed host instance");

        match created {
            HostValue::Object(object) if object.class_name() == class.name() => {
                Ok(self.wrap(ProxyTarget::Instance {
                    object,
                    class: class.clone(),
                }))
            }
            HostValue::Object(object) => self.wrap_object(object),
            HostValue::Null => Err(BridgeError::NullProxy { context: target }),
            other => Err(BridgeError::coercion(class.name(), other.host_type())),
        }
    }

    /// The canonical string form of the proxied value.
    pub fn describe(&self, handle: ProxyHandle) -> Result<String> {
        Ok(canonical_string(self.handles.get(handle)?))
    }

    /// Proxies never support native iteration; translated sequences do.
    pub fn check_iterable(&self, handle: ProxyHandle) -> Result<()> {
        let proxy = self.handles.get(handle)?;
        Err(BridgeError::NotIterable {
            class: proxy.type_label(),
        })
    }

    fn call_array(&mut self, proxy: &ObjectProxy, name: &str, args: &[ScriptValue]) -> Result<ScriptValue> {
        let ProxyTarget::Array(array) = proxy.target() else {
            return Err(no_such_member(proxy, name));
        };
        let target = format!("{}.{name}", proxy.type_label());

        match (name, args) {
            ("size", []) => Ok(ScriptValue::Integer(array.len() as i64)),
            ("get", [index]) => {
                let index = self
                    .to_host(index, &HostType::Int)?
                    .as_i64()
                    .unwrap_or_default();
                let item = usize::try_from(index)
                    .ok()
                    .and_then(|i| array.items.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        BridgeError::invocation(
                            target.clone(),
                            HostError::IllegalArgument(format!(
                                "index {index} out of bounds for length {}",
                                array.len()
                            )),
                        )
                    })?;
                self.to_script(item)
            }
            ("size", _) | ("get", _) => Err(BridgeError::NoApplicableOverload {
                target,
                arguments: args
                    .iter()
                    .map(ScriptValue::type_name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
            _ => Err(no_such_member(proxy, name)),
        }
    }
}

fn visible_methods<'c>(
    proxy: &ObjectProxy,
    class: &'c ClassHandle,
    name: &str,
) -> Result<Vec<&'c MethodDescriptor>> {
    let statics_only = proxy.is_class();
    let candidates: Vec<_> = class
        .dispatch()
        .methods(name)
        .iter()
        .filter(|m| !statics_only || m.is_static())
        .collect();
    if candidates.is_empty() {
        return Err(no_such_member(proxy, name));
    }
    Ok(candidates)
}

fn invoke(
    proxy: &ObjectProxy,
    class: &ClassHandle,
    method: &MethodDescriptor,
    args: Vec<HostValue>,
) -> Result<HostValue> {
    let receiver = if method.is_static() { None } else { proxy.receiver() };
    tracing::trace!(method = %method.signature(), class = %class.name(), "host call");
    method
        .invoke(receiver, args)
        .map_err(|err| BridgeError::invocation(member_path(class, method.name()), err))
}

fn member_path(class: &ClassHandle, member: &str) -> String {
    format!("{}.{member}", class.name())
}

fn no_such_member(proxy: &ObjectProxy, member: &str) -> BridgeError {
    BridgeError::NoSuchMember {
        class: proxy.type_label(),
        member: member.to_string(),
    }
}

fn read_only(proxy: &ObjectProxy, member: &str) -> BridgeError {
    BridgeError::ReadOnlyMember {
        class: proxy.type_label(),
        member: member.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::demo_environment;

    fn interaction(env: &mut ScriptEnvironment, args: &[&str]) -> ProxyHandle {
        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        let args: Vec<ScriptValue> = args.iter().map(|s| ScriptValue::from(*s)).collect();
        env.construct(class, &args).unwrap().as_proxy().unwrap()
    }

    #[test]
    fn same_instance_keeps_its_handle() {
        let mut env = demo_environment();
        let class = env.resolve_class(ferry_host::ROOT_CLASS).unwrap();
        let object = ferry_host::HostObject::new(ferry_host::ROOT_CLASS, ());

        let mut table = HandleTable::default();
        let a = table.insert(ProxyTarget::Instance {
            object: object.clone(),
            class: class.clone(),
        });
        let b = table.insert(ProxyTarget::Instance { object, class });
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn cleared_handles_are_stale() {
        let mut env = demo_environment();
        let class = env.resolve_class("demo.Interaction").unwrap();
        let mut table = HandleTable::default();
        let first = table.insert(ProxyTarget::Class(class.clone()));
        table.clear();
        assert!(matches!(table.get(first), Err(BridgeError::StaleHandle { .. })));

        let second = table.insert(ProxyTarget::Class(class));
        assert_ne!(first, second);
        assert_eq!(table.get(second).unwrap().handle(), second);
    }

    #[test]
    fn released_handles_are_stale_and_never_reused() {
        let mut env = demo_environment();
        let class = env.resolve_class("demo.Interaction").unwrap();
        let mut table = HandleTable::default();
        let first = table.insert(ProxyTarget::Class(class.clone()));

        assert!(table.release(first));
        assert!(!table.release(first));
        assert!(table.is_empty());
        assert!(matches!(table.get(first), Err(BridgeError::StaleHandle { .. })));

        // The same target comes back under a new number
        let second = table.insert(ProxyTarget::Class(class));
        assert_ne!(first, second);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn proxies_live_until_their_last_holder_lets_go() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &["a"]);
        env.retain(instance).unwrap();
        env.retain(instance).unwrap();

        assert!(!env.release(instance));
        assert!(env.describe(instance).is_ok());
        assert!(env.release(instance));
        assert_eq!(env.describe(instance).unwrap_err().kind(), ErrorKind::StaleHandle);
        assert_eq!(env.retain(instance).unwrap_err().kind(), ErrorKind::StaleHandle);
    }

    #[test]
    fn released_results_keep_the_table_bounded() {
        let mut env = demo_environment();
        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        let instance = interaction(&mut env, &["a"]);
        let live = env.handles().len();

        for _ in 0..1_000 {
            let list = env.call(instance, "getMessageList", &[]).unwrap().as_proxy().unwrap();
            let other = env.construct(class, &[ScriptValue::from("b")]).unwrap().as_proxy().unwrap();
            assert!(env.release(list));
            assert!(env.release(other));
        }
        assert_eq!(env.handles().len(), live);
        assert!(env.describe(instance).is_ok());
    }

    #[test]
    fn class_proxies_expose_statics_only() {
        let mut env = demo_environment();
        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();

        assert_eq!(env.get(class, "LIMIT").unwrap(), ScriptValue::Integer(3));
        assert!(env.has(class, "create").unwrap());
        assert!(!env.has(class, "getMessageList").unwrap());
        let err = env.call(class, "getMessageList", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchMember);

        let created = env.call(class, "create", &[]).unwrap();
        assert!(created.as_proxy().is_some());
    }

    #[test]
    fn instances_see_statics_and_members() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &["a"]);
        assert!(env.has(instance, "LIMIT").unwrap());
        assert!(env.has(instance, "getMessageList").unwrap());
        assert_eq!(env.member_kind(instance, "greeting").unwrap(), MemberKind::Field);
        assert_eq!(env.member_kind(instance, "nope").unwrap(), MemberKind::None);
    }

    #[test]
    fn property_read_falls_back_to_zero_argument_methods() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &["x", "y"]);
        let list = env.get(instance, "getMessageList").unwrap().as_proxy().unwrap();
        assert_eq!(env.call(list, "size", &[]).unwrap(), ScriptValue::Integer(2));

        let err = env.get(instance, "missing").unwrap_err();
        assert!(matches!(err, BridgeError::NoSuchMember { .. }));
    }

    #[test]
    fn fields_are_written_with_coercion() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &[]);
        env.set(instance, "greeting", &ScriptValue::from("hi")).unwrap();
        assert_eq!(env.get(instance, "greeting").unwrap(), ScriptValue::from("hi"));

        // Numbers reach a String field through string conversion
        env.set(instance, "greeting", &ScriptValue::Integer(5)).unwrap();
        assert_eq!(env.get(instance, "greeting").unwrap(), ScriptValue::from("5"));
    }

    #[test]
    fn finals_and_methods_reject_writes() {
        let mut env = demo_environment();
        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        let err = env.set(class, "LIMIT", &ScriptValue::Integer(9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyMember);

        let instance = interaction(&mut env, &[]);
        let err = env.set(instance, "nothing", &ScriptValue::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyMember);
        let err = env.set(instance, "unknown", &ScriptValue::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchMember);
    }

    #[test]
    fn calls_pick_the_best_overload() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &[]);

        assert_eq!(
            env.call(instance, "pick", &[ScriptValue::Integer(1)]).unwrap(),
            ScriptValue::from("pick(int)")
        );
        assert_eq!(
            env.call(
                instance,
                "pick",
                &[ScriptValue::Integer(1), ScriptValue::Integer(2), ScriptValue::Integer(3)]
            )
            .unwrap(),
            ScriptValue::from("pick(int, int...) with 2 extra")
        );
        assert_eq!(
            env.call(instance, "scale", &[ScriptValue::Integer(2)]).unwrap(),
            ScriptValue::from("scale(long)")
        );

        let err = env
            .call(instance, "pair", &[ScriptValue::Integer(1), ScriptValue::Integer(1)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousOverload);

        let resolved = env
            .call_with_signature(
                instance,
                "pair",
                &[HostType::Double, HostType::Int],
                &[ScriptValue::Integer(1), ScriptValue::Integer(1)],
            )
            .unwrap();
        assert_eq!(resolved, ScriptValue::from("pair(double, int)"));
    }

    #[test]
    fn void_methods_return_null() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &[]);
        assert_eq!(env.call(instance, "nothing", &[]).unwrap(), ScriptValue::Null);
    }

    #[test]
    fn host_failures_surface_as_errors() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &[]);
        let err = env.call(instance, "fail", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostInvocation);
        assert!(err.to_string().contains("demo.Interaction.fail"));

        // The class stays cached and usable
        assert!(env.reflector().is_cached("demo.Interaction"));
        assert_eq!(env.call(instance, "nothing", &[]).unwrap(), ScriptValue::Null);
    }

    #[test]
    fn construction_rules() {
        let mut env = demo_environment();
        let broken = env.import_class("demo.Broken").unwrap().as_proxy().unwrap();
        let before = env.handles().len();
        let err = env.construct(broken, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullProxy);
        assert_eq!(env.handles().len(), before);

        let instance = interaction(&mut env, &["a"]);
        let err = env.construct(instance, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConstructible);

        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        let err = env
            .construct(class, &[ScriptValue::from(vec![1]), ScriptValue::from(vec![2])])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
    }

    #[test]
    fn describe_uses_to_string() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &["a", "b"]);
        assert_eq!(env.describe(instance).unwrap(), "Interaction[a, b]");

        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        assert_eq!(env.describe(class).unwrap(), "class demo.Interaction");
    }

    #[test]
    fn proxies_are_not_iterable() {
        let mut env = demo_environment();
        let instance = interaction(&mut env, &["a"]);
        let list = env.call(instance, "getMessageList", &[]).unwrap().as_proxy().unwrap();
        let err = env.check_iterable(list).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotIterable);
        assert!(err.to_string().contains("size() and get(index)"));
    }

    #[test]
    fn opaque_arrays_offer_indexed_access() {
        let mut env = demo_environment();
        env.collections_mut()
            .register(crate::collection::TypeKey::Array, crate::collection::PolicyKind::ProxyAccess);
        let instance = interaction(&mut env, &["a", "b"]);
        let array = env.call(instance, "getMessageArray", &[]).unwrap().as_proxy().unwrap();

        assert_eq!(env.get(array, "length").unwrap(), ScriptValue::Integer(2));
        assert_eq!(env.call(array, "size", &[]).unwrap(), ScriptValue::Integer(2));
        assert_eq!(
            env.call(array, "get", &[ScriptValue::Integer(1)]).unwrap(),
            ScriptValue::from("b")
        );
        let err = env.call(array, "get", &[ScriptValue::Integer(2)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostInvocation);
        let err = env.set(array, "length", &ScriptValue::Integer(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyMember);
    }
}
