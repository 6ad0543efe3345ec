//! Ferry Bridge
//!
//! Lets a script reach into a statically-typed host runtime: import classes by
//! name, construct them, call their methods and read their fields, with
//! values marshaled in both directions.
//!
//! ## Architecture
//!
//! - **Reflection:** [`Reflector`] resolves classes through the host's
//!   [`HostRuntime`](ferry_host::HostRuntime), gated by an [`AccessPolicy`]
//! - **Marshaling:** [`ScriptValue`] on the script side, cost-ranked coercion
//!   to host types, overload selection in [`overload`]
//! - **Proxies:** host objects and classes are held in a per-environment
//!   [`HandleTable`] and reached only through [`ProxyHandle`]s
//! - **Collections:** [`CollectionPolicy`] picks opaque proxy vs native sequence
//! - **Bootstrap:** [`ScriptEnvironment::bootstrap`] installs the root binding
//!   before any script code runs
//!
//! Everything is scoped to one [`ScriptEnvironment`]; nothing is process-wide.

pub mod access;
pub mod bootstrap;
pub mod collection;
pub mod config;
pub mod environment;
pub mod error;
pub mod marshal;
pub mod overload;
pub mod proxy;
pub mod reflect;
pub mod value;

pub use access::AccessPolicy;
pub use bootstrap::{Binding, BootstrapOutcome, Capabilities, LoadContext, LoadListener};
pub use collection::{CollectionPolicy, PolicyKind, TypeKey};
pub use config::{AccessConfig, BridgeConfig};
pub use environment::{Lifecycle, ScriptEnvironment};
pub use error::{BridgeError, ErrorKind, Result};
pub use proxy::{HandleTable, ObjectProxy, ProxyTarget};
pub use reflect::{ClassHandle, MemberKind, Reflector, ResolvedClass};
pub use value::{ProxyHandle, ScriptValue};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::access::AccessPolicy;
    use crate::collection::CollectionPolicy;
    use crate::environment::ScriptEnvironment;
    use ferry_host::{
        ClassBuilder, ClassRegistry, HostError, HostObject, HostRef, HostType, HostValue, ROOT_CLASS,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    pub struct MessageList {
        items: Mutex<Vec<HostValue>>,
    }

    pub struct Interaction {
        messages: Vec<String>,
        greeting: Mutex<String>,
    }

    pub fn message_list(items: &[&str]) -> HostRef {
        HostObject::new(
            "demo.MessageList",
            MessageList {
                items: Mutex::new(items.iter().map(|s| HostValue::string(*s)).collect()),
            },
        )
    }

    fn strings(value: &HostValue) -> Vec<String> {
        value
            .as_array()
            .map(|array| array.items.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    fn new_interaction(messages: Vec<String>) -> Interaction {
        Interaction {
            messages,
            greeting: Mutex::new("hello".to_string()),
        }
    }

    fn tag(
        text: &str,
    ) -> impl Fn(&Interaction, Vec<HostValue>) -> Result<HostValue, HostError> + Send + Sync + 'static {
        let text = text.to_string();
        move |_, _| Ok(HostValue::string(text.clone()))
    }

    /// Classes the bridge tests run against.
    pub fn demo_registry() -> Arc<ClassRegistry> {
        let registry = ClassRegistry::new();
        let classes = [
            ClassBuilder::new(ROOT_CLASS)
                .method("toString", vec![], HostType::String, |this, _| {
                    Ok(HostValue::string(this.to_string()))
                })
                .build(),
            ClassBuilder::new("demo.AbstractList")
                .implements("demo.List")
                .build(),
            ClassBuilder::new("demo.MessageList")
                .extends("demo.AbstractList")
                .varargs_constructor_with(vec![HostType::array_of(HostType::Any)], |args| {
                    let items = args[0].as_array().map(|a| a.items.clone()).unwrap_or_default();
                    Ok(MessageList {
                        items: Mutex::new(items),
                    })
                })
                .method_on::<MessageList, _>("size", vec![], HostType::Int, |list, _| {
                    Ok(HostValue::Int(list.items.lock().len() as i32))
                })
                .method_on::<MessageList, _>("get", vec![HostType::Int], HostType::Any, |list, args| {
                    let index = args[0].as_i64().unwrap_or(-1);
                    usize::try_from(index)
                        .ok()
                        .and_then(|i| list.items.lock().get(i).cloned())
                        .ok_or_else(|| HostError::IllegalArgument(format!("index {index}")))
                })
                .method_on::<MessageList, _>("add", vec![HostType::Any], HostType::Boolean, |list, args| {
                    list.items.lock().extend(args);
                    Ok(HostValue::Boolean(true))
                })
                .build(),
            ClassBuilder::new("demo.Interaction")
                .varargs_constructor_with(vec![HostType::array_of(HostType::String)], |args| {
                    Ok(new_interaction(strings(&args[0])))
                })
                .static_constant("LIMIT", HostType::Int, HostValue::Int(3))
                .static_method("create", vec![], HostType::object("demo.Interaction"), |_| {
                    Ok(HostValue::Object(HostObject::new(
                        "demo.Interaction",
                        new_interaction(Vec::new()),
                    )))
                })
                .mutable_field_on::<Interaction, _, _>(
                    "greeting",
                    HostType::String,
                    |this| Ok(HostValue::string(this.greeting.lock().clone())),
                    |this, value| {
                        *this.greeting.lock() = value.as_str().unwrap_or_default().to_string();
                        Ok(())
                    },
                )
                .method_on::<Interaction, _>(
                    "getMessageList",
                    vec![],
                    HostType::object("demo.MessageList"),
                    |this, _| {
                        let items: Vec<&str> = this.messages.iter().map(String::as_str).collect();
                        Ok(HostValue::Object(message_list(&items)))
                    },
                )
                .method_on::<Interaction, _>(
                    "getMessageArray",
                    vec![],
                    HostType::array_of(HostType::String),
                    |this, _| {
                        let items = this.messages.iter().map(|m| HostValue::string(m.clone())).collect();
                        Ok(HostValue::array(HostType::String, items))
                    },
                )
                .method_on::<Interaction, _>("pick", vec![HostType::Int], HostType::String, tag("pick(int)"))
                .varargs_method_on::<Interaction, _>(
                    "pick",
                    vec![HostType::Int, HostType::array_of(HostType::Int)],
                    HostType::String,
                    |_, args| {
                        let extra = args[1].as_array().map_or(0, |a| a.len());
                        Ok(HostValue::string(format!("pick(int, int...) with {extra} extra")))
                    },
                )
                .method_on::<Interaction, _>(
                    "pair",
                    vec![HostType::Int, HostType::Double],
                    HostType::String,
                    tag("pair(int, double)"),
                )
                .method_on::<Interaction, _>(
                    "pair",
                    vec![HostType::Double, HostType::Int],
                    HostType::String,
                    tag("pair(double, int)"),
                )
                .method_on::<Interaction, _>("scale", vec![HostType::Long], HostType::String, tag("scale(long)"))
                .method_on::<Interaction, _>(
                    "scale",
                    vec![HostType::Double],
                    HostType::String,
                    tag("scale(double)"),
                )
                .method_on::<Interaction, _>("echo", vec![HostType::Any], HostType::Any, |_, mut args| {
                    Ok(args.remove(0))
                })
                .varargs_method_on::<Interaction, _>(
                    "join",
                    vec![HostType::array_of(HostType::String)],
                    HostType::String,
                    |_, args| Ok(HostValue::string(strings(&args[0]).join(","))),
                )
                .method_on::<Interaction, _>("nothing", vec![], HostType::Void, |_, _| Ok(HostValue::Null))
                .method_on::<Interaction, _>("fail", vec![], HostType::Void, |_, _| {
                    Err(HostError::IllegalState("interaction failed on purpose".into()))
                })
                .method_on::<Interaction, _>("toString", vec![], HostType::String, |this, _| {
                    Ok(HostValue::string(format!("Interaction[{}]", this.messages.join(", "))))
                })
                .build(),
            ClassBuilder::new("demo.Broken")
                .constructor(vec![], |_| Ok(HostValue::Null))
                .build(),
            ClassBuilder::new("demo.Secret").build(),
        ];
        for class in classes {
            // Names above are unique
            let _ = registry.register(class);
        }
        Arc::new(registry)
    }

    pub fn demo_environment() -> ScriptEnvironment {
        ScriptEnvironment::with_policies(
            demo_registry(),
            AccessPolicy::allow_all(),
            CollectionPolicy::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::demo_environment;
    use crate::value::ScriptValue;

    #[test]
    fn varargs_construction_end_to_end() {
        let mut env = demo_environment();
        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        let args = [ScriptValue::from("a"), ScriptValue::from("b"), ScriptValue::from("c")];
        let interaction = env.construct(class, &args).unwrap().as_proxy().unwrap();

        let list = env
            .call(interaction, "getMessageList", &[])
            .unwrap()
            .as_proxy()
            .unwrap();
        assert_eq!(env.call(list, "size", &[]).unwrap(), ScriptValue::Integer(3));

        let array = env.call(interaction, "getMessageArray", &[]).unwrap();
        assert_eq!(array, ScriptValue::from(vec!["a", "b", "c"]));
    }

    #[test]
    fn echo_round_trips_proxies() {
        let mut env = demo_environment();
        let class = env.import_class("demo.Interaction").unwrap().as_proxy().unwrap();
        let interaction = env.construct(class, &[]).unwrap();
        let handle = interaction.as_proxy().unwrap();

        // The same host instance comes back under the same handle
        let echoed = env.call(handle, "echo", &[interaction.clone()]).unwrap();
        assert_eq!(echoed, interaction);
        assert_eq!(
            env.call(handle, "join", &[ScriptValue::from("x"), ScriptValue::from("y")])
                .unwrap(),
            ScriptValue::from("x,y")
        );
    }
}
