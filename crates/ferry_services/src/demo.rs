//! `ferry.demo.Interaction`, the class the demo script plays with
//!
//! Shows off the two collection shapes scripts meet: a list that stays a
//! proxy and an array that arrives as a native sequence.

use crate::util::ArrayList;
use ferry_host::{ClassBuilder, HostClass, HostType, HostValue};

pub const INTERACTION: &str = "ferry.demo.Interaction";

#[derive(Debug)]
pub struct Interaction {
    messages: Vec<String>,
}

impl Interaction {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    fn values(&self) -> Vec<HostValue> {
        self.messages.iter().map(|message| HostValue::string(message.clone())).collect()
    }
}

pub fn interaction_class() -> HostClass {
    ClassBuilder::new(INTERACTION)
        .varargs_constructor_with(vec![HostType::array_of(HostType::String)], |args| {
            let messages = args[0]
                .as_array()
                .map(|array| array.items.iter().map(ToString::to_string).collect())
                .unwrap_or_default();
            Ok(Interaction::new(messages))
        })
        .method_on::<Interaction, _>(
            "getMessageList",
            vec![],
            HostType::object(crate::util::ARRAY_LIST),
            |this, _| Ok(HostValue::Object(ArrayList::instance(this.values()))),
        )
        .method_on::<Interaction, _>(
            "getMessageArray",
            vec![],
            HostType::array_of(HostType::String),
            |this, _| Ok(HostValue::array(HostType::String, this.values())),
        )
        .method_on::<Interaction, _>("getMessageCount", vec![], HostType::Int, |this, _| {
            Ok(HostValue::Int(i32::try_from(this.messages.len()).unwrap_or(i32::MAX)))
        })
        .method_on::<Interaction, _>("toString", vec![], HostType::String, |this, _| {
            Ok(HostValue::string(format!("Interaction{:?}", this.messages)))
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::environment;
    use crate::util::LIST;
    use ferry_bridge::{ErrorKind, PolicyKind, ScriptValue, TypeKey};

    fn messages() -> Vec<ScriptValue> {
        ["Hello, World!", "How are you doing?", "I hope you are fine."]
            .into_iter()
            .map(ScriptValue::from)
            .collect()
    }

    #[test]
    fn list_stays_a_proxy_and_array_translates() {
        let mut env = environment();
        let class = env.import_class(INTERACTION).unwrap().as_proxy().unwrap();
        let interaction = env.construct(class, &messages()).unwrap().as_proxy().unwrap();

        let list = env.call(interaction, "getMessageList", &[]).unwrap().as_proxy().unwrap();
        assert_eq!(env.call(list, "size", &[]).unwrap(), ScriptValue::Integer(3));
        assert_eq!(
            env.call(list, "get", &[ScriptValue::Integer(2)]).unwrap(),
            ScriptValue::from("I hope you are fine.")
        );
        assert_eq!(env.check_iterable(list).unwrap_err().kind(), ErrorKind::NotIterable);

        let array = env.call(interaction, "getMessageArray", &[]).unwrap();
        assert_eq!(array, ScriptValue::Sequence(messages()));
    }

    #[test]
    fn lists_translate_when_configured() {
        let mut env = environment();
        env.collections_mut()
            .register(TypeKey::Class(LIST.to_string()), PolicyKind::FullTranslation);

        let class = env.import_class(INTERACTION).unwrap().as_proxy().unwrap();
        let interaction = env.construct(class, &messages()).unwrap().as_proxy().unwrap();
        let list = env.call(interaction, "getMessageList", &[]).unwrap();
        assert_eq!(list, ScriptValue::Sequence(messages()));
    }

    #[test]
    fn no_arguments_means_no_messages() {
        let mut env = environment();
        let class = env.import_class(INTERACTION).unwrap().as_proxy().unwrap();
        let interaction = env.construct(class, &[]).unwrap().as_proxy().unwrap();
        assert_eq!(env.call(interaction, "getMessageCount", &[]).unwrap(), ScriptValue::Integer(0));
    }
}
