//! `ferry.util`: a growable list

use ferry_host::{ClassBuilder, HostClass, HostError, HostObject, HostRef, HostResult, HostType, HostValue};
use parking_lot::Mutex;

pub const LIST: &str = "ferry.util.List";
pub const ARRAY_LIST: &str = "ferry.util.ArrayList";

/// Payload of `ferry.util.ArrayList`.
#[derive(Debug, Default)]
pub struct ArrayList {
    items: Mutex<Vec<HostValue>>,
}

impl ArrayList {
    pub fn new(items: Vec<HostValue>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// A new `ferry.util.ArrayList` instance holding `items`.
    pub fn instance(items: Vec<HostValue>) -> HostRef {
        HostObject::new(ARRAY_LIST, Self::new(items))
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<HostValue> {
        self.items.lock().clone()
    }

    fn index(&self, raw: &HostValue, len: usize) -> HostResult<usize> {
        let index = raw.as_i64().unwrap_or(-1);
        usize::try_from(index)
            .ok()
            .filter(|index| *index < len)
            .ok_or_else(|| HostError::IllegalArgument(format!("index {index} out of bounds for length {len}")))
    }
}

pub fn array_list_class() -> HostClass {
    ClassBuilder::new(ARRAY_LIST)
        .implements(LIST)
        .constructor_with(vec![], |_| Ok(ArrayList::default()))
        .varargs_constructor_with(vec![HostType::array_of(HostType::Any)], |args| {
            let items = args[0].as_array().map(|array| array.items.clone()).unwrap_or_default();
            Ok(ArrayList::new(items))
        })
        .method_on::<ArrayList, _>("size", vec![], HostType::Int, |list, _| {
            Ok(HostValue::Int(i32::try_from(list.len()).unwrap_or(i32::MAX)))
        })
        .method_on::<ArrayList, _>("isEmpty", vec![], HostType::Boolean, |list, _| {
            Ok(HostValue::Boolean(list.is_empty()))
        })
        .method_on::<ArrayList, _>("get", vec![HostType::Int], HostType::Any, |list, args| {
            let items = list.items.lock();
            let index = list.index(&args[0], items.len())?;
            Ok(items[index].clone())
        })
        .method_on::<ArrayList, _>("set", vec![HostType::Int, HostType::Any], HostType::Any, |list, mut args| {
            let mut items = list.items.lock();
            let index = list.index(&args[0], items.len())?;
            Ok(std::mem::replace(&mut items[index], args.remove(1)))
        })
        .method_on::<ArrayList, _>("add", vec![HostType::Any], HostType::Boolean, |list, args| {
            list.items.lock().extend(args);
            Ok(HostValue::Boolean(true))
        })
        .method_on::<ArrayList, _>("remove", vec![HostType::Int], HostType::Any, |list, args| {
            let mut items = list.items.lock();
            let index = list.index(&args[0], items.len())?;
            Ok(items.remove(index))
        })
        .method_on::<ArrayList, _>("contains", vec![HostType::Any], HostType::Boolean, |list, args| {
            Ok(HostValue::Boolean(list.items.lock().contains(&args[0])))
        })
        .method_on::<ArrayList, _>("clear", vec![], HostType::Void, |list, _| {
            list.items.lock().clear();
            Ok(HostValue::Null)
        })
        .method_on::<ArrayList, _>("toString", vec![], HostType::String, |list, _| {
            let items = list.snapshot();
            Ok(HostValue::string(HostValue::array(HostType::Any, items).to_string()))
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::environment;
    use ferry_bridge::{ErrorKind, ScriptValue};

    #[test]
    fn list_operations() {
        let mut env = environment();
        let class = env.import_class(ARRAY_LIST).unwrap().as_proxy().unwrap();
        let list = env.construct(class, &[]).unwrap().as_proxy().unwrap();

        assert_eq!(env.call(list, "isEmpty", &[]).unwrap(), ScriptValue::Bool(true));
        env.call(list, "add", &[ScriptValue::from("a")]).unwrap();
        env.call(list, "add", &[ScriptValue::Integer(2)]).unwrap();
        assert_eq!(env.call(list, "size", &[]).unwrap(), ScriptValue::Integer(2));
        assert_eq!(env.call(list, "contains", &[ScriptValue::from("a")]).unwrap(), ScriptValue::Bool(true));

        let previous = env
            .call(list, "set", &[ScriptValue::Integer(0), ScriptValue::from("z")])
            .unwrap();
        assert_eq!(previous, ScriptValue::from("a"));
        assert_eq!(env.describe(list).unwrap(), "[z, 2]");

        let err = env.call(list, "get", &[ScriptValue::Integer(5)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostInvocation);
    }

    #[test]
    fn varargs_construction() {
        let mut env = environment();
        let class = env.import_class(ARRAY_LIST).unwrap().as_proxy().unwrap();
        let args = [ScriptValue::from("x"), ScriptValue::from("y")];
        let list = env.construct(class, &args).unwrap().as_proxy().unwrap();
        assert_eq!(env.call(list, "size", &[]).unwrap(), ScriptValue::Integer(2));
    }
}
