//! Class definitions
//!
//! A [`HostClass`] is the reflective description of one host type: its
//! constructors, methods and fields. Each member carries the closure that
//! actually performs the operation, so a class is all the bridge needs to
//! instantiate objects and dispatch calls on them.

use crate::error::{HostError, HostResult};
use crate::object::{HostObject, HostRef};
use crate::types::{HostType, HostValue};
use crate::ROOT_CLASS;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Callable body of a constructor or method. Receives the receiver (absent
/// for constructors and static methods) and already-coerced arguments.
pub type Invoker = Arc<dyn Fn(Option<&HostRef>, Vec<HostValue>) -> HostResult<HostValue> + Send + Sync>;

pub type FieldGetter = Arc<dyn Fn(Option<&HostRef>) -> HostResult<HostValue> + Send + Sync>;

pub type FieldSetter = Arc<dyn Fn(Option<&HostRef>, HostValue) -> HostResult<()> + Send + Sync>;

/// Wraps a closure as an [`Invoker`].
pub fn invoker<F>(body: F) -> Invoker
where
    F: Fn(Option<&HostRef>, Vec<HostValue>) -> HostResult<HostValue> + Send + Sync + 'static,
{
    Arc::new(body)
}

pub fn getter<F>(body: F) -> FieldGetter
where
    F: Fn(Option<&HostRef>) -> HostResult<HostValue> + Send + Sync + 'static,
{
    Arc::new(body)
}

pub fn setter<F>(body: F) -> FieldSetter
where
    F: Fn(Option<&HostRef>, HostValue) -> HostResult<()> + Send + Sync + 'static,
{
    Arc::new(body)
}

/// A constructor or method, one entry per overload.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    declaring_class: String,
    params: Vec<HostType>,
    return_type: HostType,
    varargs: bool,
    is_static: bool,
    invoker: Invoker,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        params: Vec<HostType>,
        return_type: HostType,
        invoker: Invoker,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_class: String::new(),
            params,
            return_type,
            varargs: false,
            is_static: false,
            invoker,
        }
    }

    /// Marks the final parameter as variable-arity. It must be an array type.
    pub fn with_varargs(mut self) -> Self {
        debug_assert!(
            matches!(self.params.last(), Some(HostType::Array(_))),
            "varargs parameter of '{}' must be an array",
            self.name
        );
        self.varargs = true;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    pub fn params(&self) -> &[HostType] {
        &self.params
    }

    pub fn return_type(&self) -> &HostType {
        &self.return_type
    }

    pub fn is_varargs(&self) -> bool {
        self.varargs
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Number of parameters that precede the variable-arity one.
    pub fn fixed_arity(&self) -> usize {
        if self.varargs {
            self.params.len() - 1
        } else {
            self.params.len()
        }
    }

    /// Element type of the variable-arity parameter.
    pub fn varargs_element(&self) -> Option<&HostType> {
        if self.varargs {
            self.params.last().and_then(HostType::element)
        } else {
            None
        }
    }

    pub fn invoke(&self, receiver: Option<&HostRef>, args: Vec<HostValue>) -> HostResult<HostValue> {
        (self.invoker)(receiver, args)
    }

    /// Human readable signature, e.g. `add(int, int...)`.
    pub fn signature(&self) -> String {
        let mut out = format!("{}(", self.name);
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            if self.varargs && index + 1 == self.params.len() {
                match param.element() {
                    Some(element) => out.push_str(&format!("{element}...")),
                    None => out.push_str(&param.to_string()),
                }
            } else {
                out.push_str(&param.to_string());
            }
        }
        out.push(')');
        out
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("signature", &self.signature())
            .field("declaring_class", &self.declaring_class)
            .field("static", &self.is_static)
            .finish()
    }
}

/// A readable (and possibly writable) field.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    ty: HostType,
    is_static: bool,
    getter: FieldGetter,
    setter: Option<FieldSetter>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: HostType, getter: FieldGetter) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
            getter,
            setter: None,
        }
    }

    pub fn with_setter(mut self, setter: FieldSetter) -> Self {
        self.setter = Some(setter);
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_final(&self) -> bool {
        self.setter.is_none()
    }

    pub fn get(&self, receiver: Option<&HostRef>) -> HostResult<HostValue> {
        (self.getter)(receiver)
    }

    pub fn set(&self, receiver: Option<&HostRef>, value: HostValue) -> HostResult<()> {
        match &self.setter {
            Some(setter) => setter(receiver, value),
            None => Err(HostError::FinalField {
                name: self.name.clone(),
            }),
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("static", &self.is_static)
            .field("final", &self.is_final())
            .finish()
    }
}

/// Reflective description of a host class.
#[derive(Debug, Clone)]
pub struct HostClass {
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    constructors: Vec<MethodDescriptor>,
    methods: Vec<MethodDescriptor>,
    fields: Vec<FieldDescriptor>,
}

impl HostClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn constructors(&self) -> &[MethodDescriptor] {
        &self.constructors
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

fn require_receiver<'a>(member: &str, receiver: Option<&'a HostRef>) -> HostResult<&'a HostRef> {
    receiver.ok_or_else(|| HostError::MissingReceiver {
        member: member.to_string(),
    })
}

fn downcast_receiver<'a, T: Any>(
    class: &str,
    member: &str,
    receiver: Option<&'a HostRef>,
) -> HostResult<&'a T> {
    let receiver = require_receiver(member, receiver)?;
    receiver
        .downcast_ref::<T>()
        .ok_or_else(|| HostError::WrongReceiver {
            expected: class.to_string(),
            actual: receiver.class_name().to_string(),
        })
}

/// Fluent builder for [`HostClass`].
///
/// ```ignore
/// let class = ClassBuilder::new("demo.Greeter")
///     .constructor_with(vec![HostType::String], |args| Ok(Greeter::new(args)))
///     .method_on::<Greeter, _>("greet", vec![], HostType::String, |g, _| Ok(g.greet().into()))
///     .build();
/// ```
pub struct ClassBuilder {
    class: HostClass,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let superclass = (name != ROOT_CLASS).then(|| ROOT_CLASS.to_string());
        Self {
            class: HostClass {
                name,
                superclass,
                interfaces: Vec::new(),
                constructors: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
            },
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.class.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.class.interfaces.push(interface.into());
        self
    }

    pub fn add_constructor(mut self, mut descriptor: MethodDescriptor) -> Self {
        descriptor.declaring_class = self.class.name.clone();
        descriptor.return_type = HostType::Object(self.class.name.clone());
        self.class.constructors.push(descriptor);
        self
    }

    pub fn add_method(mut self, mut descriptor: MethodDescriptor) -> Self {
        descriptor.declaring_class = self.class.name.clone();
        self.class.methods.push(descriptor);
        self
    }

    pub fn add_field(mut self, field: FieldDescriptor) -> Self {
        self.class.fields.push(field);
        self
    }

    /// Constructor whose body returns the finished host value.
    pub fn constructor<F>(self, params: Vec<HostType>, body: F) -> Self
    where
        F: Fn(Vec<HostValue>) -> HostResult<HostValue> + Send + Sync + 'static,
    {
        let name = self.class.name.clone();
        self.add_constructor(MethodDescriptor::new(
            "<init>",
            params,
            HostType::Object(name),
            invoker(move |_, args| body(args)),
        ))
    }

    /// Constructor producing a payload that is wrapped into an instance of this class.
    pub fn constructor_with<T, F>(self, params: Vec<HostType>, body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Vec<HostValue>) -> HostResult<T> + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        self.constructor(params, move |args| {
            Ok(HostValue::Object(HostObject::new(class.clone(), body(args)?)))
        })
    }

    /// Like [`constructor_with`](Self::constructor_with), with a variable-arity last parameter.
    pub fn varargs_constructor_with<T, F>(self, params: Vec<HostType>, body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Vec<HostValue>) -> HostResult<T> + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        self.add_constructor(
            MethodDescriptor::new(
                "<init>",
                params,
                HostType::Object(class.clone()),
                invoker(move |_, args| {
                    Ok(HostValue::Object(HostObject::new(class.clone(), body(args)?)))
                }),
            )
            .with_varargs(),
        )
    }

    /// Instance method receiving the raw receiver.
    pub fn method<F>(self, name: &str, params: Vec<HostType>, ret: HostType, body: F) -> Self
    where
        F: Fn(&HostRef, Vec<HostValue>) -> HostResult<HostValue> + Send + Sync + 'static,
    {
        let member = name.to_string();
        self.add_method(MethodDescriptor::new(
            name,
            params,
            ret,
            invoker(move |receiver, args| body(require_receiver(&member, receiver)?, args)),
        ))
    }

    /// Instance method receiving the receiver's payload.
    pub fn method_on<T, F>(self, name: &str, params: Vec<HostType>, ret: HostType, body: F) -> Self
    where
        T: Any,
        F: Fn(&T, Vec<HostValue>) -> HostResult<HostValue> + Send + Sync + 'static,
    {
        let descriptor = Self::payload_method::<T, F>(&self.class.name, name, params, ret, body);
        self.add_method(descriptor)
    }

    /// Instance method on the payload whose last parameter is variable-arity.
    pub fn varargs_method_on<T, F>(self, name: &str, params: Vec<HostType>, ret: HostType, body: F) -> Self
    where
        T: Any,
        F: Fn(&T, Vec<HostValue>) -> HostResult<HostValue> + Send + Sync + 'static,
    {
        let descriptor = Self::payload_method::<T, F>(&self.class.name, name, params, ret, body);
        self.add_method(descriptor.with_varargs())
    }

    pub fn static_method<F>(self, name: &str, params: Vec<HostType>, ret: HostType, body: F) -> Self
    where
        F: Fn(Vec<HostValue>) -> HostResult<HostValue> + Send + Sync + 'static,
    {
        self.add_method(
            MethodDescriptor::new(name, params, ret, invoker(move |_, args| body(args))).with_static(),
        )
    }

    /// Read-only field computed from the receiver's payload.
    pub fn field_on<T, F>(self, name: &str, ty: HostType, read: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> HostResult<HostValue> + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        let member = name.to_string();
        self.add_field(FieldDescriptor::new(
            name,
            ty,
            getter(move |receiver| read(downcast_receiver::<T>(&class, &member, receiver)?)),
        ))
    }

    /// Read-write field on the receiver's payload.
    pub fn mutable_field_on<T, G, S>(self, name: &str, ty: HostType, read: G, write: S) -> Self
    where
        T: Any,
        G: Fn(&T) -> HostResult<HostValue> + Send + Sync + 'static,
        S: Fn(&T, HostValue) -> HostResult<()> + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        let member = name.to_string();
        let get_class = class.clone();
        let get_member = member.clone();
        self.add_field(
            FieldDescriptor::new(
                name,
                ty,
                getter(move |receiver| {
                    read(downcast_receiver::<T>(&get_class, &get_member, receiver)?)
                }),
            )
            .with_setter(setter(move |receiver, value| {
                write(downcast_receiver::<T>(&class, &member, receiver)?, value)
            })),
        )
    }

    /// Constant static field.
    pub fn static_constant(self, name: &str, ty: HostType, value: HostValue) -> Self {
        self.add_field(
            FieldDescriptor::new(name, ty, getter(move |_| Ok(value.clone()))).with_static(),
        )
    }

    pub fn build(self) -> HostClass {
        self.class
    }

    fn payload_method<T, F>(
        class: &str,
        name: &str,
        params: Vec<HostType>,
        ret: HostType,
        body: F,
    ) -> MethodDescriptor
    where
        T: Any,
        F: Fn(&T, Vec<HostValue>) -> HostResult<HostValue> + Send + Sync + 'static,
    {
        let class = class.to_string();
        let member = name.to_string();
        MethodDescriptor::new(
            name,
            params,
            ret,
            invoker(move |receiver, args| {
                body(downcast_receiver::<T>(&class, &member, receiver)?, args)
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Counter {
        value: Mutex<i32>,
    }

    fn counter_class() -> HostClass {
        ClassBuilder::new("test.Counter")
            .constructor_with(vec![HostType::Int], |args| {
                Ok(Counter {
                    value: Mutex::new(args[0].as_i32().unwrap_or_default()),
                })
            })
            .method_on::<Counter, _>("increment", vec![], HostType::Int, |counter, _| {
                let mut value = counter.value.lock().unwrap();
                *value += 1;
                Ok(HostValue::Int(*value))
            })
            .varargs_method_on::<Counter, _>(
                "addAll",
                vec![HostType::array_of(HostType::Int)],
                HostType::Int,
                |counter, args| {
                    let mut value = counter.value.lock().unwrap();
                    for item in &args[0].as_array().unwrap().items {
                        *value += item.as_i32().unwrap();
                    }
                    Ok(HostValue::Int(*value))
                },
            )
            .static_constant("LIMIT", HostType::Int, HostValue::Int(10))
            .build()
    }

    #[test]
    fn builder_records_members() {
        let class = counter_class();
        assert_eq!(class.name(), "test.Counter");
        assert_eq!(class.superclass(), Some(ROOT_CLASS));
        assert_eq!(class.constructors().len(), 1);
        assert_eq!(class.methods().len(), 2);
        assert_eq!(class.fields().len(), 1);
        assert!(class.fields()[0].is_static());
        assert!(class.fields()[0].is_final());
        assert_eq!(class.methods()[0].declaring_class(), "test.Counter");
    }

    #[test]
    fn root_class_has_no_superclass() {
        let root = ClassBuilder::new(ROOT_CLASS).build();
        assert_eq!(root.superclass(), None);
    }

    #[test]
    fn signatures_render_varargs() {
        let class = counter_class();
        let add_all = &class.methods()[1];
        assert!(add_all.is_varargs());
        assert_eq!(add_all.fixed_arity(), 0);
        assert_eq!(add_all.varargs_element(), Some(&HostType::Int));
        assert_eq!(add_all.signature(), "addAll(int...)");
    }

    #[test]
    fn invokes_through_payload() {
        let class = counter_class();
        let instance = class.constructors()[0]
            .invoke(None, vec![HostValue::Int(4)])
            .unwrap();
        let receiver = instance.as_object().unwrap().clone();
        let result = class.methods()[0].invoke(Some(&receiver), vec![]).unwrap();
        assert_eq!(result, HostValue::Int(5));
    }

    #[test]
    fn rejects_missing_receiver() {
        let class = counter_class();
        let err = class.methods()[0].invoke(None, vec![]).unwrap_err();
        assert!(matches!(err, HostError::WrongReceiver { .. } | HostError::MissingReceiver { .. }));
    }

    #[test]
    fn final_fields_reject_writes() {
        let class = counter_class();
        let err = class.fields()[0].set(None, HostValue::Int(1)).unwrap_err();
        assert!(matches!(err, HostError::FinalField { .. }));
    }
}
