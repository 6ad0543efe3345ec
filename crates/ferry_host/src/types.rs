//! Host types and values

use crate::object::HostRef;
use std::fmt;
use std::sync::Arc;

/// Static type of a host parameter, field or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostType {
    Void,
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    /// Instance of the named class (or one of its subclasses).
    Object(String),
    Array(Box<HostType>),
    /// A class itself, as opposed to an instance of it.
    Class,
    /// Accepts anything, boxed.
    Any,
}

impl HostType {
    pub fn object(name: impl Into<String>) -> Self {
        HostType::Object(name.into())
    }

    pub fn array_of(element: HostType) -> Self {
        HostType::Array(Box::new(element))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            HostType::Boolean
                | HostType::Byte
                | HostType::Short
                | HostType::Int
                | HostType::Long
                | HostType::Float
                | HostType::Double
                | HostType::Char
        )
    }

    /// Position on the numeric promotion ladder, `None` for non-numeric types.
    pub fn numeric_rank(&self) -> Option<u32> {
        match self {
            HostType::Byte => Some(0),
            HostType::Short => Some(1),
            HostType::Int => Some(2),
            HostType::Long => Some(3),
            HostType::Float => Some(4),
            HostType::Double => Some(5),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, HostType::Byte | HostType::Short | HostType::Int | HostType::Long)
    }

    /// Element type when this is an array type.
    pub fn element(&self) -> Option<&HostType> {
        match self {
            HostType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Parses a signature string such as `int`, `String`, `ferry.io.File` or `String[]`.
    pub fn parse(signature: &str) -> Option<Self> {
        let signature = signature.trim();
        if signature.is_empty() {
            return None;
        }
        if let Some(inner) = signature.strip_suffix("[]") {
            return HostType::parse(inner).map(HostType::array_of);
        }
        if let Some(inner) = signature.strip_suffix("...") {
            return HostType::parse(inner).map(HostType::array_of);
        }

        let parsed = match signature {
            "void" => HostType::Void,
            "boolean" => HostType::Boolean,
            "byte" => HostType::Byte,
            "short" => HostType::Short,
            "int" => HostType::Int,
            "long" => HostType::Long,
            "float" => HostType::Float,
            "double" => HostType::Double,
            "char" => HostType::Char,
            "String" | "ferry.lang.String" => HostType::String,
            "Class" | "ferry.lang.Class" => HostType::Class,
            "Object" | "ferry.lang.Object" => HostType::Any,
            name => {
                if name.chars().any(|c| c.is_whitespace() || c == '[' || c == ']') {
                    return None;
                }
                HostType::Object(name.to_string())
            }
        };
        Some(parsed)
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Void => f.write_str("void"),
            HostType::Boolean => f.write_str("boolean"),
            HostType::Byte => f.write_str("byte"),
            HostType::Short => f.write_str("short"),
            HostType::Int => f.write_str("int"),
            HostType::Long => f.write_str("long"),
            HostType::Float => f.write_str("float"),
            HostType::Double => f.write_str("double"),
            HostType::Char => f.write_str("char"),
            HostType::String => f.write_str("String"),
            HostType::Object(name) => f.write_str(name),
            HostType::Array(element) => write!(f, "{element}[]"),
            HostType::Class => f.write_str("Class"),
            HostType::Any => f.write_str("Object"),
        }
    }
}

/// Fixed-size host array. Elements are expected to conform to `element`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray {
    pub element: HostType,
    pub items: Vec<HostValue>,
}

impl HostArray {
    pub fn new(element: HostType, items: Vec<HostValue>) -> Self {
        Self { element, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A runtime value owned by the host.
#[derive(Debug, Clone)]
pub enum HostValue {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    Object(HostRef),
    Array(Arc<HostArray>),
    /// A class, by qualified name.
    Class(String),
}

impl HostValue {
    pub fn string(value: impl Into<String>) -> Self {
        HostValue::String(value.into())
    }

    pub fn array(element: HostType, items: Vec<HostValue>) -> Self {
        HostValue::Array(Arc::new(HostArray::new(element, items)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// The most specific static type describing this value.
    pub fn host_type(&self) -> HostType {
        match self {
            HostValue::Null => HostType::Any,
            HostValue::Boolean(_) => HostType::Boolean,
            HostValue::Byte(_) => HostType::Byte,
            HostValue::Short(_) => HostType::Short,
            HostValue::Int(_) => HostType::Int,
            HostValue::Long(_) => HostType::Long,
            HostValue::Float(_) => HostType::Float,
            HostValue::Double(_) => HostType::Double,
            HostValue::Char(_) => HostType::Char,
            HostValue::String(_) => HostType::String,
            HostValue::Object(object) => HostType::Object(object.class_name().to_string()),
            HostValue::Array(array) => HostType::array_of(array.element.clone()),
            HostValue::Class(_) => HostType::Class,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Integral view of any integral primitive.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HostValue::Byte(v) => Some(i64::from(*v)),
            HostValue::Short(v) => Some(i64::from(*v)),
            HostValue::Int(v) => Some(i64::from(*v)),
            HostValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Float(v) => Some(f64::from(*v)),
            HostValue::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostRef> {
        match self {
            HostValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&HostArray> {
        match self {
            HostValue::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Boolean(a), HostValue::Boolean(b)) => a == b,
            (HostValue::Byte(a), HostValue::Byte(b)) => a == b,
            (HostValue::Short(a), HostValue::Short(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Long(a), HostValue::Long(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a == b,
            (HostValue::Double(a), HostValue::Double(b)) => a == b,
            (HostValue::Char(a), HostValue::Char(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            // Identity, not structural equality
            (HostValue::Object(a), HostValue::Object(b)) => Arc::ptr_eq(a, b),
            (HostValue::Array(a), HostValue::Array(b)) => a == b,
            (HostValue::Class(a), HostValue::Class(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("null"),
            HostValue::Boolean(v) => write!(f, "{v}"),
            HostValue::Byte(v) => write!(f, "{v}"),
            HostValue::Short(v) => write!(f, "{v}"),
            HostValue::Int(v) => write!(f, "{v}"),
            HostValue::Long(v) => write!(f, "{v}"),
            HostValue::Float(v) => write!(f, "{v}"),
            HostValue::Double(v) => write!(f, "{v}"),
            HostValue::Char(v) => write!(f, "{v}"),
            HostValue::String(v) => f.write_str(v),
            HostValue::Object(object) => write!(f, "{object}"),
            HostValue::Array(array) => {
                f.write_str("[")?;
                for (index, item) in array.items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            HostValue::Class(name) => write!(f, "class {name}"),
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Boolean(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Long(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Double(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(value)
    }
}

impl From<HostRef> for HostValue {
    fn from(value: HostRef) -> Self {
        HostValue::Object(value)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}
