//! Marshaling engine
//!
//! Host → script is total: every [`HostValue`] has a [`ScriptValue`] form.
//! Script → host is checked against an expected [`HostType`] and ranked by
//! cost so overload resolution can prefer the cheapest conversion.
//!
//! Cost ladder, lowest wins:
//!
//! | conversion                                   | cost |
//! |----------------------------------------------|------|
//! | exact match, `null` to a reference type      | 0    |
//! | numeric widening                             | promotion steps (1-5) |
//! | `double` to `float`, 1-char string to `char` | 1    |
//! | proxy to superclass/interface                | inheritance distance |
//! | in-range narrowing of an integral value      | 4    |
//! | anything to `Object`                         | 6    |
//! | string conversion                            | 7    |

use crate::environment::ScriptEnvironment;
use crate::error::{BridgeError, Result};
use crate::proxy::{HandleTable, ObjectProxy, ProxyTarget};
use crate::value::ScriptValue;
use ferry_host::{HostRef, HostType, HostValue};

pub const COST_EXACT: u32 = 0;
pub const COST_PRECISION: u32 = 1;
pub const COST_NARROWING: u32 = 4;
pub const COST_BOXING: u32 = 6;
pub const COST_STRING_CONVERSION: u32 = 7;

/// A script value converted for one parameter, with its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Coercion {
    pub value: HostValue,
    pub cost: u32,
}

impl Coercion {
    fn new(value: HostValue, cost: u32) -> Self {
        Self { value, cost }
    }
}

/// Converts `value` for a parameter of type `expected`.
pub fn to_host(value: &ScriptValue, expected: &HostType, handles: &HandleTable) -> Result<HostValue> {
    coerce(value, expected, handles, true).map(|coercion| coercion.value)
}

/// Cost of converting `value` to `expected`, without performing host calls.
pub fn conversion_cost(value: &ScriptValue, expected: &HostType, handles: &HandleTable) -> Option<u32> {
    coerce(value, expected, handles, false)
        .ok()
        .map(|coercion| coercion.cost)
}

/// With `apply == false` the result value may be a placeholder; only the cost
/// is meaningful and no host code runs.
fn coerce(
    value: &ScriptValue,
    expected: &HostType,
    handles: &HandleTable,
    apply: bool,
) -> Result<Coercion> {
    let mismatch = || BridgeError::coercion(expected, value.type_name());

    match value {
        ScriptValue::Null => {
            if expected.is_primitive() || *expected == HostType::Void {
                Err(mismatch())
            } else {
                Ok(Coercion::new(HostValue::Null, COST_EXACT))
            }
        }
        ScriptValue::Bool(b) => match expected {
            HostType::Boolean => Ok(Coercion::new(HostValue::Boolean(*b), COST_EXACT)),
            HostType::Any => Ok(Coercion::new(HostValue::Boolean(*b), COST_BOXING)),
            HostType::String => Ok(Coercion::new(
                HostValue::String(b.to_string()),
                COST_STRING_CONVERSION,
            )),
            _ => Err(mismatch()),
        },
        ScriptValue::Integer(i) => coerce_integer(*i, expected).ok_or_else(mismatch),
        ScriptValue::Number(n) => coerce_number(*n, expected).ok_or_else(mismatch),
        ScriptValue::String(s) => match expected {
            HostType::String => Ok(Coercion::new(HostValue::String(s.clone()), COST_EXACT)),
            HostType::Char => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Coercion::new(HostValue::Char(c), COST_PRECISION)),
                    _ => Err(mismatch()),
                }
            }
            HostType::Any => Ok(Coercion::new(HostValue::String(s.clone()), COST_BOXING)),
            _ => Err(mismatch()),
        },
        ScriptValue::Proxy(handle) => coerce_proxy(handles.get(*handle)?, expected, apply),
        ScriptValue::Sequence(items) => match expected {
            HostType::Array(element) => {
                let mut cost = COST_EXACT;
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let coercion = coerce(item, element, handles, apply)?;
                    cost = cost.max(coercion.cost);
                    values.push(coercion.value);
                }
                Ok(Coercion::new(
                    HostValue::array(element.as_ref().clone(), values),
                    cost,
                ))
            }
            HostType::Any => {
                let values = items
                    .iter()
                    .map(|item| coerce(item, &HostType::Any, handles, apply).map(|c| c.value))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Coercion::new(HostValue::array(HostType::Any, values), COST_BOXING))
            }
            _ => Err(mismatch()),
        },
    }
}

fn coerce_integer(value: i64, expected: &HostType) -> Option<Coercion> {
    let natural = if i32::try_from(value).is_ok() {
        HostType::Int
    } else {
        HostType::Long
    };
    let natural_rank = natural.numeric_rank()?;

    if let Some(rank) = expected.numeric_rank() {
        let cost = if rank >= natural_rank {
            rank - natural_rank
        } else {
            COST_NARROWING
        };
        let converted = match expected {
            HostType::Byte => HostValue::Byte(i8::try_from(value).ok()?),
            HostType::Short => HostValue::Short(i16::try_from(value).ok()?),
            HostType::Int => HostValue::Int(i32::try_from(value).ok()?),
            HostType::Long => HostValue::Long(value),
            HostType::Float => HostValue::Float(value as f32),
            HostType::Double => HostValue::Double(value as f64),
            _ => return None,
        };
        return Some(Coercion::new(converted, cost));
    }

    match expected {
        HostType::Any => {
            let boxed = match natural {
                HostType::Int => HostValue::Int(value as i32),
                _ => HostValue::Long(value),
            };
            Some(Coercion::new(boxed, COST_BOXING))
        }
        HostType::String => Some(Coercion::new(
            HostValue::String(value.to_string()),
            COST_STRING_CONVERSION,
        )),
        _ => None,
    }
}

fn coerce_number(value: f64, expected: &HostType) -> Option<Coercion> {
    let integral = value.is_finite() && value.fract() == 0.0;
    match expected {
        HostType::Double => Some(Coercion::new(HostValue::Double(value), COST_EXACT)),
        HostType::Float => Some(Coercion::new(HostValue::Float(value as f32), COST_PRECISION)),
        HostType::Byte | HostType::Short | HostType::Int | HostType::Long if integral => {
            // Out-of-range values are rejected by the integral conversion
            if value < i64::MIN as f64 || value >= i64::MAX as f64 {
                return None;
            }
            let mut coercion = coerce_integer(value as i64, expected)?;
            coercion.cost = COST_NARROWING;
            Some(coercion)
        }
        HostType::Any => Some(Coercion::new(HostValue::Double(value), COST_BOXING)),
        HostType::String => Some(Coercion::new(
            HostValue::String(value.to_string()),
            COST_STRING_CONVERSION,
        )),
        _ => None,
    }
}

fn coerce_proxy(proxy: &ObjectProxy, expected: &HostType, apply: bool) -> Result<Coercion> {
    let mismatch = || BridgeError::coercion(expected, proxy.type_label());

    match (proxy.target(), expected) {
        (_, HostType::Any) => Ok(Coercion::new(proxy.host_value(), COST_BOXING)),
        (ProxyTarget::Instance { object, class }, HostType::Object(name)) => {
            let distance = class.distance_to(name).ok_or_else(mismatch)?;
            Ok(Coercion::new(HostValue::Object(object.clone()), distance))
        }
        (ProxyTarget::Class(class), HostType::Class) => Ok(Coercion::new(
            HostValue::Class(class.name().to_string()),
            COST_EXACT,
        )),
        (ProxyTarget::Array(array), HostType::Array(element)) if array.element == **element => {
            Ok(Coercion::new(HostValue::Array(array.clone()), COST_EXACT))
        }
        (_, HostType::String) => {
            let text = if apply {
                canonical_string(proxy)
            } else {
                String::new()
            };
            Ok(Coercion::new(HostValue::String(text), COST_STRING_CONVERSION))
        }
        _ => Err(mismatch()),
    }
}

/// The host's canonical string form: a declared `toString()`, falling back to
/// the object's identity.
pub(crate) fn canonical_string(proxy: &ObjectProxy) -> String {
    match proxy.target() {
        ProxyTarget::Instance { object, class } => invoke_to_string(object, class)
            .unwrap_or_else(|| object.to_string()),
        ProxyTarget::Class(class) => format!("class {}", class.name()),
        ProxyTarget::Array(array) => HostValue::Array(array.clone()).to_string(),
    }
}

fn invoke_to_string(object: &HostRef, class: &crate::reflect::ClassHandle) -> Option<String> {
    let method = class
        .dispatch()
        .methods("toString")
        .iter()
        .find(|m| m.params().is_empty() && !m.is_static())?;
    match method.invoke(Some(object), Vec::new()) {
        Ok(HostValue::String(text)) => Some(text),
        Ok(other) => Some(other.to_string()),
        Err(err) => {
            tracing::debug!(class = %class.name(), error = %err, "toString failed, using identity");
            None
        }
    }
}

impl ScriptEnvironment {
    /// Marshals a host value for the script. Objects and arrays go through the
    /// collection policy; classes become class proxies.
    pub fn to_script(&mut self, value: HostValue) -> Result<ScriptValue> {
        let marshaled = match value {
            HostValue::Null => ScriptValue::Null,
            HostValue::Boolean(b) => ScriptValue::Bool(b),
            HostValue::Byte(v) => ScriptValue::Integer(i64::from(v)),
            HostValue::Short(v) => ScriptValue::Integer(i64::from(v)),
            HostValue::Int(v) => ScriptValue::Integer(i64::from(v)),
            HostValue::Long(v) => ScriptValue::Integer(v),
            HostValue::Float(v) => ScriptValue::Number(f64::from(v)),
            HostValue::Double(v) => ScriptValue::Number(v),
            HostValue::Char(c) => ScriptValue::String(c.to_string()),
            HostValue::String(s) => ScriptValue::String(s),
            HostValue::Object(object) => return self.translate_object(object),
            HostValue::Array(array) => return self.translate_array(array),
            HostValue::Class(name) => {
                let class = self.reflector.resolve_class(&name)?;
                ScriptValue::Proxy(self.handles.insert(ProxyTarget::Class(class)))
            }
        };
        Ok(marshaled)
    }

    /// [`to_host`] against this environment's handle table.
    pub fn to_host(&self, value: &ScriptValue, expected: &HostType) -> Result<HostValue> {
        to_host(value, expected, &self.handles)
    }
}
