//! JS values to bridge values and back
//!
//! Proxies cross as marker objects `{ $ferry: handle }`; the prelude turns
//! them into ES `Proxy` objects and back. Bridge failures cross as
//! `{ $error: kind, message }` and are thrown by the prelude, so scripts see
//! ordinary `Error` objects.

use crate::error::{Result, ScriptError};
use ferry_bridge::{ProxyHandle, ScriptValue};
use rquickjs::{Array, Ctx, IntoJs, Object, Type, Value};

pub(crate) const HANDLE_KEY: &str = "$ferry";
pub(crate) const ERROR_KEY: &str = "$error";

/// Largest integer a JS number represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn from_js(value: &Value<'_>) -> Result<ScriptValue> {
    let converted = match value.type_of() {
        Type::Undefined | Type::Null => ScriptValue::Null,
        Type::Bool => ScriptValue::Bool(value.as_bool().unwrap_or_default()),
        Type::Int => ScriptValue::Integer(i64::from(value.as_int().unwrap_or_default())),
        Type::Float => number(value.as_float().unwrap_or(f64::NAN)),
        Type::String => match value.as_string() {
            Some(text) => ScriptValue::String(text.to_string()?),
            None => ScriptValue::Null,
        },
        Type::Array => {
            let Some(array) = value.as_array() else {
                return Err(ScriptError::Unsupported("array".to_string()));
            };
            let items = array
                .iter::<Value>()
                .map(|item| from_js(&item?))
                .collect::<Result<Vec<_>>>()?;
            ScriptValue::Sequence(items)
        }
        Type::Object => {
            let handle = value
                .as_object()
                .map(|object| object.get::<_, Option<i32>>(HANDLE_KEY))
                .transpose()?
                .flatten()
                .and_then(|raw| u32::try_from(raw).ok());
            match handle {
                Some(handle) => ScriptValue::Proxy(ProxyHandle(handle)),
                None => return Err(ScriptError::Unsupported("object".to_string())),
            }
        }
        other => return Err(ScriptError::Unsupported(format!("{other:?}").to_lowercase())),
    };
    Ok(converted)
}

/// JS has a single number type; integral values travel as integers.
fn number(value: f64) -> ScriptValue {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        ScriptValue::Integer(value as i64)
    } else {
        ScriptValue::Number(value)
    }
}

pub fn to_js<'js>(ctx: &Ctx<'js>, value: &ScriptValue) -> rquickjs::Result<Value<'js>> {
    match value {
        ScriptValue::Null => Ok(Value::new_null(ctx.clone())),
        ScriptValue::Bool(b) => (*b).into_js(ctx),
        ScriptValue::Integer(i) => match i32::try_from(*i) {
            Ok(small) => small.into_js(ctx),
            Err(_) => (*i as f64).into_js(ctx),
        },
        ScriptValue::Number(n) => (*n).into_js(ctx),
        ScriptValue::String(s) => s.as_str().into_js(ctx),
        ScriptValue::Proxy(handle) => {
            let marker = Object::new(ctx.clone())?;
            marker.set(HANDLE_KEY, handle.0)?;
            marker.into_js(ctx)
        }
        ScriptValue::Sequence(items) => {
            let array = Array::new(ctx.clone())?;
            for (index, item) in items.iter().enumerate() {
                array.set(index, to_js(ctx, item)?)?;
            }
            array.into_js(ctx)
        }
    }
}

pub(crate) fn error_marker<'js>(ctx: &Ctx<'js>, err: &ScriptError) -> rquickjs::Result<Value<'js>> {
    let marker = Object::new(ctx.clone())?;
    marker.set(ERROR_KEY, err.script_name())?;
    marker.set("message", err.to_string())?;
    marker.into_js(ctx)
}
