//! Native functions the prelude is built on
//!
//! Every native takes and returns raw values (see [`convert`](crate::convert)).
//! Failures are returned as error markers rather than thrown, so the prelude
//! can raise them as proper `Error` objects.

use crate::convert::{error_marker, from_js, to_js};
use crate::error::ScriptError;
use crate::timers::{delay_from_millis, Scheduler};
use ferry_bridge::{ProxyHandle, ScriptEnvironment, ScriptValue};
use ferry_host::HostType;
use rquickjs::class::{ClassId, JsClass, Readable, Trace, Tracer};
use rquickjs::prelude::Rest;
use rquickjs::{Class, Ctx, Function, Object, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub(crate) type Shared<T> = Rc<RefCell<T>>;

type Outcome = Result<ScriptValue, ScriptError>;

/// Handles whose last script-side proxy has been collected.
pub(crate) type Dropped = Shared<Vec<ProxyHandle>>;

/// Target object of an instance proxy. Holds one retain on its handle and
/// queues the handle for release when the engine finalizes it.
pub(crate) struct Anchor {
    handle: ProxyHandle,
    dropped: Dropped,
}

impl Drop for Anchor {
    fn drop(&mut self) {
        match self.dropped.try_borrow_mut() {
            Ok(mut dropped) => dropped.push(self.handle),
            Err(_) => tracing::warn!(handle = self.handle.0, "release queue busy, handle kept"),
        }
    }
}

impl<'js> Trace<'js> for Anchor {
    fn trace<'a>(&self, _tracer: Tracer<'a, 'js>) {}
}

impl<'js> JsClass<'js> for Anchor {
    const NAME: &'static str = "HostObject";

    type Mutable = Readable;

    fn class_id() -> &'static ClassId {
        static ID: ClassId = ClassId::new();
        &ID
    }

    fn prototype(ctx: &Ctx<'js>) -> rquickjs::Result<Option<Object<'js>>> {
        Ok(Some(Object::new(ctx.clone())?))
    }

    fn constructor(_ctx: &Ctx<'js>) -> rquickjs::Result<Option<rquickjs::function::Constructor<'js>>> {
        Ok(None)
    }
}

/// Builds the object handed to the prelude.
pub(crate) fn install<'js>(
    ctx: &Ctx<'js>,
    env: &Shared<ScriptEnvironment>,
    scheduler: &Shared<Scheduler>,
    dropped: &Dropped,
) -> rquickjs::Result<Object<'js>> {
    let native = Object::new(ctx.clone())?;

    define(ctx, &native, "importClass", env, |env, args| {
        Ok(env.import_class(&string(args, 0)?)?)
    })?;
    define(ctx, &native, "isClass", env, |env, args| {
        Ok(env.proxy(handle(args, 0)?)?.is_class().into())
    })?;
    define(ctx, &native, "kind", env, |env, args| {
        let kind = env.member_kind(handle(args, 0)?, &string(args, 1)?)?;
        Ok(kind.as_str().into())
    })?;
    define(ctx, &native, "has", env, |env, args| {
        Ok(env.has(handle(args, 0)?, &string(args, 1)?)?.into())
    })?;
    define(ctx, &native, "get", env, |env, args| {
        Ok(env.get(handle(args, 0)?, &string(args, 1)?)?)
    })?;
    define(ctx, &native, "set", env, |env, args| {
        env.set(handle(args, 0)?, &string(args, 1)?, &value(args, 2)?)?;
        Ok(ScriptValue::Null)
    })?;
    define(ctx, &native, "call", env, |env, args| {
        let rest = values(args, 2)?;
        Ok(env.call(handle(args, 0)?, &string(args, 1)?, &rest)?)
    })?;
    define(ctx, &native, "callExact", env, |env, args| {
        let signature = signature(args, 2)?;
        let rest = values(args, 3)?;
        Ok(env.call_with_signature(handle(args, 0)?, &string(args, 1)?, &signature, &rest)?)
    })?;
    define(ctx, &native, "construct", env, |env, args| {
        let rest = values(args, 1)?;
        Ok(env.construct(handle(args, 0)?, &rest)?)
    })?;
    define(ctx, &native, "describe", env, |env, args| {
        Ok(env.describe(handle(args, 0)?)?.into())
    })?;
    define(ctx, &native, "iterate", env, |env, args| {
        env.check_iterable(handle(args, 0)?)?;
        Ok(ScriptValue::Null)
    })?;

    define(ctx, &native, "schedule", scheduler, |scheduler, args| {
        let delay = match value(args, 0)? {
            ScriptValue::Integer(ms) => delay_from_millis(ms as f64),
            ScriptValue::Number(ms) => delay_from_millis(ms),
            _ => Duration::ZERO,
        };
        let repeat = matches!(value(args, 1)?, ScriptValue::Bool(true));
        let now = Instant::now();
        let id = if repeat {
            scheduler.schedule_repeating(now, delay)
        } else {
            scheduler.schedule_once(now, delay)
        };
        Ok(ScriptValue::Integer(i64::from(id)))
    })?;
    define(ctx, &native, "cancel", scheduler, |scheduler, args| {
        let id = value(args, 0)?
            .as_integer()
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| ScriptError::Argument("timer id expected".to_string()))?;
        Ok(scheduler.cancel(id).into())
    })?;

    let (anchored, dropped) = (Rc::clone(env), Rc::clone(dropped));
    native.set(
        "anchor",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, args: Rest<Value<'js>>| -> rquickjs::Result<Value<'js>> {
                let retained = handle(&args.0, 0).and_then(|handle| {
                    let mut env = anchored.try_borrow_mut().map_err(|_| ScriptError::Busy)?;
                    env.retain(handle)?;
                    Ok(handle)
                });
                match retained {
                    Ok(handle) => {
                        let anchor = Anchor {
                            handle,
                            dropped: Rc::clone(&dropped),
                        };
                        Ok(Class::instance(ctx, anchor)?.into_value())
                    }
                    Err(err) => error_marker(&ctx, &err),
                }
            },
        )?,
    )?;

    native.set(
        "log",
        Function::new(ctx.clone(), |level: String, message: String| {
            log(&level, &message);
        })?,
    )?;

    Ok(native)
}

/// Registers `op` under `name`, running it against the shared `state`.
fn define<'js, S, F>(
    ctx: &Ctx<'js>,
    target: &Object<'js>,
    name: &str,
    state: &Shared<S>,
    op: F,
) -> rquickjs::Result<()>
where
    S: 'static,
    F: Fn(&mut S, &[Value<'js>]) -> Outcome + 'js,
{
    let state = Rc::clone(state);
    let function = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, args: Rest<Value<'js>>| -> rquickjs::Result<Value<'js>> {
            // Host code never calls back into the script while state is borrowed
            let outcome = match state.try_borrow_mut() {
                Ok(mut state) => op(&mut *state, &args.0),
                Err(_) => Err(ScriptError::Busy),
            };
            match outcome {
                Ok(value) => to_js(&ctx, &value),
                Err(ScriptError::Engine(err)) => Err(err),
                Err(err) => {
                    tracing::debug!(error = %err, "native call failed");
                    error_marker(&ctx, &err)
                }
            }
        },
    )?;
    target.set(name, function)
}

fn log(level: &str, message: &str) {
    match level {
        "error" => tracing::error!(target: "script", "{message}"),
        "warn" => tracing::warn!(target: "script", "{message}"),
        "debug" => tracing::debug!(target: "script", "{message}"),
        "trace" => tracing::trace!(target: "script", "{message}"),
        _ => tracing::info!(target: "script", "{message}"),
    }
}

fn arg<'a, 'js>(args: &'a [Value<'js>], index: usize) -> Result<&'a Value<'js>, ScriptError> {
    args.get(index)
        .ok_or_else(|| ScriptError::Argument(format!("missing argument {index}")))
}

fn value(args: &[Value<'_>], index: usize) -> Result<ScriptValue, ScriptError> {
    from_js(arg(args, index)?)
}

fn values(args: &[Value<'_>], from: usize) -> Result<Vec<ScriptValue>, ScriptError> {
    args.iter().skip(from).map(from_js).collect()
}

fn handle(args: &[Value<'_>], index: usize) -> Result<ProxyHandle, ScriptError> {
    value(args, index)?
        .as_integer()
        .and_then(|raw| u32::try_from(raw).ok())
        .map(ProxyHandle)
        .ok_or_else(|| ScriptError::Argument(format!("argument {index} is not a proxy handle")))
}

fn string(args: &[Value<'_>], index: usize) -> Result<String, ScriptError> {
    match value(args, index)? {
        ScriptValue::String(text) => Ok(text),
        other => Err(ScriptError::Argument(format!(
            "argument {index} must be a string, got {}",
            other.type_name()
        ))),
    }
}

fn signature(args: &[Value<'_>], index: usize) -> Result<Vec<HostType>, ScriptError> {
    let ScriptValue::Sequence(names) = value(args, index)? else {
        return Err(ScriptError::Argument("signature must be a list of type names".to_string()));
    };
    names
        .iter()
        .map(|name| {
            name.as_str()
                .and_then(HostType::parse)
                .ok_or_else(|| ScriptError::Argument(format!("unknown parameter type {name:?}")))
        })
        .collect()
}
