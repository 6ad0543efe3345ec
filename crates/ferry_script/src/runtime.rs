//! Script runtime management
//!
//! A [`ScriptRuntime`] pairs one QuickJS context with one
//! [`ScriptEnvironment`]. The prelude is evaluated when the runtime is built;
//! the bootstrap hook runs on the first [`load`](ScriptRuntime::load).

use crate::convert::{from_js, to_js};
use crate::error::{Result, ScriptError};
use crate::natives::{self, Dropped, Shared};
use crate::timers::Scheduler;
use crate::PRELUDE;
use ferry_bridge::{Binding, BootstrapOutcome, LoadListener, ScriptEnvironment, ScriptValue};
use rquickjs::{Context, Ctx, Function, Object, Runtime, Value};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

/// Global the prelude stores its hooks under.
const HOOKS: &str = "__ferry";

/// Script execution context
pub struct ScriptRuntime {
    runtime: Runtime,
    pub context: Context,
    env: Shared<ScriptEnvironment>,
    scheduler: Shared<Scheduler>,
    dropped: Dropped,
}

impl ScriptRuntime {
    pub fn new(env: ScriptEnvironment) -> Result<Self> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;
        let env = Rc::new(RefCell::new(env));
        let scheduler = Rc::new(RefCell::new(Scheduler::new()));
        let dropped = Rc::new(RefCell::new(Vec::new()));

        context.with(|ctx| -> Result<()> {
            let native = natives::install(&ctx, &env, &scheduler, &dropped)?;
            let prelude: Function = ctx.eval(PRELUDE).map_err(|err| caught(&ctx, "<prelude>", err))?;
            prelude
                .call::<_, Object>((native,))
                .map_err(|err| caught(&ctx, "<prelude>", err))?;
            Ok(())
        })?;

        Ok(Self {
            runtime,
            context,
            env,
            scheduler,
            dropped,
        })
    }

    /// Runs the bootstrap hook (first load only) and evaluates `source`.
    pub fn load(&self, name: &str, source: &str, listener: &dyn LoadListener) -> Result<BootstrapOutcome> {
        let outcome = self
            .env
            .try_borrow_mut()
            .map_err(|_| ScriptError::Busy)?
            .bootstrap(listener)?;
        if outcome == BootstrapOutcome::Installed {
            self.install_globals()?;
        }

        tracing::info!(script = %name, "evaluating script");
        self.eval(name, source)?;
        Ok(outcome)
    }

    pub fn load_file(&self, path: &Path, listener: &dyn LoadListener) -> Result<BootstrapOutcome> {
        let source = read(path)?;
        self.load(&path.display().to_string(), &source, listener)
    }

    pub fn execute_file(&self, path: &Path) -> Result<()> {
        let source = read(path)?;
        self.eval(&path.display().to_string(), &source)
    }

    pub fn execute(&self, source: &str) -> Result<()> {
        self.eval("<inline>", source)
    }

    /// Evaluates an expression and brings its value across the bridge.
    /// A returned proxy handle stays valid while the script still
    /// references the object.
    pub fn evaluate(&self, expression: &str) -> Result<ScriptValue> {
        self.context.with(|ctx| -> Result<ScriptValue> {
            let value: Value = ctx.eval(expression).map_err(|err| caught(&ctx, "<inline>", err))?;
            let export: Function = hooks(&ctx)?.get("export")?;
            let raw: Value = export.call((value,)).map_err(|err| caught(&ctx, "<inline>", err))?;
            from_js(&raw)
        })
    }

    /// Call a JavaScript function by name with no arguments.
    pub fn call_function(&self, name: &str) -> Result<()> {
        self.context.with(|ctx| -> Result<()> {
            let func: Function = ctx.globals().get(name)?;
            func.call::<_, ()>(()).map_err(|err| caught(&ctx, name, err))
        })
    }

    /// Fires every timer due at `now`. A callback that throws is logged and
    /// does not stop the others.
    pub fn run_due_timers(&self, now: Instant) -> Result<usize> {
        let due = self
            .scheduler
            .try_borrow_mut()
            .map_err(|_| ScriptError::Busy)?
            .take_due(now);

        let mut fired = 0;
        for id in due {
            let outcome = self.context.with(|ctx| -> Result<bool> {
                let fire: Function = hooks(&ctx)?.get("fire")?;
                fire.call((id,)).map_err(|err| caught(&ctx, "<timer>", err))
            });
            match outcome {
                Ok(true) => fired += 1,
                // Cleared on the script side after it came due
                Ok(false) => {
                    if let Ok(mut scheduler) = self.scheduler.try_borrow_mut() {
                        scheduler.cancel(id);
                    }
                }
                Err(err) => {
                    fired += 1;
                    tracing::error!(timer = id, error = %err, "timer callback failed");
                }
            }
            self.settle();
        }
        Ok(fired)
    }

    /// Runs queued jobs such as promise reactions.
    pub fn run_pending_jobs(&self) -> usize {
        let mut ran = 0;
        while self.runtime.is_job_pending() {
            match self.runtime.execute_pending_job() {
                Ok(true) => ran += 1,
                Ok(false) => break,
                Err(_) => {
                    ran += 1;
                    tracing::error!("queued script job failed");
                }
            }
        }
        ran
    }

    /// Releases the host handles of proxies the engine has finalized.
    /// Returns how many proxies went away.
    pub fn release_collected(&self) -> usize {
        let dropped = match self.dropped.try_borrow_mut() {
            Ok(mut dropped) => std::mem::take(&mut *dropped),
            Err(_) => return 0,
        };
        if dropped.is_empty() {
            return 0;
        }
        let Ok(mut env) = self.env.try_borrow_mut() else {
            // Retry on the next call
            if let Ok(mut queue) = self.dropped.try_borrow_mut() {
                queue.extend(dropped);
            }
            return 0;
        };
        let released = dropped.into_iter().filter(|handle| env.release(*handle)).count();
        tracing::trace!(released, live = env.handles().len(), "collected proxies released");
        released
    }

    /// Collects unreachable script objects, then releases the handles of
    /// proxies that went with them.
    pub fn collect_garbage(&self) -> usize {
        self.runtime.run_gc();
        self.release_collected()
    }

    pub fn next_timer(&self) -> Option<Instant> {
        self.scheduler.try_borrow().ok()?.next_deadline()
    }

    pub fn has_pending_timers(&self) -> bool {
        self.scheduler
            .try_borrow()
            .map(|scheduler| !scheduler.is_empty())
            .unwrap_or(false)
    }

    /// Runs `f` against the environment backing this runtime.
    pub fn with_environment<R>(&self, f: impl FnOnce(&mut ScriptEnvironment) -> R) -> Result<R> {
        let mut env = self.env.try_borrow_mut().map_err(|_| ScriptError::Busy)?;
        Ok(f(&mut env))
    }

    /// Invalidates every proxy and pending timer. A later [`load`](Self::load)
    /// bootstraps the environment again.
    pub fn teardown(&self) -> Result<()> {
        self.env.try_borrow_mut().map_err(|_| ScriptError::Busy)?.teardown();
        self.dropped.try_borrow_mut().map_err(|_| ScriptError::Busy)?.clear();
        self.scheduler.try_borrow_mut().map_err(|_| ScriptError::Busy)?.clear();
        self.context.with(|ctx| -> Result<()> {
            let forget: Function = hooks(&ctx)?.get("forget")?;
            forget.call::<_, ()>(())?;
            Ok(())
        })
    }

    fn install_globals(&self) -> Result<()> {
        let globals: Vec<(String, Binding)> = self
            .env
            .try_borrow()
            .map_err(|_| ScriptError::Busy)?
            .globals()
            .map(|(name, binding)| (name.to_string(), binding.clone()))
            .collect();

        self.context.with(|ctx| -> Result<()> {
            let hooks = hooks(&ctx)?;
            for (name, binding) in &globals {
                let installed = match binding {
                    Binding::Root { import_function } => hooks
                        .get::<_, Function>("installRoot")?
                        .call::<_, ()>((name.as_str(), import_function.as_str())),
                    Binding::Value(value) => hooks
                        .get::<_, Function>("installValue")?
                        .call::<_, ()>((name.as_str(), to_js(&ctx, value)?)),
                };
                installed.map_err(|err| caught(&ctx, "<bootstrap>", err))?;
                tracing::debug!(global = %name, "installed script global");
            }
            Ok(())
        })
    }

    fn eval(&self, name: &str, source: &str) -> Result<()> {
        self.context
            .with(|ctx| ctx.eval::<(), _>(source).map_err(|err| caught(&ctx, name, err)))?;
        self.settle();
        Ok(())
    }

    /// Work due once the script has returned control.
    fn settle(&self) {
        self.run_pending_jobs();
        self.release_collected();
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn hooks<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    Ok(ctx.globals().get(HOOKS)?)
}

/// Turns a pending JS exception into a [`ScriptError::Exception`].
fn caught(ctx: &Ctx<'_>, script: &str, err: rquickjs::Error) -> ScriptError {
    if !matches!(err, rquickjs::Error::Exception) {
        return ScriptError::Engine(err);
    }

    let thrown = ctx.catch();
    let (name, message, stack) = match thrown.as_object() {
        Some(error) => (
            error.get::<_, Option<String>>("name").ok().flatten(),
            error.get::<_, Option<String>>("message").ok().flatten(),
            error.get::<_, Option<String>>("stack").ok().flatten(),
        ),
        None => (None, thrown.as_string().and_then(|s| s.to_string().ok()), None),
    };
    ScriptError::Exception {
        script: script.to_string(),
        name: name.unwrap_or_else(|| "Error".to_string()),
        message: message.unwrap_or_else(|| format!("{:?}", thrown.type_of())),
        stack: stack.filter(|stack| !stack.is_empty()),
    }
}
