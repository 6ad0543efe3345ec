//! Bootstrap hook
//!
//! Runs once per environment, before any script code, and decides which
//! globals the script starts with: the root binding carrying the import
//! function, plus whatever capabilities the embedding application exposes.
//! Bindings are staged first and committed together: a failing listener
//! installs no globals and leaves the environment uninitialized. Classes it
//! imported on the way stay cached, and their proxies stay in the handle
//! table until teardown.

use crate::environment::{Lifecycle, ScriptEnvironment};
use crate::error::{BridgeError, Result};
use crate::value::ScriptValue;
use ferry_host::HostValue;
use std::collections::BTreeMap;

/// A global installed into the script's scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// The bridge entry point; exposes `import_function` as a callable.
    Root { import_function: String },
    Value(ScriptValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Installed,
    /// The environment was already bootstrapped; nothing changed.
    AlreadyInitialized,
}

/// Embedding-side callback run during bootstrap.
pub trait LoadListener {
    fn on_script_load(&self, ctx: &mut LoadContext<'_>) -> Result<()>;
}

/// Staging area handed to a [`LoadListener`].
pub struct LoadContext<'e> {
    env: &'e mut ScriptEnvironment,
    staged: BTreeMap<String, Binding>,
}

impl<'e> LoadContext<'e> {
    fn new(env: &'e mut ScriptEnvironment) -> Self {
        let mut staged = BTreeMap::new();
        staged.insert(
            env.root_binding.clone(),
            Binding::Root {
                import_function: env.import_function.clone(),
            },
        );
        Self { env, staged }
    }

    /// Exposes a host value under `name`, marshaled like any return value.
    pub fn expose(&mut self, name: &str, value: HostValue) -> Result<()> {
        self.reserve(name)?;
        let value = self.env.to_script(value)?;
        self.staged.insert(name.to_string(), Binding::Value(value));
        Ok(())
    }

    /// Exposes an imported class proxy under `name`.
    pub fn expose_class(&mut self, name: &str, class: &str) -> Result<()> {
        self.reserve(name)?;
        let value = self.env.import_class(class)?;
        self.staged.insert(name.to_string(), Binding::Value(value));
        Ok(())
    }

    pub fn environment(&mut self) -> &mut ScriptEnvironment {
        self.env
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.staged.contains_key(name)
    }

    fn reserve(&self, name: &str) -> Result<()> {
        if self.is_bound(name) {
            return Err(BridgeError::DuplicateBinding {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Capability {
    Value(HostValue),
    Class(String),
}

/// A listener exposing a fixed list of host values and classes.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    entries: Vec<(String, Capability)>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: impl Into<String>, value: HostValue) -> Self {
        self.entries.push((name.into(), Capability::Value(value)));
        self
    }

    pub fn class(mut self, name: impl Into<String>, class: impl Into<String>) -> Self {
        self.entries.push((name.into(), Capability::Class(class.into())));
        self
    }
}

impl LoadListener for Capabilities {
    fn on_script_load(&self, ctx: &mut LoadContext<'_>) -> Result<()> {
        for (name, capability) in &self.entries {
            match capability {
                Capability::Value(value) => ctx.expose(name, value.clone())?,
                Capability::Class(class) => ctx.expose_class(name, class)?,
            }
        }
        Ok(())
    }
}

impl ScriptEnvironment {
    /// Installs the root binding and the listener's capabilities. Running it
    /// again on an initialized environment is a no-op.
    pub fn bootstrap(&mut self, listener: &dyn LoadListener) -> Result<BootstrapOutcome> {
        if self.lifecycle == Lifecycle::Initialized {
            tracing::warn!(root = %self.root_binding, "bootstrap hook invoked again, ignoring");
            return Ok(BootstrapOutcome::AlreadyInitialized);
        }

        let mut ctx = LoadContext::new(self);
        listener.on_script_load(&mut ctx)?;
        let staged = ctx.staged;

        tracing::debug!(bindings = ?staged.keys().collect::<Vec<_>>(), "bootstrap complete");
        self.globals = staged;
        self.lifecycle = Lifecycle::Initialized;
        Ok(BootstrapOutcome::Installed)
    }
}
