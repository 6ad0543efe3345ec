//! Ferry Scripting
//!
//! JavaScript execution via QuickJS, wired to the bridge
//!
//! ## Architecture
//!
//! - **Natives:** a table of Rust functions operating on one
//!   [`ScriptEnvironment`](ferry_bridge::ScriptEnvironment) by proxy handle
//! - **Prelude:** JS that turns handles into ES `Proxy` objects, raises bridge
//!   failures as named `Error`s and installs `console` and the timer globals
//! - **Runtime:** [`ScriptRuntime`] owns the QuickJS context and drives
//!   bootstrap, evaluation and due timers
//!
//! Scripts only ever see proxies; host objects never leave the environment.

pub mod convert;
pub mod error;
mod natives;
pub mod runtime;
pub mod timers;

pub use error::{Result, ScriptError};
pub use runtime::ScriptRuntime;
pub use timers::{Scheduler, TimerId, MAX_DELAY};

pub use rquickjs;

/// Evaluated into every context before user code.
pub(crate) const PRELUDE: &str = include_str!("prelude.js");
