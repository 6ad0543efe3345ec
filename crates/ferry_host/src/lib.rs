//! Ferry Host Model
//!
//! The statically-typed side of the bridge:
//! - Host types and values
//! - Class definitions (constructors, methods, fields)
//! - A registry that answers class lookups by qualified name
//!
//! Nothing in here knows about scripts. The bridge consumes this crate through
//! the [`HostRuntime`] trait.

pub mod class;
pub mod error;
pub mod object;
pub mod registry;
pub mod types;

pub use class::{
    getter, invoker, setter, ClassBuilder, FieldDescriptor, FieldGetter, FieldSetter, HostClass, Invoker,
    MethodDescriptor,
};
pub use error::{HostError, HostResult};
pub use object::{HostObject, HostRef};
pub use registry::{ClassRegistry, HostRuntime};
pub use types::{HostArray, HostType, HostValue};

/// Name of the implicit root class every other class descends from.
pub const ROOT_CLASS: &str = "ferry.lang.Object";
