//! Host object instances

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared reference to a live host object.
///
/// The bridge only ever clones this; the payload's lifetime is governed by
/// whoever else holds it.
pub type HostRef = Arc<HostObject>;

/// A host object: its class name plus a type-erased payload.
pub struct HostObject {
    class: String,
    payload: Box<dyn Any + Send + Sync>,
}

impl HostObject {
    pub fn new<T: Any + Send + Sync>(class: impl Into<String>, payload: T) -> HostRef {
        Arc::new(Self {
            class: class.into(),
            payload: Box::new(payload),
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Stable identity of the object for as long as it is alive.
    pub fn identity(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.class, self as *const Self as usize)
    }
}
