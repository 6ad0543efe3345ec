use ferry_host::HostError;
use thiserror::Error;

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Every way a bridge operation can fail. All of them are recoverable at the
/// script-call boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("class '{name}' not found")]
    ClassNotFound { name: String },

    #[error("access to class '{name}' is denied")]
    AccessDenied { name: String },

    #[error("ambiguous call to {target}: {} candidates match equally well ({})", .candidates.len(), .candidates.join(", "))]
    AmbiguousOverload {
        target: String,
        candidates: Vec<String>,
    },

    #[error("cannot convert {found} to {expected}")]
    TypeCoercion { expected: String, found: String },

    #[error("no overload of {target} accepts ({arguments})")]
    NoApplicableOverload { target: String, arguments: String },

    #[error("cannot create a proxy over null ({context})")]
    NullProxy { context: String },

    #[error("'{class}' has no member '{member}'")]
    NoSuchMember { class: String, member: String },

    #[error("member '{member}' of '{class}' is read-only")]
    ReadOnlyMember { class: String, member: String },

    #[error("'{class}' cannot be constructed")]
    NotConstructible { class: String },

    #[error("'{class}' does not support native iteration, use size() and get(index)")]
    NotIterable { class: String },

    #[error("global binding '{name}' is already defined")]
    DuplicateBinding { name: String },

    #[error("proxy handle {handle} is no longer valid")]
    StaleHandle { handle: u32 },

    #[error("{target} failed: {source}")]
    HostInvocation {
        target: String,
        #[source]
        source: HostError,
    },
}

/// Stable, script-visible name of an error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ClassNotFound,
    AccessDenied,
    AmbiguousOverload,
    TypeCoercion,
    NullProxy,
    NoSuchMember,
    ReadOnlyMember,
    NotConstructible,
    NotIterable,
    DuplicateBinding,
    StaleHandle,
    HostInvocation,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ClassNotFound => "ClassNotFoundError",
            ErrorKind::AccessDenied => "AccessDeniedError",
            ErrorKind::AmbiguousOverload => "AmbiguousOverloadError",
            ErrorKind::TypeCoercion => "TypeCoercionError",
            ErrorKind::NullProxy => "NullProxyError",
            ErrorKind::NoSuchMember => "NoSuchMemberError",
            ErrorKind::ReadOnlyMember => "ReadOnlyMemberError",
            ErrorKind::NotConstructible => "NotConstructibleError",
            ErrorKind::NotIterable => "NotIterableError",
            ErrorKind::DuplicateBinding => "DuplicateBindingError",
            ErrorKind::StaleHandle => "StaleHandleError",
            ErrorKind::HostInvocation => "HostInvocationError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::ClassNotFound { .. } => ErrorKind::ClassNotFound,
            BridgeError::AccessDenied { .. } => ErrorKind::AccessDenied,
            BridgeError::AmbiguousOverload { .. } => ErrorKind::AmbiguousOverload,
            // Arguments that fit no overload are a coercion failure
            BridgeError::TypeCoercion { .. } | BridgeError::NoApplicableOverload { .. } => {
                ErrorKind::TypeCoercion
            }
            BridgeError::NullProxy { .. } => ErrorKind::NullProxy,
            BridgeError::NoSuchMember { .. } => ErrorKind::NoSuchMember,
            BridgeError::ReadOnlyMember { .. } => ErrorKind::ReadOnlyMember,
            BridgeError::NotConstructible { .. } => ErrorKind::NotConstructible,
            BridgeError::NotIterable { .. } => ErrorKind::NotIterable,
            BridgeError::DuplicateBinding { .. } => ErrorKind::DuplicateBinding,
            BridgeError::StaleHandle { .. } => ErrorKind::StaleHandle,
            BridgeError::HostInvocation { .. } => ErrorKind::HostInvocation,
        }
    }

    pub(crate) fn coercion(expected: impl ToString, found: impl ToString) -> Self {
        BridgeError::TypeCoercion {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn invocation(target: impl Into<String>, source: HostError) -> Self {
        BridgeError::HostInvocation {
            target: target.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_script_names() {
        let err = BridgeError::ClassNotFound {
            name: "a.B".into(),
        };
        assert_eq!(err.kind().as_str(), "ClassNotFoundError");
        assert_eq!(err.to_string(), "class 'a.B' not found");
    }

    #[test]
    fn no_applicable_overload_is_a_coercion_failure() {
        let err = BridgeError::NoApplicableOverload {
            target: "a.B.f".into(),
            arguments: "string".into(),
        };
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
    }

    #[test]
    fn ambiguity_lists_candidates() {
        let err = BridgeError::AmbiguousOverload {
            target: "a.B.f".into(),
            candidates: vec!["f(int, double)".into(), "f(double, int)".into()],
        };
        let message = err.to_string();
        assert!(message.contains("2 candidates"));
        assert!(message.contains("f(double, int)"));
    }
}
