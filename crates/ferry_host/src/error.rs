use thiserror::Error;

pub type HostResult<T> = Result<T, HostError>;

/// Failures raised by host code while it is being invoked through the bridge.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("class '{name}' is already registered")]
    DuplicateClass { name: String },

    #[error("expected receiver of class '{expected}', got '{actual}'")]
    WrongReceiver { expected: String, actual: String },

    #[error("member '{member}' requires an instance")]
    MissingReceiver { member: String },

    #[error("field '{name}' is final")]
    FinalField { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),
}
