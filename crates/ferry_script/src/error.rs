use ferry_bridge::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ScriptError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("javascript engine error: {0}")]
    Engine(#[from] rquickjs::Error),

    /// An exception escaped the script.
    #[error("uncaught {name} in {script}: {message}")]
    Exception {
        script: String,
        name: String,
        message: String,
        stack: Option<String>,
    },

    #[error("invalid native call: {0}")]
    Argument(String),

    #[error("script value of type {0} cannot cross the bridge")]
    Unsupported(String),

    #[error("script environment is already in use")]
    Busy,

    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScriptError {
    /// Name of the error as the script sees it.
    pub fn script_name(&self) -> &str {
        match self {
            ScriptError::Bridge(err) => err.kind().as_str(),
            ScriptError::Exception { name, .. } => name,
            ScriptError::Argument(_) | ScriptError::Unsupported(_) => "TypeError",
            ScriptError::Engine(_) | ScriptError::Busy | ScriptError::Read { .. } => "Error",
        }
    }
}
