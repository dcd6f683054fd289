use thiserror::Error;

/// Failures raised while talking to the remote host or interpreting what it
/// sent back.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote execution reported errors: {}", .0.join("; "))]
    Execution(Vec<String>),

    #[error("output record {index} could not be deserialised as JSON: {reason}")]
    Deserialization { index: usize, reason: String },
}

impl InvokeError {
    pub fn transport(message: impl Into<String>) -> Self {
        InvokeError::Transport(message.into())
    }

    /// Remote error messages in emission order, when the script itself failed.
    pub fn remote_messages(&self) -> Option<&[String]> {
        match self {
            InvokeError::Execution(messages) => Some(messages),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("{0}")]
    TestResult(String),
}

#[derive(Error, Debug)]
pub enum ArgsError {
    #[error("unable to read module arguments from {source_name}: {source}")]
    Read {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("module arguments are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("module arguments must be a JSON object")]
    NotAnObject,

    #[error("missing required arguments: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Unsupported parameters for (psrp_remote) module: {}", .0.join(", "))]
    Unsupported(Vec<String>),

    #[error("argument {name} is of type {found} and we were unable to convert to {expected}")]
    Type {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("value of {name} must be one of: {allowed}, got: {found}")]
    Choice {
        name: String,
        allowed: &'static str,
        found: String,
    },
}
