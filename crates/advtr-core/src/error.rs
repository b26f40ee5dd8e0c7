//! Error types for advtr.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("raw build argument is invalid: {raw}")]
    InvalidBuildArgument { raw: String },

    #[error("invalid registry '{name}': expected a 'uri' or 'url'")]
    InvalidRegistry { name: String },

    #[error("registry '{0}' is not declared")]
    UnknownRegistry(String),

    #[error("registry '{registry}' requires a value for '{field}'")]
    MissingTagValue {
        registry: String,
        field: &'static str,
    },

    #[error("missing build arguments, pass {} when running the command", options.join(", "))]
    MissingBuildArguments { options: Vec<String> },

    #[error("unknown build target: {0}")]
    UnknownTarget(String),

    #[error("command failed: {command}: {message}")]
    ExecutionFailed { command: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
