//! Configuration loading errors.

use std::path::PathBuf;
use thiserror::Error;

/// Stable code of [`ConfigError::FieldNotFound`].
pub const FIELD_NOT_FOUND_CODE: &str = "ADVTR_CONFIG_FIELD_NOT_FOUND";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {}\nError: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read config file: {}\nError: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(
        "Cannot read config file: {}\nError: package.json file doesn't have 'advtrConfig' field.",
        path.display()
    )]
    FieldNotFound { path: PathBuf },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error(transparent)]
    Validation(#[from] advtr_core::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable error code, for errors callers are expected to special-case.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::FieldNotFound { .. } => Some(FIELD_NOT_FOUND_CODE),
            _ => None,
        }
    }

    pub fn is_field_not_found(&self) -> bool {
        self.code() == Some(FIELD_NOT_FOUND_CODE)
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
