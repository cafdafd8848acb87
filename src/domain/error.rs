use thiserror::Error;

use crate::domain::request::RequestFailure;

/// Domain-level errors for VoxAI.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    /// Caller supplied empty or invalid input. Raised before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The backend rejected the request, could not be reached, or timed out.
    #[error(transparent)]
    Request(#[from] RequestFailure),

    #[error("Operation '{operation}' is not available on the {scheme} API")]
    Unsupported { operation: String, scheme: String },

    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("Audio device error: {message}")]
    AudioDevice { message: String },

    #[error("Audio error: {0}")]
    Audio(String),
}

impl DomainError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    /// Returns the underlying request failure, if this error came from the network layer.
    pub fn as_request_failure(&self) -> Option<&RequestFailure> {
        match self {
            DomainError::Request(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for DomainError {
    fn from(err: url::ParseError) -> Self {
        DomainError::Config(format!("Invalid URL: {}", err))
    }
}
