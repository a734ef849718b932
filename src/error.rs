//! Error definitions for the configuration cache.

use thiserror::Error;

/// Errors surfaced by configuration resources and their collaborators.
///
/// Variants fall into three groups: configuration errors (caller bugs,
/// raised synchronously and never retried), transport errors from the
/// remote repository, and payload errors (undecodable or empty bodies,
/// store I/O failures).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No resource registered under the given name.
    #[error("resource `{0}` not initialized")]
    UnknownResource(String),

    /// A resource was registered under this name with a different payload type.
    #[error("resource `{0}` is registered with a different type")]
    TypeMismatch(String),

    /// Resource names must be non-blank.
    #[error("resource name must not be blank")]
    InvalidResourceName,

    /// A required collaborator was not supplied to the builder.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Cache max age must be zero or positive.
    #[error("cache max age must be >= 0, got {0}")]
    NegativeMaxAge(i64),

    /// The remote repository URL failed validation.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The remote responded with a non-success HTTP status.
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection-level failure talking to the remote.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote call succeeded but returned no usable payload.
    #[error("empty response payload")]
    EmptyPayload,

    /// Serialization or deserialization of a config payload failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The serialized store failed at the I/O level.
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// HTTP status code, if this error carries one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ConfigError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Codec(e.to_string())
    }
}
