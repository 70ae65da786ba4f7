use thiserror::Error;

use crate::management::ManagementApiError;
use crate::utils::env::EnvVarError;

/// Error type shared by every operation in the core crate.
///
/// Samples surface these unchanged: the binary wrapper prints the error and
/// turns it into exit code `1`. There is no distinction between transient and
/// permanent failures at this level.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("Failed to receive message: {0}")]
    ReceiveFailed(String),

    #[error("Failed to settle message {message_id}: {reason}")]
    SettleFailed { message_id: String, reason: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("AMQP error: {0}")]
    Amqp(String),

    #[error("{0} already disposed")]
    Disposed(&'static str),

    #[error("{0}")]
    Sample(String),

    #[error(transparent)]
    Environment(#[from] EnvVarError),

    #[error(transparent)]
    Management(#[from] ManagementApiError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SampleError {
    pub fn settle(message_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SettleFailed {
            message_id: message_id.into(),
            reason: reason.to_string(),
        }
    }
}

pub type SampleResult<T> = Result<T, SampleError>;

/// Adds a context prefix to any displayable error, producing a [`SampleError`]
/// of the requested kind.
pub trait ErrorContext<T> {
    fn or_sample_error<F>(self, kind: F) -> SampleResult<T>
    where
        F: FnOnce(String) -> SampleError;

    fn with_context<F>(self, f: F) -> SampleResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn or_sample_error<F>(self, kind: F) -> SampleResult<T>
    where
        F: FnOnce(String) -> SampleError,
    {
        self.map_err(|e| kind(e.to_string()))
    }

    fn with_context<F>(self, f: F) -> SampleResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SampleError::Sample(format!("{}: {e}", f())))
    }
}
