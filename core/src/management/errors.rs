#[derive(Debug, thiserror::Error)]
pub enum ManagementApiError {
    #[error("Missing required configuration: {0}")]
    MissingConfiguration(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("JSON parsing failed: {0}")]
    JsonParsingFailed(String),
    #[error("Invalid ISO-8601 duration: '{0}'")]
    InvalidDuration(String),
}

impl ManagementApiError {
    /// Transport failures, throttling and server errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
