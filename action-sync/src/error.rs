use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Task store API error: {status} - {message}")]
    StoreApiError { status: u16, message: String },

    #[error("Extraction API error: {status} - {message}")]
    ExtractionApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Note corpus unavailable at {path}: {source}")]
    NotesUnavailable {
        path: String,
        #[source]
        source: std::io::Error
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error)
}

impl SyncError {
    /// Transient failures worth another attempt on an idempotent request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimited { .. } => true,
            Self::StoreApiError { status, .. } | Self::ExtractionApiError { status, .. } => {
                *status >= 500
            }
            _ => false
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        if let Self::RateLimited {
            retry_after_seconds
        } = self
        {
            Some(*retry_after_seconds)
        } else {
            None
        }
    }
}
