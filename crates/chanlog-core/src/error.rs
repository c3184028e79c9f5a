use thiserror::Error;

/// Application-wide error types for chanlog.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or missing input, rejected before any job starts.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A job is already running; carries its current progress text.
    #[error("An export is already running: {progress}")]
    JobBusy { progress: String },

    /// A link or channel could not be resolved and is skipped.
    #[error("Skipped: {0}")]
    Skipped(String),

    /// The job finished without a single message inside the window.
    #[error("No matching messages in the requested window")]
    NoData,

    /// An identifier is not a valid time-encoded integer.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit retries exhausted.
    #[error("Rate limit exceeded after {0} retries")]
    RateLimitExceeded(u32),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Writing an export file failed.
    #[error("Export error: {0}")]
    ExportError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested export file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true for network-level failures that truncate a listing
    /// instead of failing the whole job.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }
}
