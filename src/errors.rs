use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Stream error: {0}")]
    StreamError(String),
    #[error("Pipeline error: {0}")]
    PipelineError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Encoding error: {0}")]
    EncodingError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Timed out after {0} ms")]
    Timeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        CameraError::InvalidConfiguration(msg.into())
    }

    /// True for errors produced by construction-time validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, CameraError::InvalidConfiguration(_))
    }
}
