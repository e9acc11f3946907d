//! Classification error taxonomy.

use thiserror::Error;

/// Result type for pipeline stages.
pub type ClassificationResult<T> = Result<T, ClassificationError>;

/// Errors that terminate an analysis.
///
/// None of these are retried by the pipeline; each maps to a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("Failed to fetch video: {0}")]
    FetchFailed(String),

    #[error("Failed to upload video to classifier: {0}")]
    UploadFailed(String),

    #[error("Remote processing failed: {0}")]
    RemoteProcessingFailed(String),

    /// Carries a parse diagnostic, never the raw classifier text.
    #[error("Classifier response could not be parsed: {0}")]
    ResponseUnparseable(String),

    #[error("Classifier backend error: {0}")]
    BackendError(String),
}

impl ClassificationError {
    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn remote_processing_failed(msg: impl Into<String>) -> Self {
        Self::RemoteProcessingFailed(msg.into())
    }

    pub fn unparseable(msg: impl Into<String>) -> Self {
        Self::ResponseUnparseable(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendError(msg.into())
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ClassificationError::FetchFailed(_) => "FETCH_FAILED",
            ClassificationError::UploadFailed(_) => "UPLOAD_FAILED",
            ClassificationError::RemoteProcessingFailed(_) => "REMOTE_PROCESSING_FAILED",
            ClassificationError::ResponseUnparseable(_) => "RESPONSE_UNPARSEABLE",
            ClassificationError::BackendError(_) => "BACKEND_ERROR",
        }
    }
}
