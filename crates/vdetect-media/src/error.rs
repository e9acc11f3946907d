//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use vdetect_models::ClassificationError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Downloaded file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }
}

impl From<MediaError> for ClassificationError {
    fn from(err: MediaError) -> Self {
        ClassificationError::FetchFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_fetch_failed_with_cause() {
        let err: ClassificationError = MediaError::download_failed("unsupported source").into();
        assert_eq!(
            err,
            ClassificationError::FetchFailed("Download failed: unsupported source".to_string())
        );
    }
}
