//! Classifier contract.

use std::path::Path;

use async_trait::async_trait;
use vdetect_models::ClassificationResult;

/// Unparsed classifier output.
///
/// Kept opaque until the normalizer turns it into a verdict; never returned
/// to callers as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResult(String);

impl RawResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A backend that judges whether a local video file is AI-generated.
///
/// Implementations are constructed once at startup and shared read-only
/// across requests.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Backend name for logging and metrics.
    fn name(&self) -> &'static str;

    /// Classify the video at `path`.
    async fn classify(&self, path: &Path) -> ClassificationResult<RawResult>;

    /// Whether the backend can currently accept work.
    async fn health_check(&self) -> bool {
        true
    }
}
