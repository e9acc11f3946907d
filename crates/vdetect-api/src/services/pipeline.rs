//! Analysis pipeline: fetch, classify, normalize, stamp.
//!
//! The fetched file lives in a per-request scratch slot. Scope guards sweep
//! the slot and remove the file on every exit path, including early returns
//! and a dropped request future.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, info_span, warn, Instrument};
use vdetect_classifier::{normalize, Classifier};
use vdetect_media::{MediaFetcher, ScratchSpace};
use vdetect_models::{
    AnalysisRequest, ClassificationError, ClassificationResult, NormalizedResult, RequestId,
};

use crate::metrics::names;

/// Orchestrates one analysis per call. Shared across requests.
pub struct Pipeline {
    fetcher: Arc<dyn MediaFetcher>,
    classifier: Arc<dyn Classifier>,
    scratch: ScratchSpace,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, classifier: Arc<dyn Classifier>, scratch: ScratchSpace) -> Self {
        Self {
            fetcher,
            classifier,
            scratch,
        }
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    /// Run the full analysis for one URL.
    pub async fn run(&self, request: &AnalysisRequest) -> ClassificationResult<NormalizedResult> {
        let request_id = RequestId::new();
        let span = info_span!(
            "analysis",
            request_id = %request_id,
            backend = self.classifier.name()
        );

        let outcome = self.run_inner(&request_id, &request.url).instrument(span).await;

        let label = match &outcome {
            Ok(_) => "success",
            Err(e) => e.code(),
        };
        counter!(names::ANALYSES_TOTAL, "outcome" => label).increment(1);
        outcome
    }

    async fn run_inner(&self, request_id: &RequestId, url: &str) -> ClassificationResult<NormalizedResult> {
        self.scratch
            .ensure()
            .await
            .map_err(|e| ClassificationError::fetch_failed(format!("scratch directory unavailable: {}", e)))?;
        let slot = scopeguard::guard(self.scratch.slot(request_id), |slot| {
            slot.sweep_now();
        });

        info!(url = %url, "Fetching video");
        let start = Instant::now();
        let file = self.fetcher.fetch(url, &slot).await.map_err(|e| {
            warn!(url = %url, "Fetch failed: {}", e);
            ClassificationError::from(e)
        })?;
        histogram!(names::FETCH_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        let file = scopeguard::guard(file, |file| {
            file.discard();
        });

        info!(path = %file.path().display(), "Classifying video");
        let start = Instant::now();
        let raw = self.classifier.classify(file.path()).await;
        histogram!(names::CLASSIFY_DURATION_SECONDS, "backend" => self.classifier.name())
            .record(start.elapsed().as_secs_f64());

        let verdict = normalize(raw?.as_str())?;
        info!(is_ai = verdict.is_ai, confidence = verdict.confidence, "Analysis complete");

        Ok(verdict.stamped(url, chrono::Utc::now().timestamp()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use vdetect_classifier::RawResult;
    use vdetect_media::{MediaError, MediaResult, ScratchFile, ScratchSlot};

    const VERDICT: &str = r#"{"isAI":true,"confidence":87,"details":{"visualArtifacts":80,"audioAnomalies":20,"motionPatterns":70,"faceAnalysis":90},"explanation":"Hands morph between frames."}"#;

    /// Writes a small file into the slot, or fails with the given message.
    struct StubFetcher {
        failure: Option<String>,
    }

    #[async_trait]
    impl MediaFetcher for StubFetcher {
        async fn fetch(&self, _url: &str, slot: &ScratchSlot) -> MediaResult<ScratchFile> {
            if let Some(message) = &self.failure {
                return Err(MediaError::download_failed(message.clone()));
            }
            let path = slot.path_with_extension("mp4");
            tokio::fs::write(&path, b"video").await?;
            Ok(ScratchFile::new(path))
        }
    }

    /// Returns a fixed answer and records whether the file existed when called.
    struct StubClassifier {
        answer: ClassificationResult<String>,
        saw_file: Mutex<Option<bool>>,
    }

    impl StubClassifier {
        fn new(answer: ClassificationResult<String>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                saw_file: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn classify(&self, path: &Path) -> ClassificationResult<RawResult> {
            *self.saw_file.lock().unwrap() = Some(path.exists());
            self.answer.clone().map(RawResult::new)
        }
    }

    fn pipeline(dir: &TempDir, failure: Option<&str>, classifier: Arc<StubClassifier>) -> Pipeline {
        Pipeline::new(
            Arc::new(StubFetcher {
                failure: failure.map(str::to_string),
            }),
            classifier,
            ScratchSpace::new(dir.path().join("scratch")),
        )
    }

    fn scratch_is_empty(dir: &TempDir) -> bool {
        match std::fs::read_dir(dir.path().join("scratch")) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[tokio::test]
    async fn test_success_stamps_url_and_timestamp() {
        let dir = TempDir::new().unwrap();
        let classifier = StubClassifier::new(Ok(VERDICT.to_string()));
        let before = chrono::Utc::now().timestamp();

        let result = pipeline(&dir, None, classifier.clone())
            .run(&AnalysisRequest::new("https://example.com/v"))
            .await
            .unwrap();

        assert!(result.is_ai);
        assert_eq!(result.confidence, 87.0);
        assert_eq!(result.url, "https://example.com/v");
        assert!(result.timestamp >= before);
        assert_eq!(*classifier.saw_file.lock().unwrap(), Some(true));
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_classifier() {
        let dir = TempDir::new().unwrap();
        let classifier = StubClassifier::new(Ok(VERDICT.to_string()));

        let err = pipeline(&dir, Some("unsupported source"), classifier.clone())
            .run(&AnalysisRequest::new("https://example.com/v"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClassificationError::FetchFailed(ref m) if m.contains("unsupported source")));
        assert_eq!(*classifier.saw_file.lock().unwrap(), None);
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_classifier_failure_still_cleans_up() {
        let dir = TempDir::new().unwrap();
        let classifier = StubClassifier::new(Err(ClassificationError::backend("model offline")));

        let err = pipeline(&dir, None, classifier)
            .run(&AnalysisRequest::new("https://example.com/v"))
            .await
            .unwrap_err();

        assert_eq!(err, ClassificationError::backend("model offline"));
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_unparseable_output_cleans_up() {
        let dir = TempDir::new().unwrap();
        let classifier = StubClassifier::new(Ok("I cannot decide".to_string()));

        let err = pipeline(&dir, None, classifier)
            .run(&AnalysisRequest::new("https://example.com/v"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClassificationError::ResponseUnparseable(_)));
        assert!(scratch_is_empty(&dir));
    }

    /// Leaves a partial download behind and never finishes.
    struct StalledFetcher;

    #[async_trait]
    impl MediaFetcher for StalledFetcher {
        async fn fetch(&self, _url: &str, slot: &ScratchSlot) -> MediaResult<ScratchFile> {
            tokio::fs::write(slot.path_with_extension("mp4.part"), b"partial").await?;
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_dropped_run_leaves_no_partial_download() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            Arc::new(StalledFetcher),
            StubClassifier::new(Ok(VERDICT.to_string())),
            ScratchSpace::new(dir.path().join("scratch")),
        );

        let attempt = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            pipeline.run(&AnalysisRequest::new("https://example.com/v")),
        )
        .await;

        assert!(attempt.is_err());
        assert!(dir.path().join("scratch").is_dir());
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let pipeline = Arc::new(pipeline(&dir, None, StubClassifier::new(Ok(VERDICT.to_string()))));

        let a = pipeline.clone();
        let b = pipeline.clone();
        let (ra, rb) = tokio::join!(
            async move { a.run(&AnalysisRequest::new("https://example.com/a")).await },
            async move { b.run(&AnalysisRequest::new("https://example.com/b")).await },
        );

        assert_eq!(ra.unwrap().url, "https://example.com/a");
        assert_eq!(rb.unwrap().url, "https://example.com/b");
        assert!(scratch_is_empty(&dir));
    }
}
