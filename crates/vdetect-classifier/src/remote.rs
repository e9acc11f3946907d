//! Remote classification state machine.
//!
//! A remote backend ingests uploads asynchronously, so classification runs
//! through these states:
//!
//! ```text
//! UPLOADING --ok--> PROCESSING --ready--> READY --analysis--> done
//!     |                 |   ^                 |
//!     |                 +---+ poll            |
//!     v                 v                     v
//!   FAILED            FAILED          remote file deleted
//! ```
//!
//! Once an upload has been acknowledged, the remote file is deleted exactly
//! once, whether processing fails, times out, or the analysis call returns.
//! If the classification future is dropped mid-flight, a guard hands the
//! delete to a background task.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, info, info_span, warn, Instrument};
use vdetect_models::{ClassificationError, ClassificationResult};

use crate::classifier::{Classifier, RawResult};
use crate::poll::{PollConfig, Sleeper};
use crate::prompt::ANALYSIS_PROMPT;

/// Processing state reported by the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Processing,
    Ready,
    Failed,
}

/// Reference to a file held by the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUploadHandle {
    /// Backend resource name, e.g. `files/abc123`
    pub remote_id: String,
    /// URI used to reference the file in analysis requests
    pub uri: String,
    pub mime_type: String,
    pub state: FileState,
}

/// Operations a remote backend must offer.
#[async_trait]
pub trait RemoteFileApi: Send + Sync {
    /// Upload a local file. Errors are reported as `UploadFailed`.
    async fn upload(&self, path: &Path) -> ClassificationResult<RemoteUploadHandle>;

    /// Fetch the current processing state of an uploaded file.
    async fn file_state(&self, handle: &RemoteUploadHandle) -> ClassificationResult<FileState>;

    /// Run the analysis prompt against a ready file and return the model text.
    async fn analyze(&self, handle: &RemoteUploadHandle, prompt: &str) -> ClassificationResult<String>;

    /// Release the remote file.
    async fn delete(&self, handle: &RemoteUploadHandle) -> ClassificationResult<()>;
}

/// Releases an uploaded file from `Drop` unless disarmed first.
struct PendingRelease {
    api: Arc<dyn RemoteFileApi>,
    handle: Option<RemoteUploadHandle>,
}

impl PendingRelease {
    fn new(api: Arc<dyn RemoteFileApi>, handle: RemoteUploadHandle) -> Self {
        Self {
            api,
            handle: Some(handle),
        }
    }

    fn disarm(&mut self) -> Option<RemoteUploadHandle> {
        self.handle.take()
    }
}

impl Drop for PendingRelease {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(
                    remote_id = %handle.remote_id,
                    "Classification cancelled, releasing remote file in background"
                );
                runtime.spawn(delete_remote(Arc::clone(&self.api), handle));
            }
            Err(_) => {
                counter!("vdetect_remote_release_failures_total").increment(1);
                warn!(remote_id = %handle.remote_id, "No runtime left to release remote file");
            }
        }
    }
}

async fn delete_remote(api: Arc<dyn RemoteFileApi>, handle: RemoteUploadHandle) {
    match api.delete(&handle).await {
        Ok(()) => debug!(remote_id = %handle.remote_id, "Released remote file"),
        Err(e) => {
            counter!("vdetect_remote_release_failures_total").increment(1);
            warn!(remote_id = %handle.remote_id, "Failed to release remote file: {}", e);
        }
    }
}

/// `Classifier` over any `RemoteFileApi`.
pub struct RemoteClassifier {
    api: Arc<dyn RemoteFileApi>,
    sleeper: Arc<dyn Sleeper>,
    poll: PollConfig,
    prompt: String,
}

impl RemoteClassifier {
    pub fn new(api: Arc<dyn RemoteFileApi>, sleeper: Arc<dyn Sleeper>, poll: PollConfig) -> Self {
        Self {
            api,
            sleeper,
            poll,
            prompt: ANALYSIS_PROMPT.to_string(),
        }
    }

    /// Override the analysis instruction.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// PROCESSING -> READY, bounded by the poll ceiling.
    async fn wait_until_ready(&self, handle: &mut RemoteUploadHandle) -> ClassificationResult<()> {
        let mut polls = 0u32;
        loop {
            match handle.state {
                FileState::Ready => {
                    debug!(remote_id = %handle.remote_id, polls, "Remote file ready");
                    return Ok(());
                }
                FileState::Failed => {
                    return Err(ClassificationError::remote_processing_failed(format!(
                        "backend reported failure while processing {}",
                        handle.remote_id
                    )));
                }
                FileState::Processing if polls >= self.poll.max_polls => {
                    return Err(ClassificationError::remote_processing_failed(format!(
                        "{} still processing after {} polls ({:?})",
                        handle.remote_id,
                        polls,
                        self.poll.budget()
                    )));
                }
                FileState::Processing => {
                    self.sleeper.sleep(self.poll.interval).await;
                    polls += 1;
                    counter!("vdetect_remote_polls_total").increment(1);
                    handle.state = self.api.file_state(handle).await?;
                    debug!(
                        remote_id = %handle.remote_id,
                        poll = polls,
                        state = ?handle.state,
                        "Polled remote file"
                    );
                }
            }
        }
    }

    async fn process_and_analyze(&self, handle: &mut RemoteUploadHandle) -> ClassificationResult<RawResult> {
        self.wait_until_ready(handle).await?;
        let text = self.api.analyze(handle, &self.prompt).await?;
        Ok(RawResult::new(text))
    }

    /// Delete the remote file on a spawned task so the call completes even
    /// if this future is dropped while waiting on it.
    async fn release(&self, handle: RemoteUploadHandle) {
        let remote_id = handle.remote_id.clone();
        let task = tokio::spawn(delete_remote(Arc::clone(&self.api), handle));
        if let Err(e) = task.await {
            warn!(remote_id = %remote_id, "Release task failed: {}", e);
        }
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn classify(&self, path: &Path) -> ClassificationResult<RawResult> {
        let mut handle = self.api.upload(path).await?;
        info!(
            remote_id = %handle.remote_id,
            state = ?handle.state,
            "Uploaded video to remote classifier"
        );

        let mut pending = PendingRelease::new(Arc::clone(&self.api), handle.clone());

        let span = info_span!("remote_file", remote_id = %handle.remote_id);
        let outcome = self.process_and_analyze(&mut handle).instrument(span).await;
        if let Some(handle) = pending.disarm() {
            self.release(handle).await;
        }
        outcome
    }
}
