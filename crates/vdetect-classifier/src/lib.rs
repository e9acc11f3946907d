//! Classifier clients for AI-generated video detection.
//!
//! This crate provides:
//! - The `Classifier` contract shared by every backend
//! - A local model service client (single request/response)
//! - A remote Gemini client driven by an upload/poll/analyze/delete state machine
//! - Normalization of free-form classifier output into the canonical verdict

pub mod classifier;
pub mod config;
pub mod gemini;
pub mod local;
pub mod normalize;
pub mod poll;
pub mod prompt;
pub mod remote;

use std::sync::Arc;

pub use classifier::{Classifier, RawResult};
pub use config::{ClassifierConfig, ConfigError, GeminiConfig, LocalModelConfig};
pub use gemini::GeminiFileApi;
pub use local::LocalModelClassifier;
pub use normalize::{extract_json_object, normalize};
pub use poll::{PollConfig, Sleeper, TokioSleeper};
pub use remote::{FileState, RemoteClassifier, RemoteFileApi, RemoteUploadHandle};

/// Build the process-wide classifier for the configured backend.
pub fn build_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, ConfigError> {
    match config {
        ClassifierConfig::Remote(gemini) => {
            let api = GeminiFileApi::new(gemini.clone())?;
            Ok(Arc::new(RemoteClassifier::new(
                Arc::new(api),
                Arc::new(TokioSleeper),
                gemini.poll.clone(),
            )))
        }
        ClassifierConfig::Local(local) => Ok(Arc::new(LocalModelClassifier::new(local.clone())?)),
    }
}
