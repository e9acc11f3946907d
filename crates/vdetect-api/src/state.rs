//! Application state.

use std::sync::Arc;

use tracing::info;
use vdetect_classifier::{build_classifier, ClassifierConfig, ConfigError};
use vdetect_media::{FetchConfig, ScratchSpace, YtDlpFetcher};

use crate::config::ApiConfig;
use crate::services::Pipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create application state from the environment.
    ///
    /// The classifier is built exactly once here and shared by every request.
    pub fn new(config: ApiConfig, classifier_config: &ClassifierConfig) -> Result<Self, ConfigError> {
        let fetch_config = FetchConfig::from_env();
        let scratch = ScratchSpace::new(fetch_config.scratch_dir.clone());
        let classifier = build_classifier(classifier_config)?;

        info!(
            backend = classifier.name(),
            scratch_dir = %scratch.root().display(),
            "Classifier initialized"
        );

        let fetcher = Arc::new(YtDlpFetcher::new(fetch_config));
        Ok(Self::with_pipeline(config, Pipeline::new(fetcher, classifier, scratch)))
    }

    /// Create application state around an existing pipeline.
    pub fn with_pipeline(config: ApiConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }
}
