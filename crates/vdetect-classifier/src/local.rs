//! Local model service client.
//!
//! The model runs in a co-located inference service that takes a path on the
//! shared scratch volume and answers with per-label scores in one round trip.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vdetect_models::{ClassificationError, ClassificationResult, Details, NormalizedResult};

use crate::classifier::{Classifier, RawResult};
use crate::config::{ConfigError, LocalModelConfig};

/// Label fragments that mark a score as "synthetic".
const SYNTHETIC_MARKERS: &[&str] = &["fake", "synthetic", "generated", "manipulated", "deepfake"];

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    video_path: &'a str,
}

/// One label/score pair from the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Client for the local inference service.
pub struct LocalModelClassifier {
    http: Client,
    config: LocalModelConfig,
}

impl LocalModelClassifier {
    /// Create a new local model client.
    pub fn new(config: LocalModelConfig) -> Result<Self, ConfigError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

fn is_synthetic_label(label: &str) -> bool {
    let label = label.trim().to_lowercase();
    label == "ai" || SYNTHETIC_MARKERS.iter().any(|m| label.contains(m))
}

/// Map label scores onto the canonical verdict.
///
/// The probability of synthesis is the best synthetic-label score, or one
/// minus the best authentic-label score when no synthetic label is present.
pub fn verdict_from_scores(scores: &[LabelScore]) -> Option<NormalizedResult> {
    if scores.is_empty() {
        return None;
    }

    let best = |synthetic: bool| {
        scores
            .iter()
            .filter(|s| is_synthetic_label(&s.label) == synthetic)
            .map(|s| s.score.clamp(0.0, 1.0))
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))))
    };

    let p = match (best(true), best(false)) {
        (Some(synthetic), _) => synthetic,
        (None, Some(real)) => 1.0 - real,
        (None, None) => return None,
    };
    let is_ai = p >= 0.5;
    let confidence = if is_ai { p * 100.0 } else { (1.0 - p) * 100.0 };

    let labels = scores
        .iter()
        .map(|s| format!("{}={:.2}", s.label, s.score))
        .collect::<Vec<_>>()
        .join(", ");

    Some(NormalizedResult {
        is_ai,
        confidence,
        details: Details {
            visual_artifacts: p * 100.0,
            audio_anomalies: 0.0,
            motion_patterns: p * 100.0,
            face_analysis: p * 100.0,
        },
        explanation: format!(
            "Local model judged the video {} ({}).",
            if is_ai { "AI-generated" } else { "authentic" },
            labels
        ),
        url: String::new(),
        timestamp: 0,
    })
}

#[async_trait]
impl Classifier for LocalModelClassifier {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn classify(&self, path: &Path) -> ClassificationResult<RawResult> {
        let url = self.url("classify");
        let video_path = path.to_string_lossy();
        debug!("Sending classification request to {}", url);

        let response = self
            .http
            .post(&url)
            .json(&ClassifyRequest { video_path: &video_path })
            .send()
            .await
            .map_err(|e| ClassificationError::backend(format!("local model unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::backend(format!(
                "local model returned {}: {}",
                status,
                body.trim()
            )));
        }

        let scores: Vec<LabelScore> = response
            .json()
            .await
            .map_err(|e| ClassificationError::backend(format!("invalid local model response: {}", e)))?;

        let verdict = verdict_from_scores(&scores)
            .ok_or_else(|| ClassificationError::backend("local model returned no scores"))?;
        let text = serde_json::to_string(&verdict)
            .map_err(|e| ClassificationError::backend(e.to_string()))?;
        Ok(RawResult::new(text))
    }

    async fn health_check(&self) -> bool {
        match self.http.get(self.url("health")).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthResponse>().await {
                    Ok(health) => health.status == "healthy" || health.status == "ok",
                    Err(e) => {
                        warn!("Local model health response invalid: {}", e);
                        false
                    }
                }
            }
            Ok(response) => {
                warn!("Local model health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Local model health check error: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn score(label: &str, score: f64) -> LabelScore {
        LabelScore {
            label: label.to_string(),
            score,
        }
    }

    fn classifier_for(server: &MockServer) -> LocalModelClassifier {
        LocalModelClassifier::new(LocalModelConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_synthetic_labels() {
        assert!(is_synthetic_label("Deepfake"));
        assert!(is_synthetic_label("AI"));
        assert!(is_synthetic_label("ai_generated"));
        assert!(!is_synthetic_label("real"));
        assert!(!is_synthetic_label("authentic"));
    }

    #[test]
    fn test_verdict_from_synthetic_score() {
        let verdict = verdict_from_scores(&[score("fake", 0.9), score("real", 0.1)]).unwrap();
        assert!(verdict.is_ai);
        assert!((verdict.confidence - 90.0).abs() < 1e-9);
        assert!((verdict.details.visual_artifacts - 90.0).abs() < 1e-9);
        assert!(verdict.scores_in_range());
    }

    #[test]
    fn test_verdict_from_real_score_only() {
        let verdict = verdict_from_scores(&[score("real", 0.8)]).unwrap();
        assert!(!verdict.is_ai);
        assert!((verdict.confidence - 80.0).abs() < 1e-9);
        assert!((verdict.details.face_analysis - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_verdict_from_no_scores() {
        assert!(verdict_from_scores(&[]).is_none());
    }

    #[tokio::test]
    async fn test_classify_produces_canonical_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .and(body_json(json!({ "video_path": "/scratch/abc.mp4" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "label": "Fake", "score": 0.75 },
                { "label": "Real", "score": 0.25 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let raw = classifier_for(&server)
            .classify(Path::new("/scratch/abc.mp4"))
            .await
            .unwrap();
        let verdict = normalize(raw.as_str()).unwrap();
        assert!(verdict.is_ai);
        assert_eq!(verdict.confidence, 75.0);
    }

    #[tokio::test]
    async fn test_classify_server_error_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = classifier_for(&server)
            .classify(Path::new("/scratch/abc.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::BackendError(ref m) if m.contains("model not loaded")));
    }

    #[tokio::test]
    async fn test_classify_empty_scores_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = classifier_for(&server)
            .classify(Path::new("/scratch/abc.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::BackendError(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
            .mount(&server)
            .await;

        assert!(classifier_for(&server).health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let classifier = LocalModelClassifier::new(LocalModelConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert!(!classifier.health_check().await);
    }
}
