//! Canonical verdict schema.
//!
//! Every classifier backend must ultimately produce this shape. Field names
//! are camelCase on the wire for compatibility with existing clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lower bound for every score in the verdict.
pub const SCORE_MIN: f64 = 0.0;

/// Upper bound for every score in the verdict.
pub const SCORE_MAX: f64 = 100.0;

/// Per-signal scores, each in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub visual_artifacts: f64,
    pub audio_anomalies: f64,
    pub motion_patterns: f64,
    pub face_analysis: f64,
}

/// The verdict returned to callers.
///
/// `url` and `timestamp` default to empty/zero when parsed from classifier
/// output; the pipeline stamps them after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    /// Whether the video is judged synthetically generated
    #[serde(rename = "isAI")]
    pub is_ai: bool,

    /// Confidence in the verdict (0-100)
    pub confidence: f64,

    pub details: Details,

    /// Free-form reasoning from the classifier
    pub explanation: String,

    /// Source URL, echoed from the request
    #[serde(default)]
    pub url: String,

    /// Completion time in epoch seconds
    #[serde(default)]
    pub timestamp: i64,
}

impl NormalizedResult {
    /// Stamp request metadata onto the verdict.
    pub fn stamped(mut self, url: impl Into<String>, timestamp: i64) -> Self {
        self.url = url.into();
        self.timestamp = timestamp;
        self
    }

    /// Clamp every score into `[0, 100]`.
    ///
    /// Returns `true` if any value had to be adjusted.
    pub fn clamp_scores(&mut self) -> bool {
        let mut adjusted = false;
        for score in [
            &mut self.confidence,
            &mut self.details.visual_artifacts,
            &mut self.details.audio_anomalies,
            &mut self.details.motion_patterns,
            &mut self.details.face_analysis,
        ] {
            let clamped = score.clamp(SCORE_MIN, SCORE_MAX);
            if clamped != *score {
                *score = clamped;
                adjusted = true;
            }
        }
        adjusted
    }

    /// Check that every score is within `[0, 100]`.
    pub fn scores_in_range(&self) -> bool {
        [
            self.confidence,
            self.details.visual_artifacts,
            self.details.audio_anomalies,
            self.details.motion_patterns,
            self.details.face_analysis,
        ]
        .iter()
        .all(|s| (SCORE_MIN..=SCORE_MAX).contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> NormalizedResult {
        NormalizedResult {
            is_ai: true,
            confidence: 87.0,
            details: Details {
                visual_artifacts: 80.0,
                audio_anomalies: 10.0,
                motion_patterns: 65.5,
                face_analysis: 90.0,
            },
            explanation: "Warped hands".to_string(),
            url: String::new(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample().stamped("https://x/v", 1_700_000_000)).unwrap();
        assert_eq!(value["isAI"], json!(true));
        assert_eq!(value["confidence"], json!(87.0));
        assert_eq!(value["details"]["visualArtifacts"], json!(80.0));
        assert_eq!(value["details"]["audioAnomalies"], json!(10.0));
        assert_eq!(value["details"]["motionPatterns"], json!(65.5));
        assert_eq!(value["details"]["faceAnalysis"], json!(90.0));
        assert_eq!(value["url"], json!("https://x/v"));
        assert_eq!(value["timestamp"], json!(1_700_000_000));
    }

    #[test]
    fn test_url_and_timestamp_are_optional_on_input() {
        let parsed: NormalizedResult = serde_json::from_value(json!({
            "isAI": false,
            "confidence": 12,
            "details": {
                "visualArtifacts": 1,
                "audioAnomalies": 2,
                "motionPatterns": 3,
                "faceAnalysis": 4
            },
            "explanation": "Looks real"
        }))
        .unwrap();
        assert_eq!(parsed.url, "");
        assert_eq!(parsed.timestamp, 0);
        assert_eq!(parsed.confidence, 12.0);
    }

    #[test]
    fn test_clamp_scores() {
        let mut result = sample();
        assert!(!result.clamp_scores());

        result.confidence = 140.0;
        result.details.audio_anomalies = -3.0;
        assert!(!result.scores_in_range());
        assert!(result.clamp_scores());
        assert_eq!(result.confidence, 100.0);
        assert_eq!(result.details.audio_anomalies, 0.0);
        assert!(result.scores_in_range());
    }

    #[test]
    fn test_schema_lists_wire_fields() {
        let schema = schemars::schema_for!(NormalizedResult);
        let rendered = serde_json::to_string(&schema).unwrap();
        assert!(rendered.contains("isAI"));
        assert!(rendered.contains("visualArtifacts"));
    }
}
