//! Video analysis handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tracing::{info, warn};
use validator::Validate;
use vdetect_models::{AnalysisRequest, NormalizedResult};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const NO_JSON_MESSAGE: &str = "No JSON data. Did you forget 'Content-Type: application/json'?";
const NO_URL_MESSAGE: &str = "No 'url' provided in JSON";

/// Pull the analysis request out of an arbitrary JSON body.
fn parse_request(body: &Value) -> ApiResult<AnalysisRequest> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::bad_request(NO_JSON_MESSAGE))?;

    let url = match object.get("url") {
        None | Some(Value::Null) => return Err(ApiError::bad_request(NO_URL_MESSAGE)),
        Some(Value::String(url)) => url.trim(),
        Some(_) => return Err(ApiError::bad_request("'url' must be a string")),
    };

    let request = AnalysisRequest::new(url);
    request
        .validate()
        .map_err(|e| ApiError::bad_request(validation_message(&e)))?;
    Ok(request)
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .next()
        .unwrap_or_else(|| errors.to_string())
}

/// Map a JSON extractor rejection to an API error.
///
/// Body read failures (over the size limit, aborted upload) keep their own
/// status and text; everything else means the caller sent no usable JSON.
fn rejection_error(rejection: JsonRejection) -> ApiError {
    warn!("Rejected analysis body: {}", rejection.body_text());
    match rejection {
        JsonRejection::BytesRejection(_) => {
            ApiError::body_rejected(rejection.status(), rejection.body_text())
        }
        _ => ApiError::bad_request(NO_JSON_MESSAGE),
    }
}

/// Analyze the video behind a URL.
///
/// POST /analyze
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<NormalizedResult>> {
    let Json(body) = payload.map_err(rejection_error)?;
    let request = parse_request(&body)?;

    info!(url = %request.url, "Analysis requested");
    let result = state.pipeline.run(&request).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: ApiError) -> String {
        match err {
            ApiError::BadRequest(m) => m,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_request_accepts_url() {
        let request = parse_request(&json!({ "url": " https://example.com/v " })).unwrap();
        assert_eq!(request.url, "https://example.com/v");
    }

    #[test]
    fn test_parse_request_missing_url() {
        assert_eq!(message(parse_request(&json!({})).unwrap_err()), NO_URL_MESSAGE);
        assert_eq!(message(parse_request(&json!({ "url": null })).unwrap_err()), NO_URL_MESSAGE);
    }

    #[test]
    fn test_parse_request_empty_url() {
        let msg = message(parse_request(&json!({ "url": "" })).unwrap_err());
        assert!(msg.contains("url"));
    }

    #[test]
    fn test_parse_request_non_object() {
        assert_eq!(message(parse_request(&json!(["a"])).unwrap_err()), NO_JSON_MESSAGE);
    }

    #[test]
    fn test_parse_request_non_string_url() {
        let msg = message(parse_request(&json!({ "url": 42 })).unwrap_err());
        assert!(msg.contains("string"));
    }
}
