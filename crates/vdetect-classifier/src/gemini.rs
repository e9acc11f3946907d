//! Gemini file API client.
//!
//! Videos are sent through the resumable upload protocol, polled until the
//! file becomes `ACTIVE`, referenced from a `generateContent` call, and then
//! deleted. The API key travels in the `x-goog-api-key` header so it never
//! shows up in URLs or error messages.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vdetect_models::{ClassificationError, ClassificationResult};

use crate::config::{ConfigError, GeminiConfig};
use crate::remote::{FileState, RemoteFileApi, RemoteUploadHandle};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Gemini-backed `RemoteFileApi`.
pub struct GeminiFileApi {
    config: GeminiConfig,
    client: Client,
}

/// Body of the resumable upload start request.
#[derive(Debug, Serialize)]
struct UploadStartRequest<'a> {
    file: UploadMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct UploadMetadata<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

/// File resource as returned by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: GeminiFileState,
    #[serde(default)]
    error: Option<GeminiStatus>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum GeminiFileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    StateUnspecified,
}

impl From<GeminiFileState> for FileState {
    fn from(state: GeminiFileState) -> Self {
        match state {
            GeminiFileState::Active => FileState::Ready,
            GeminiFileState::Failed => FileState::Failed,
            GeminiFileState::Processing | GeminiFileState::StateUnspecified => FileState::Processing,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiStatus {
    #[serde(default)]
    message: String,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// MIME type for a video file, from its extension.
pub fn video_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("flv") => "video/x-flv",
        Some("3gp") => "video/3gpp",
        _ => "video/mp4",
    }
}

impl GeminiFileApi {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.config.base_url.trim_end_matches('/'))
    }

    async fn start_upload(&self, display_name: &str, size: u64, mime_type: &str) -> Result<String, String> {
        let response = self
            .client
            .post(self.upload_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadMetadata { display_name },
            })
            .send()
            .await
            .map_err(|e| format!("upload start request failed: {}", e))?;

        let response = ensure_success(response).await?;
        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| "upload start response carried no upload URL".to_string())
    }

    async fn send_bytes(&self, upload_url: &str, path: &Path, size: u64) -> Result<GeminiFile, String> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;

        let response = self
            .client
            .post(upload_url)
            .header(reqwest::header::CONTENT_LENGTH, size.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(file)
            .send()
            .await
            .map_err(|e| format!("upload request failed: {}", e))?;

        let response = ensure_success(response).await?;
        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid upload response: {}", e))?;
        Ok(uploaded.file)
    }
}

/// Turn a non-2xx response into an error string carrying status and body.
async fn ensure_success(response: Response) -> Result<Response, String> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(format!("Gemini API returned {}: {}", status, error_text.trim()))
}

#[async_trait]
impl RemoteFileApi for GeminiFileApi {
    async fn upload(&self, path: &Path) -> ClassificationResult<RemoteUploadHandle> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| ClassificationError::upload_failed(format!("cannot stat {}: {}", path.display(), e)))?
            .len();
        let mime_type = video_mime_type(path);
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video");

        debug!(size, mime_type, "Starting Gemini resumable upload");
        let upload_url = self
            .start_upload(display_name, size, mime_type)
            .await
            .map_err(ClassificationError::upload_failed)?;
        let file = self
            .send_bytes(&upload_url, path, size)
            .await
            .map_err(ClassificationError::upload_failed)?;

        info!(name = %file.name, state = ?file.state, "Gemini upload complete");
        Ok(RemoteUploadHandle {
            remote_id: file.name,
            uri: file.uri,
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
            state: file.state.into(),
        })
    }

    async fn file_state(&self, handle: &RemoteUploadHandle) -> ClassificationResult<FileState> {
        let response = self
            .client
            .get(self.api_url(&handle.remote_id))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| ClassificationError::remote_processing_failed(format!("status request failed: {}", e)))?;

        let response = ensure_success(response)
            .await
            .map_err(ClassificationError::remote_processing_failed)?;
        let file: GeminiFile = response.json().await.map_err(|e| {
            ClassificationError::remote_processing_failed(format!("invalid file status: {}", e))
        })?;

        if let Some(error) = file.error.as_ref().filter(|_| file.state == GeminiFileState::Failed) {
            debug!(name = %file.name, "Gemini reported processing error: {}", error.message);
        }
        Ok(file.state.into())
    }

    async fn analyze(&self, handle: &RemoteUploadHandle, prompt: &str) -> ClassificationResult<String> {
        let url = self.api_url(&format!("models/{}:generateContent", self.config.model));

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        file_data: Some(FileData {
                            mime_type: &handle.mime_type,
                            file_uri: &handle.uri,
                        }),
                        text: None,
                    },
                    Part {
                        file_data: None,
                        text: Some(prompt),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        info!(model = %self.config.model, "Requesting Gemini analysis");
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassificationError::backend(format!("Gemini API request failed: {}", e)))?;

        let response = ensure_success(response)
            .await
            .map_err(ClassificationError::backend)?;
        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ClassificationError::backend(format!("Failed to parse Gemini response: {}", e)))?;

        let text: String = generated
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ClassificationError::backend("No content in Gemini response"));
        }
        Ok(text)
    }

    async fn delete(&self, handle: &RemoteUploadHandle) -> ClassificationResult<()> {
        let response = self
            .client
            .delete(self.api_url(&handle.remote_id))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| ClassificationError::backend(format!("delete request failed: {}", e)))?;
        ensure_success(response)
            .await
            .map_err(ClassificationError::backend)?;
        Ok(())
    }
}
