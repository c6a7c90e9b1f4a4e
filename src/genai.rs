//! Generative AI boundary: credential selection, text generation and the
//! long-running video operation, plus the Gemini REST client behind them.

use crate::config::ToolboxConfig;
use crate::error::{ToolboxError, ToolboxResult};
use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Header carrying the API key. Keeping it out of the URL keeps it out of
/// error messages and logs.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Message the API returns when the selected key points at nothing usable.
pub const CREDENTIAL_NOT_FOUND: &str = "Requested entity was not found";

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn has_selected_key(&self) -> bool;
    /// Interactive selection; resolves once the user picked (or dismissed) a key.
    async fn open_select_key(&self) -> ToolboxResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    pub model: String,
    pub prompt: String,
    pub number_of_videos: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

impl VideoRequest {
    pub fn from_config(config: &ToolboxConfig, prompt: &str) -> Self {
        Self {
            model: config.video_model.clone(),
            prompt: prompt.to_string(),
            number_of_videos: config.number_of_videos,
            resolution: config.video_resolution.clone(),
            aspect_ratio: config.video_aspect_ratio.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoOperation {
    pub name: String,
    pub done: bool,
    /// Location of the first generated video once `done`.
    pub video_uri: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// `Ok(None)` when the model answered with no text.
    async fn generate_text(&self, model: &str, prompt: &str) -> ToolboxResult<Option<String>>;
    async fn generate_videos(&self, request: &VideoRequest) -> ToolboxResult<VideoOperation>;
    async fn poll_video_operation(&self, operation: &VideoOperation) -> ToolboxResult<VideoOperation>;
    async fn fetch_artifact(&self, uri: &str) -> ToolboxResult<Vec<u8>>;
}

/// Credentials taken from configuration. There is no interactive picker:
/// "selecting" succeeds once a key has been set, e.g. through `set_key`.
pub struct ConfiguredCredentials {
    api_key: Mutex<Option<String>>,
}

impl ConfiguredCredentials {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: Mutex::new(api_key.filter(|k| !k.trim().is_empty())),
        }
    }

    pub fn set_key(&self, key: &str) {
        if let Ok(mut guard) = self.api_key.lock() {
            *guard = Some(key.trim().to_string()).filter(|k| !k.is_empty());
        }
    }

    pub fn current_key(&self) -> Option<String> {
        self.api_key.lock().ok().and_then(|k| k.clone())
    }
}

#[async_trait]
impl CredentialProvider for ConfiguredCredentials {
    async fn has_selected_key(&self) -> bool {
        self.current_key().is_some()
    }

    async fn open_select_key(&self) -> ToolboxResult<()> {
        if self.current_key().is_some() {
            Ok(())
        } else {
            Err(ToolboxError::CredentialMissing)
        }
    }
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    credentials: Arc<ConfiguredCredentials>,
}

impl GeminiClient {
    /// The key is read from `credentials` on every request, so a key selected
    /// after construction is picked up.
    pub fn new(config: &ToolboxConfig, credentials: Arc<ConfiguredCredentials>) -> ToolboxResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> ToolboxResult<RequestBuilder> {
        let key = self
            .credentials
            .current_key()
            .ok_or(ToolboxError::CredentialMissing)?;
        Ok(request.header(API_KEY_HEADER, key))
    }

    async fn send_json(&self, request: RequestBuilder) -> ToolboxResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("[gemini] API error {}: {}", status.as_u16(), snippet(&body, 300));
            return Err(classify_api_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn snippet(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

/// Maps a failed API response to the toolbox taxonomy.
pub fn classify_api_error(status: u16, body: &str) -> ToolboxError {
    if body.contains(CREDENTIAL_NOT_FOUND) || status == 401 || status == 403 {
        return ToolboxError::CredentialInvalid(format!("API error {status}"));
    }
    ToolboxError::service(
        "gemini",
        format!("API error {}: {}", status, snippet(body, 200)),
    )
}

/// Concatenated text of the first candidate, `None` when there is none.
pub fn extract_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter(|p| !p["thought"].as_bool().unwrap_or(false))
        .filter_map(|p| p["text"].as_str())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn parse_operation(value: &Value) -> VideoOperation {
    let response = &value["response"]["generateVideoResponse"];
    let video_uri = response["generatedSamples"][0]["video"]["uri"]
        .as_str()
        .or_else(|| value["response"]["generatedVideos"][0]["video"]["uri"].as_str())
        .map(str::to_string);
    VideoOperation {
        name: value["name"].as_str().unwrap_or_default().to_string(),
        done: value["done"].as_bool().unwrap_or(false),
        video_uri,
        error: value["error"]["message"].as_str().map(str::to_string),
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn generate_text(&self, model: &str, prompt: &str) -> ToolboxResult<Option<String>> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });
        info!("[gemini] generateContent model={}", model);
        let request = self.authorized(self.client.post(&url).json(&body))?;
        let response = self.send_json(request).await?;
        Ok(extract_text(&response))
    }

    async fn generate_videos(&self, request: &VideoRequest) -> ToolboxResult<VideoOperation> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, request.model);
        let body = json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": {
                "sampleCount": request.number_of_videos,
                "resolution": request.resolution,
                "aspectRatio": request.aspect_ratio,
            }
        });
        info!("[gemini] predictLongRunning model={}", request.model);
        let response = self
            .send_json(self.authorized(self.client.post(&url).json(&body))?)
            .await?;
        let operation = parse_operation(&response);
        if operation.name.is_empty() {
            return Err(ToolboxError::service("gemini", "operation name missing"));
        }
        Ok(operation)
    }

    async fn poll_video_operation(&self, operation: &VideoOperation) -> ToolboxResult<VideoOperation> {
        let url = format!("{}/{}", self.base_url, operation.name);
        let response = self.send_json(self.authorized(self.client.get(&url))?).await?;
        let next = parse_operation(&response);
        if let Some(message) = &next.error {
            warn!("[gemini] operation {} failed: {}", operation.name, message);
            return Err(ToolboxError::service("gemini", message.clone()));
        }
        Ok(VideoOperation {
            name: operation.name.clone(),
            ..next
        })
    }

    async fn fetch_artifact(&self, uri: &str) -> ToolboxResult<Vec<u8>> {
        let response = self.authorized(self.client.get(uri))?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status.as_u16(), &body));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
