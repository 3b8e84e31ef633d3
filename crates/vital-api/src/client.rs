//! HTTP client for the conversation service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, multipart};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    error::{Error, Result},
    feedback::FeedbackReport,
    speech::SpeechService,
    types::{AudioClip, AudioHealth, ConversationInfo, Emotion, Scenario, StartConversation, StatusReply},
};

/// Default service address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Mime type assumed for synthesized speech when the service doesn't say
const DEFAULT_SPEECH_MIME: &str = "audio/mpeg";

/// Client for the REST side of the service (catalog, bootstrap, feedback, speech)
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionReply {
    text: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    emotion: Emotion,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: serde_json::Value,
}

impl ApiClient {
    /// Create a client for the service at `base_url` (http or https)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "server URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// WebSocket address of a conversation's session channel
    pub fn session_url(&self, conversation_id: u64) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/api/conversations/ws/{}", ws_base, conversation_id)
    }

    /// List the scenario catalog
    pub async fn list_scenarios(&self) -> Result<Vec<Scenario>> {
        self.get_json("/api/scenarios/").await
    }

    /// Fetch one scenario
    pub async fn get_scenario(&self, scenario_id: u64) -> Result<Scenario> {
        self.get_json(&format!("/api/scenarios/{}", scenario_id)).await
    }

    /// Start a new conversation for a scenario and user
    pub async fn start_conversation(&self, scenario_id: u64, user_id: u64) -> Result<ConversationInfo> {
        let body = StartConversation {
            scenario_id,
            user_id,
        };
        self.post_json("/api/conversations/start", &body).await
    }

    /// Ask the server to save conversation state for later
    pub async fn pause_conversation(&self, conversation_id: u64) -> Result<StatusReply> {
        self.post_empty(&format!("/api/conversations/pause/{}", conversation_id))
            .await
    }

    /// Resume a paused conversation
    pub async fn resume_conversation(&self, conversation_id: u64) -> Result<StatusReply> {
        self.post_empty(&format!("/api/conversations/resume/{}", conversation_id))
            .await
    }

    /// Fetch the feedback report for a conversation
    pub async fn feedback(&self, conversation_id: u64) -> Result<FeedbackReport> {
        let mut report: FeedbackReport = self
            .get_json(&format!("/api/conversations/{}/feedback", conversation_id))
            .await?;
        if report.conversation_id.is_none() {
            report.conversation_id = Some(conversation_id);
        }
        Ok(report)
    }

    /// Check whether the speech endpoints are configured
    pub async fn audio_health(&self) -> Result<AudioHealth> {
        self.get_json("/api/audio/health").await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        tracing::debug!("POST {}", path);
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!("POST {}", path);
        let response = self.client.post(self.url(path)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Turn any non-success status into `Error::Api`, preferring the service's `detail` message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorDetail>(&text) {
        Ok(ErrorDetail {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorDetail { detail }) => detail.to_string(),
        Err(_) if text.is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => text,
    };
    Err(Error::api(status.as_u16(), message))
}

#[async_trait]
impl SpeechService for ApiClient {
    async fn speech_to_text(&self, clip: AudioClip) -> Result<String> {
        let file_name = format!("recording.{}", clip.extension());
        let part = multipart::Part::bytes(clip.data)
            .file_name(file_name)
            .mime_str(&clip.mime_type)?;
        let form = multipart::Form::new().part("audio_file", part);

        tracing::debug!("POST /api/audio/speech-to-text");
        let response = self
            .client
            .post(self.url("/api/audio/speech-to-text"))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        let reply: TranscriptionReply = response.json().await?;
        Ok(reply.text)
    }

    async fn text_to_speech(&self, text: &str, emotion: Emotion) -> Result<AudioClip> {
        tracing::debug!("POST /api/audio/text-to-speech ({})", emotion);
        let response = self
            .client
            .post(self.url("/api/audio/text-to-speech"))
            .json(&SpeechRequest { text, emotion })
            .send()
            .await?;
        let response = check_status(response).await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_SPEECH_MIME)
            .to_string();
        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Err(Error::UnexpectedResponse(
                "text-to-speech returned no audio".to_string(),
            ));
        }
        Ok(AudioClip::new(data, mime_type))
    }
}
