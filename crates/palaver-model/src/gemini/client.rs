//! Gemini client implementing the chat model traits.

use async_trait::async_trait;
use palaver_core::{ChatModel, ContentPart, ModelChat, ModelError};
use uuid::Uuid;

use crate::config::ModelConfig;

use super::wire::{ApiErrorBody, Content, GenerateContentRequest, GenerateContentResponse};

/// Client for the `generateContent` REST surface.
///
/// One outbound call per turn, no retries. Cloning is cheap; clones share
/// the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl GeminiClient {
    /// Create a client from resolved configuration.
    #[must_use]
    pub fn new(config: ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client from the process environment.
    ///
    /// # Errors
    /// Returns a configuration error if the credential is missing; callers
    /// must treat that as fatal before any remote call is attempted.
    pub fn from_env() -> Result<Self, crate::ConfigError> {
        Ok(Self::new(ModelConfig::from_env()?))
    }

    /// Name of the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate_content(&self, contents: &[Content]) -> Result<String, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        tracing::debug!(model = %self.config.model, turns = contents.len(), "calling generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&GenerateContentRequest { contents })
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map_or(body, |envelope| envelope.error.message);
            tracing::warn!(status = status.as_u16(), "generateContent failed");
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;

        parsed
            .reply_text()
            .ok_or_else(|| ModelError::MalformedResponse("no text in first candidate".to_string()))
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::Transport(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ModelError::Transport(format!("connection failed: {e}"))
    } else {
        ModelError::Transport(format!("network error: {e}"))
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(&self, parts: &[ContentPart]) -> Result<String, ModelError> {
        let contents = [Content::user(parts)];
        self.generate_content(&contents).await
    }

    async fn start_chat(&self) -> Result<Box<dyn ModelChat>, ModelError> {
        Ok(Box::new(GeminiChat::new(self.clone())))
    }
}

/// Stateful chat over the stateless REST surface.
///
/// The REST API has no server-side session object, so the handle mirrors
/// the conversational context and replays it on every send — the same
/// bookkeeping the official SDK's chat object does.
pub struct GeminiChat {
    id: Uuid,
    client: GeminiClient,
    contents: Vec<Content>,
}

impl GeminiChat {
    fn new(client: GeminiClient) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(chat = %id, model = client.model(), "opened model chat");
        Self {
            id,
            client,
            contents: Vec::new(),
        }
    }
}

#[async_trait]
impl ModelChat for GeminiChat {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn send(&mut self, text: &str) -> Result<String, ModelError> {
        self.contents.push(Content::user(&[ContentPart::text(text)]));

        match self.client.generate_content(&self.contents).await {
            Ok(reply) => {
                self.contents.push(Content::model_text(&reply));
                Ok(reply)
            }
            Err(e) => {
                // Roll back the user turn: a failed send must not leave
                // context the visible history never saw.
                self.contents.pop();
                Err(e)
            }
        }
    }
}
