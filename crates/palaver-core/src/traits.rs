//! Traits abstracting the remote model endpoint.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::ContentPart;

/// Remote model error.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// A hosted model endpoint.
///
/// Implementations make exactly one outbound call per invocation;
/// retries and backoff are the caller's problem, and no caller here has one.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Single stateless completion over the given content parts.
    async fn generate(&self, parts: &[ContentPart]) -> Result<String, ModelError>;

    /// Open a stateful chat with the model.
    async fn start_chat(&self) -> Result<Box<dyn ModelChat>, ModelError>;
}

/// Handle to stateful conversational context with the model.
///
/// Each handle carries a fresh identity so callers can tell a recreated
/// chat apart from the one it replaced.
#[async_trait]
pub trait ModelChat: Send {
    /// Unique identity of this handle.
    fn id(&self) -> Uuid;

    /// Send one user turn and return the assistant reply.
    ///
    /// On failure the handle's context must be left exactly as it was
    /// before the call.
    async fn send(&mut self, text: &str) -> Result<String, ModelError>;
}
