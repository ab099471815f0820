//! Wire protocol for frontend-session communication.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use palaver_core::{Attachment, AttachmentError, Message};
use serde::{Deserialize, Serialize};

/// Message from frontend to session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// One user prompt, optionally with an image.
    Prompt {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attachment: Option<WireAttachment>,
    },
    /// Clear the conversation history.
    Clear,
    /// Ping for keepalive.
    Ping,
}

/// Message from session to frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full ordered history, sent once when the session opens.
    History { messages: Vec<Message> },
    /// One completed turn.
    Turn { user: Message, assistant: Message },
    /// History was cleared.
    Cleared,
    /// A turn failed; the history is unchanged.
    Error { message: String },
    /// Pong response.
    Pong,
}

/// Wire decoding error.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("attachment payload is not valid base64")]
    InvalidBase64,
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}

/// Image attachment as it crosses the wire (base64 encoded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireAttachment {
    pub mime_type: String,
    pub data: String,
}

impl WireAttachment {
    /// Encode an attachment for the wire.
    #[must_use]
    pub fn encode(attachment: &Attachment) -> Self {
        Self {
            mime_type: attachment.mime_type().to_string(),
            data: BASE64.encode(attachment.data()),
        }
    }

    /// Decode back into a validated attachment.
    ///
    /// # Errors
    /// Fails on invalid base64 or an unsupported MIME type.
    pub fn decode(&self) -> Result<Attachment, WireError> {
        let bytes = BASE64
            .decode(&self.data)
            .map_err(|_| WireError::InvalidBase64)?;
        Ok(Attachment::new(self.mime_type.clone(), bytes)?)
    }
}
