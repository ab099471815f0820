//! Conversation messages and multimodal request payloads.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The person typing prompts.
    User,
    /// The remote model.
    Assistant,
}

/// One entry in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored this message.
    pub role: Role,
    /// The message text.
    pub text: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Attachment error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("unsupported attachment type: {0}")]
    UnsupportedMimeType(String),
    #[error("attachment is empty")]
    Empty,
}

/// MIME types the upload surface accepts.
const SUPPORTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// An image attached to a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    mime_type: String,
    data: Vec<u8>,
}

impl Attachment {
    /// Create an attachment, validating the declared MIME type.
    ///
    /// # Errors
    /// Returns an error for anything other than a non-empty PNG or JPEG.
    pub fn new<S: Into<String>>(mime_type: S, data: Vec<u8>) -> Result<Self, AttachmentError> {
        let mime_type = mime_type.into();
        if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(AttachmentError::UnsupportedMimeType(mime_type));
        }
        if data.is_empty() {
            return Err(AttachmentError::Empty);
        }
        Ok(Self { mime_type, data })
    }

    /// The declared MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The raw image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Convert into an inline-image request part (base64 encoded).
    #[must_use]
    pub fn into_part(self) -> ContentPart {
        ContentPart::InlineImage {
            mime_type: self.mime_type,
            data: BASE64.encode(&self.data),
        }
    }
}

/// One unit of a request to the remote model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain prompt text.
    Text(String),
    /// Base64-encoded inline image with its MIME type.
    InlineImage { mime_type: String, data: String },
}

impl ContentPart {
    /// Create a text part.
    #[must_use]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::Text(text.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert!(json.contains(r#""role":"user""#));

        let json = serde_json::to_string(&Message::assistant("hello")).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
    }

    #[test]
    fn test_attachment_accepts_png_and_jpeg() {
        assert!(Attachment::new("image/png", vec![1, 2, 3]).is_ok());
        assert!(Attachment::new("image/jpeg", vec![1, 2, 3]).is_ok());
    }

    #[test]
    fn test_attachment_rejects_other_types() {
        let err = Attachment::new("image/gif", vec![1]).unwrap_err();
        assert_eq!(
            err,
            AttachmentError::UnsupportedMimeType("image/gif".to_string())
        );
    }

    #[test]
    fn test_attachment_rejects_empty_payload() {
        let err = Attachment::new("image/png", vec![]).unwrap_err();
        assert_eq!(err, AttachmentError::Empty);
    }

    #[test]
    fn test_attachment_into_part_encodes_base64() {
        let attachment = Attachment::new("image/png", b"raw bytes".to_vec()).unwrap();
        let ContentPart::InlineImage { mime_type, data } = attachment.into_part() else {
            panic!("expected inline image part");
        };
        assert_eq!(mime_type, "image/png");
        assert_eq!(BASE64.decode(data).unwrap(), b"raw bytes");
    }
}
