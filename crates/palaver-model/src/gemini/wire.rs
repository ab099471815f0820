//! Request and response shapes of the `generateContent` REST surface.

use palaver_core::ContentPart;
use serde::{Deserialize, Serialize};

/// One conversation turn as the API expects it.
///
/// The API's role vocabulary is `user` / `model`, not ours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    /// Build a user turn from request parts.
    #[must_use]
    pub fn user(parts: &[ContentPart]) -> Self {
        Self {
            role: "user".to_string(),
            parts: parts.iter().map(Part::from_content_part).collect(),
        }
    }

    /// Build a model turn holding a single text part.
    #[must_use]
    pub fn model_text<S: Into<String>>(text: S) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// One part of a turn: `{"text": ...}` or `{"inlineData": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(Blob),
}

impl Part {
    fn from_content_part(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => Self::Text(text.clone()),
            ContentPart::InlineImage { mime_type, data } => Self::InlineData(Blob {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
        }
    }
}

/// Base64 image payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest<'a> {
    pub contents: &'a [Content],
}

/// Response body. Parsed leniently: the API decorates parts with fields
/// we have no use for.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    #[must_use]
    pub fn reply_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Error envelope the API returns on non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
}
