//! Core abstractions for conversational chat sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `Message` / `Role` - Immutable conversation entries
//! - `Attachment` / `ContentPart` - Multimodal request payloads
//! - `Transcript` - Ordered append-only conversation history
//! - `ChatModel` / `ModelChat` - Remote model endpoint traits

pub mod message;
pub mod traits;
pub mod transcript;

pub use message::{Attachment, AttachmentError, ContentPart, Message, Role};
pub use traits::{ChatModel, ModelChat, ModelError};
pub use transcript::Transcript;
