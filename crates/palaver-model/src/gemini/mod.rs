//! Gemini `generateContent` client and wire types.

pub mod client;
pub mod wire;

pub use client::{GeminiChat, GeminiClient};
