//! Credential and endpoint configuration.

use thiserror::Error;

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Endpoint used when `GEMINI_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration error. Fatal at startup: nothing may call the remote
/// endpoint without a credential.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY environment variable is not set")]
    MissingApiKey,
}

/// Resolved remote-model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Static API credential.
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// API base URL without a trailing slash.
    pub base_url: String,
}

impl ModelConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingApiKey` if `GEMINI_API_KEY` is unset
    /// or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an injected variable lookup.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingApiKey` if the lookup yields no usable
    /// `GEMINI_API_KEY`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let model = lookup("GEMINI_MODEL")
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = lookup("GEMINI_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}
