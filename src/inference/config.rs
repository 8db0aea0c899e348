//! Model endpoint configuration.
//!
//! The `model` section of the assistant config. Values arrive already
//! env-interpolated by [`crate::config::load_config`]; this module only adds
//! defaults and API key resolution.

use serde::Deserialize;

use super::errors::InferenceError;

// ─── Defaults ────────────────────────────────────────────────────────────────

/// Model used when the config does not name one.
pub const DEFAULT_MODEL_NAME: &str = "gemini-2.5-flash";

/// Public Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Env vars consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

// ─── ModelConfig ─────────────────────────────────────────────────────────────

/// Runtime configuration for the hosted model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Explicit key. Empty or absent falls back to the environment.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ModelConfig {
    /// Resolve the API key: the configured value if non-empty, else the first
    /// non-empty env var from [`API_KEY_ENV_VARS`].
    pub fn resolve_api_key(&self) -> Result<String, InferenceError> {
        if let Some(key) = self.api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
            .ok_or_else(|| InferenceError::ConfigError {
                reason: format!(
                    "no API key configured: set {} or {}",
                    API_KEY_ENV_VARS[0], API_KEY_ENV_VARS[1]
                ),
            })
    }

    /// Full `generateContent` URL for the configured model.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model_name
        )
    }
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

// ─── Tests ───────────────────────────────────────────────────────────────────
