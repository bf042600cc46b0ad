use std::time::Duration;

use thiserror::Error;

/// Failures inside a [`ChatBackend`](crate::ai::ChatBackend) call.
///
/// These never reach the chat panel as errors; [`AiClient`](crate::ai::AiClient)
/// turns each of them into a user-facing string.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("{provider} request failed: {details}")]
    Transport { provider: String, details: String },

    #[error("{provider} API error {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("request timeout after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{provider} returned a malformed response: {details}")]
    MalformedResponse { provider: String, details: String },

    #[error("{provider} returned no text")]
    NoResponse { provider: String },
}

impl AiError {
    pub fn transport(provider: &str, err: impl std::fmt::Display) -> Self {
        AiError::Transport {
            provider: provider.to_string(),
            details: err.to_string(),
        }
    }

    pub fn malformed(provider: &str, err: impl std::fmt::Display) -> Self {
        AiError::MalformedResponse {
            provider: provider.to_string(),
            details: err.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no API key configured: set ORBITIA_API_KEY or GEMINI_API_KEY, or add \"api_key\" to {0}")]
    MissingCredential(String),

    #[error("invalid endpoint {0:?}: expected an http:// or https:// URL")]
    InvalidEndpoint(String),

    #[error("unknown provider {0:?}: expected \"gemini\" or \"http\"")]
    UnknownProvider(String),

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("could not build HTTP client: {0}")]
    HttpClient(String),
}
