use serde::{Deserialize, Serialize};

/// Which remote strategy answers chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Gemini chat session with a fixed generation config.
    #[default]
    Gemini,
    /// Plain `{"prompt": ..}` POST with a bearer token.
    Http,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Http => "http",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "http" => Some(Provider::Http),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Http => "HTTP endpoint",
        }
    }
}
