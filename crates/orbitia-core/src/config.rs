use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::provider::Provider;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://api.gemini.com/ai-endpoint";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variables checked for the credential, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["ORBITIA_API_KEY", "GEMINI_API_KEY"];

/// Sampling parameters sent with every Gemini call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// On-disk configuration, `~/.config/orbitia/config.json`.
///
/// Every field is optional in the file; missing ones take their defaults.
/// Use [`Config::validate`] to obtain a [`Settings`] that is safe to build
/// clients from.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub gemini_base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub generation: GenerationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Gemini.as_str().to_string()),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            api_key: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            generation: GenerationConfig::default(),
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("orbitia").join("config.json"))
    }

    /// Validate against the process environment.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let env_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty());
        self.validate_with(env_key)
    }

    /// Validate with an explicit environment credential.
    ///
    /// The environment key wins over the file. Blank values count as absent,
    /// so an empty token is never sent.
    pub fn validate_with(&self, env_key: Option<String>) -> Result<Settings, ConfigError> {
        let provider = match self.provider.as_deref() {
            None => Provider::default(),
            Some(name) => {
                Provider::from_str(name).ok_or_else(|| ConfigError::UnknownProvider(name.to_string()))?
            }
        };

        let api_key = env_key
            .into_iter()
            .chain(self.api_key.clone())
            .find_map(|key| ApiKey::new(&key))
            .ok_or_else(|| {
                let location = Self::get_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.json".to_string());
                ConfigError::MissingCredential(location)
            })?;

        let endpoint = match provider {
            Provider::Http => &self.endpoint,
            Provider::Gemini => &self.gemini_base_url,
        };
        if !is_http_url(endpoint) {
            return Err(ConfigError::InvalidEndpoint(endpoint.clone()));
        }

        Ok(Settings {
            provider,
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            gemini_base_url: self.gemini_base_url.trim_end_matches('/').to_string(),
            api_key,
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            generation: self.generation.clone(),
        })
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}

/// A non-blank credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub model: String,
    pub endpoint: String,
    pub gemini_base_url: String,
    pub api_key: ApiKey,
    pub request_timeout: Duration,
    pub generation: GenerationConfig,
}
