pub mod gemini;
pub mod http_prompt;

pub use gemini::GeminiClient;
pub use http_prompt::HttpPromptClient;

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::{AiError, ConfigError};
use crate::provider::Provider;

pub const NO_RESPONSE: &str = "No response was generated.";
pub const BAD_RESPONSE: &str = "Error obtaining AI response.";
pub const NOT_LOADED: &str = "Error: the AI client is not loaded.";

/// User-facing text for a failed request.
pub fn request_failed(message: impl std::fmt::Display) -> String {
    format!("Error processing your request: {}", message)
}

/// A remote model that turns one prompt into one answer.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

/// Wraps a [`ChatBackend`] so that every outcome is a displayable string.
///
/// Calls are bounded by a deadline; expiry becomes a timeout message rather
/// than a hang.
#[derive(Clone)]
pub struct AiClient {
    backend: Arc<dyn ChatBackend>,
    timeout: Duration,
}

impl AiClient {
    pub fn new(backend: Arc<dyn ChatBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Build the HTTP client once and hand it to the configured backend.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(concat!("orbitia/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let backend: Arc<dyn ChatBackend> = match settings.provider {
            Provider::Gemini => Arc::new(GeminiClient::new(
                client,
                &settings.gemini_base_url,
                &settings.model,
                settings.api_key.clone(),
                settings.generation.clone(),
            )),
            Provider::Http => Arc::new(HttpPromptClient::new(
                client,
                &settings.endpoint,
                settings.api_key.clone(),
            )),
        };

        Ok(Self::new(backend, settings.request_timeout))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn ask(&self, input: &str) -> String {
        let outcome = match tokio::time::timeout(self.timeout, self.backend.complete(input)).await {
            Ok(result) => result,
            Err(_) => Err(AiError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(text) => text,
            Err(e) => self.describe(e),
        }
    }

    /// Like [`ask`](Self::ask), but returns `None` if `cancel` fires first.
    pub async fn ask_cancellable(&self, input: &str, cancel: &CancellationToken) -> Option<String> {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("{} request cancelled", self.backend.name());
                None
            }
            answer = self.ask(input) => Some(answer),
        }
    }

    fn describe(&self, err: AiError) -> String {
        match err {
            AiError::NoResponse { .. } => {
                warn!("{}", err);
                NO_RESPONSE.to_string()
            }
            AiError::MalformedResponse { .. } => {
                warn!("{}", err);
                BAD_RESPONSE.to_string()
            }
            AiError::Transport { .. } | AiError::Status { .. } | AiError::Timeout(_) => {
                error!("{} API error: {}", self.backend.name(), err);
                request_failed(err)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that answers from a closure after an optional delay.
    pub struct FakeBackend<F> {
        pub delay: Duration,
        pub respond: F,
        pub calls: AtomicUsize,
    }

    impl<F> FakeBackend<F>
    where
        F: Fn(&str) -> Result<String, AiError> + Send + Sync,
    {
        pub fn new(respond: F) -> Self {
            Self {
                delay: Duration::ZERO,
                respond,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl<F> ChatBackend for FakeBackend<F>
    where
        F: Fn(&str) -> Result<String, AiError> + Send + Sync,
    {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn complete(&self, prompt: &str) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.respond)(prompt)
        }
    }

    fn client<F>(backend: FakeBackend<F>) -> AiClient
    where
        F: Fn(&str) -> Result<String, AiError> + Send + Sync + 'static,
    {
        AiClient::new(Arc::new(backend), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_answer_is_passed_through() {
        let ai = client(FakeBackend::new(|p| Ok(format!("echo: {}", p))));
        assert_eq!(ai.ask("hello").await, "echo: hello");
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_message() {
        let ai = client(FakeBackend::new(|_| Err(AiError::transport("fake", "timeout"))));
        let answer = ai.ask("hello").await;
        assert!(answer.starts_with("Error processing your request: "));
        assert!(answer.contains("timeout"));
    }

    #[tokio::test]
    async fn test_status_error_surfaces_body() {
        let ai = client(FakeBackend::new(|_| {
            Err(AiError::Status {
                provider: "fake".to_string(),
                status: 401,
                body: "API key not valid".to_string(),
            })
        }));
        let answer = ai.ask("hello").await;
        assert!(answer.contains("401"));
        assert!(answer.contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_malformed_and_empty_use_fallbacks() {
        let ai = client(FakeBackend::new(|_| Err(AiError::malformed("fake", "no field"))));
        assert_eq!(ai.ask("x").await, BAD_RESPONSE);

        let ai = client(FakeBackend::new(|_| {
            Err(AiError::NoResponse {
                provider: "fake".to_string(),
            })
        }));
        assert_eq!(ai.ask("x").await, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_deadline_produces_timeout_message() {
        let backend = FakeBackend::new(|_| Ok("late".to_string())).with_delay(Duration::from_secs(10));
        let ai = AiClient::new(Arc::new(backend), Duration::from_millis(50));

        let answer = ai.ask("hello").await;
        assert!(answer.contains("timeout"), "got {answer:?}");
    }

    #[tokio::test]
    async fn test_cancellation_yields_none() {
        let backend = FakeBackend::new(|_| Ok("late".to_string())).with_delay(Duration::from_secs(10));
        let ai = client(backend);
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(ai.ask_cancellable("hello", &token).await, None);
    }

    #[tokio::test]
    async fn test_uncancelled_request_completes() {
        let ai = client(FakeBackend::new(|_| Ok("done".to_string())));
        let token = CancellationToken::new();
        assert_eq!(ai.ask_cancellable("hello", &token).await.as_deref(), Some("done"));
    }
}
