use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ChatBackend;
use crate::config::{ApiKey, GenerationConfig};
use crate::error::AiError;

const PROVIDER: &str = "Gemini";

#[derive(Serialize, Clone, Debug, PartialEq)]
struct Part {
    text: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    generation_config: &'a GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all parts joined.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini `generateContent` client that opens a fresh chat session per call.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: ApiKey,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn new(
        client: Client,
        base_url: &str,
        model: &str,
        api_key: ApiKey,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            generation,
        }
    }

    pub fn start_chat(&self) -> ChatSession<'_> {
        ChatSession {
            client: self,
            history: Vec::new(),
        }
    }

    async fn generate(&self, contents: &[Content]) -> Result<String, AiError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let request = GenerateContentRequest {
            contents,
            generation_config: &self.generation,
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::transport(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                provider: PROVIDER.to_string(),
                status,
                body,
            });
        }

        // An unreadable body is a failed call, not a missing answer
        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AiError::transport(PROVIDER, e))?;

        body.text().ok_or_else(|| AiError::NoResponse {
            provider: PROVIDER.to_string(),
        })
    }
}

/// One conversation. History starts empty and is dropped with the session.
pub struct ChatSession<'a> {
    client: &'a GeminiClient,
    history: Vec<Content>,
}

impl ChatSession<'_> {
    pub async fn send_message(&mut self, text: &str) -> Result<String, AiError> {
        self.history.push(Content {
            role: "user",
            parts: vec![Part {
                text: text.to_string(),
            }],
        });

        let reply = self.client.generate(&self.history).await?;
        self.history.push(Content {
            role: "model",
            parts: vec![Part {
                text: reply.clone(),
            }],
        });
        Ok(reply)
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        self.start_chat().send_message(prompt).await
    }
}
