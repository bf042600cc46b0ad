use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::ChatBackend;
use crate::config::ApiKey;
use crate::error::AiError;

const PROVIDER: &str = "HTTP endpoint";

#[derive(Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

/// Raw POST of `{"prompt": ..}` to a fixed endpoint; answer in `generatedText`.
#[derive(Clone)]
pub struct HttpPromptClient {
    client: Client,
    endpoint: String,
    api_key: ApiKey,
}

impl HttpPromptClient {
    pub fn new(client: Client, endpoint: &str, api_key: ApiKey) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        }
    }

    pub async fn query(&self, prompt: &str) -> Result<String, AiError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&PromptRequest { prompt })
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

        let body: Value = response
            .json()
            .await
            .map_err(|e| AiError::malformed(PROVIDER, e))?;

        generated_text(&body)
            .map(str::to_string)
            .ok_or_else(|| AiError::malformed(PROVIDER, "missing string field generatedText"))
    }
}

fn generated_text(body: &Value) -> Option<&str> {
    body.get("generatedText").and_then(Value::as_str)
}

#[async_trait]
impl ChatBackend for HttpPromptClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        self.query(prompt).await
    }
}
