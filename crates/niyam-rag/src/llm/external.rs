//! OpenAI-compatible chat-completions client.
//!
//! Works against OpenAI, Ollama, and any endpoint speaking the same wire
//! format. Generation is best-effort: callers degrade to excerpt-only
//! answers when this collaborator is unavailable.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::llm::Generator;

pub struct ExternalGenerator {
    client: Client,
    config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ExternalGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(config.timeout_secs))
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Parse a response body as JSON, returning a clear error if the server
    /// returned HTML (reverse proxies do this when the backend is down).
    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", endpoint, e))?;
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(anyhow!(
                "Endpoint {} returned HTML instead of JSON (HTTP {}): {}",
                endpoint,
                status,
                preview
            ));
        }
        serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            anyhow!(
                "Failed to parse JSON from {} (HTTP {}): {}. Body: {}",
                endpoint,
                status,
                e,
                preview
            )
        })
    }
}

#[async_trait]
impl Generator for ExternalGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = json!({
            "model": self.config.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": false
        });

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow!("Request to {} timed out", self.config.endpoint)
            } else if e.is_connect() {
                anyhow!("Failed to connect to {}: {}", self.config.endpoint, e)
            } else {
                anyhow!("Request to {} failed: {}", self.config.endpoint, e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(anyhow!("Generation API error ({}): {}", status, error));
        }

        let result: ChatResponse =
            Self::parse_json_response(response, &self.config.endpoint).await?;
        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("Generation API returned empty choices array"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_deserializes() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"[A] says so."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "[A] says so.");
    }

    #[test]
    fn test_empty_choices_deserializes() {
        let body = r#"{"choices":[]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
