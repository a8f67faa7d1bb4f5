//! Text-generation engine client.
//!
//! Speaks the OpenAI-compatible chat completions protocol, which is what a
//! local Ollama server exposes under its `/v1` prefix.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Configuration for the generation client.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Base URL of the OpenAI-compatible endpoint (Ollama needs the `/v1`
    /// prefix)
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.2:1b".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

impl GeneratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2:1b".to_string()),
            temperature: 0.7,
            timeout: Duration::from_secs(
                std::env::var("GENERATION_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Opaque text-generation engine.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one system+user prompt pair and return the raw completion text.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> EngineResult<String>;
}

/// Chat-completions client for Ollama (or any OpenAI-compatible server).
pub struct OllamaGenerator {
    http: Client,
    config: GeneratorConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OllamaGenerator {
    /// Create a new generation client.
    pub fn new(config: GeneratorConfig) -> EngineResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::RequestFailed(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> EngineResult<Self> {
        Self::new(GeneratorConfig::from_env())
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> EngineResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        debug!(url = %url, model = %self.config.model, "sending generation request");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::from_reqwest(e, self.config.timeout.as_secs()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(EngineError::NotFound(format!(
                "generation endpoint returned 404 for model {}",
                self.config.model
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::RequestFailed(format!(
                "generation endpoint returned {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::RequestFailed(format!("invalid response body: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(EngineError::EmptyResponse);
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator_for(server: &MockServer) -> OllamaGenerator {
        OllamaGenerator::new(GeneratorConfig {
            base_url: server.uri(),
            model: "llama3.2:1b".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(
                serde_json::json!({"model": "llama3.2:1b"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "a fine summary"}}]
            })))
            .mount(&server)
            .await;

        let text = generator_for(&server)
            .generate("system", "user")
            .await
            .unwrap();
        assert_eq!(text, "a fine summary");
    }

    #[tokio::test]
    async fn test_empty_content_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": ""}}]
            })))
            .mount(&server)
            .await;

        let err = generator_for(&server)
            .generate("system", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_not_found_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = generator_for(&server)
            .generate("system", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_typed() {
        let generator = OllamaGenerator::new(GeneratorConfig {
            base_url: "http://127.0.0.1:1/v1".to_string(),
            model: "llama3.2:1b".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = generator.generate("s", "u").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Connection(_) | EngineError::Timeout(_)
        ));
    }
}
