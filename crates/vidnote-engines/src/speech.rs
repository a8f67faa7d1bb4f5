//! Speech-to-text engine client.
//!
//! Talks to a local transcription sidecar over HTTP. The sidecar and this
//! process share a filesystem, so requests carry the audio path rather than
//! the audio bytes. Error bodies are structured; a `malformed_audio` code
//! maps to the typed fault that drives the mono-repair path upstream.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use vidnote_models::Transcription;

use crate::error::{EngineError, EngineResult};

/// Configuration for the speech engine client.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Base URL of the transcription sidecar
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            // Transcription of long audio is slow
            timeout: Duration::from_secs(600),
        }
    }
}

impl SpeechConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SPEECH_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            timeout: Duration::from_secs(
                std::env::var("SPEECH_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// Opaque speech-to-text engine.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Transcribe the audio file at `path`.
    async fn transcribe(&self, path: &Path) -> EngineResult<Transcription>;
}

/// HTTP client for the transcription sidecar.
pub struct HttpSpeechEngine {
    http: Client,
    config: SpeechConfig,
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    audio_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    error: EngineErrorDetail,
}

#[derive(Debug, Deserialize)]
struct EngineErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl HttpSpeechEngine {
    /// Create a new client.
    pub fn new(config: SpeechConfig) -> EngineResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::RequestFailed(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> EngineResult<Self> {
        Self::new(SpeechConfig::from_env())
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout.as_secs()
    }
}

#[async_trait]
impl SpeechEngine for HttpSpeechEngine {
    async fn transcribe(&self, path: &Path) -> EngineResult<Transcription> {
        let url = format!("{}/transcribe", self.config.base_url);
        let audio_path = path.to_string_lossy();

        debug!(url = %url, audio = %audio_path, "sending transcription request");

        let response = self
            .http
            .post(&url)
            .json(&TranscribeRequest {
                audio_path: audio_path.as_ref(),
            })
            .send()
            .await
            .map_err(|e| EngineError::from_reqwest(e, self.timeout_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let transcription: Transcription = response
            .json()
            .await
            .map_err(|e| EngineError::RequestFailed(format!("invalid response body: {}", e)))?;

        info!(
            chars = transcription.text.len(),
            language = %transcription.language,
            "transcription response received"
        );

        Ok(transcription)
    }
}

/// Map a non-success response to a typed fault.
fn classify_failure(status: StatusCode, body: &str) -> EngineError {
    if let Ok(parsed) = serde_json::from_str::<EngineErrorBody>(body) {
        if parsed.error.code == "malformed_audio" {
            return EngineError::MalformedAudio(parsed.error.message);
        }
        if status == StatusCode::NOT_FOUND {
            return EngineError::NotFound(parsed.error.message);
        }
        return EngineError::RequestFailed(format!(
            "transcription service returned {}: {}",
            status, parsed.error.message
        ));
    }

    if status == StatusCode::NOT_FOUND {
        return EngineError::NotFound(format!("transcription service returned {}", status));
    }

    EngineError::RequestFailed(format!(
        "transcription service returned {}: {}",
        status, body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_for(server: &MockServer) -> HttpSpeechEngine {
        HttpSpeechEngine::new(SpeechConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .and(body_partial_json(
                serde_json::json!({"audio_path": "/data/downloads/abc.mp3"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "hello world",
                "segments": [{"start": 0.0, "end": 1.2, "text": "hello world"}],
                "language": "en"
            })))
            .mount(&server)
            .await;

        let result = engine_for(&server)
            .transcribe(Path::new("/data/downloads/abc.mp3"))
            .await
            .unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.language, "en");
        assert_eq!(result.segments.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_audio_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "error": {"code": "malformed_audio", "message": "channel shape mismatch"}
            })))
            .mount(&server)
            .await;

        let err = engine_for(&server)
            .transcribe(Path::new("/data/downloads/abc.mp3"))
            .await
            .unwrap_err();
        match err {
            EngineError::MalformedAudio(msg) => assert!(msg.contains("shape")),
            other => panic!("expected MalformedAudio, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = engine_for(&server)
            .transcribe(Path::new("/a.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_typed() {
        let engine = HttpSpeechEngine::new(SpeechConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = engine.transcribe(Path::new("/a.mp3")).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Connection(_) | EngineError::Timeout(_)
        ));
    }
}
