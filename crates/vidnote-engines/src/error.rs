//! Engine client error types.
//!
//! Every fault an engine backend can produce is a distinct variant so that
//! callers classify by type switch, never by message text. The summarizer
//! and categorizer map these onto their fixed fallback values; the
//! transcription stage keys its repair/retry policy off `MalformedAudio`.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Endpoint or model not found (HTTP 404)
    #[error("Endpoint not found: {0}")]
    NotFound(String),

    /// Could not reach the backend at all
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Backend did not answer within the configured budget
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Backend answered but produced no usable text
    #[error("Engine returned empty response")]
    EmptyResponse,

    /// Transcription engine rejected the audio as corrupt or mis-shaped
    #[error("Malformed audio: {0}")]
    MalformedAudio(String),

    /// Caller supplied input the engine cannot work with
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any other non-success response
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Classify a transport-level reqwest error.
    pub fn from_reqwest(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            EngineError::Timeout(timeout_secs)
        } else if e.is_connect() {
            EngineError::Connection(e.to_string())
        } else {
            EngineError::RequestFailed(e.to_string())
        }
    }

    /// Whether a retry could plausibly succeed. Content-level faults
    /// (malformed audio, empty output, bad input) are not transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Connection(_) | EngineError::Timeout(_) | EngineError::RequestFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(EngineError::Connection("refused".into()).is_retryable());
        assert!(EngineError::Timeout(60).is_retryable());
        assert!(!EngineError::MalformedAudio("shape".into()).is_retryable());
        assert!(!EngineError::EmptyResponse.is_retryable());
        assert!(!EngineError::NotFound("404".into()).is_retryable());
    }
}
