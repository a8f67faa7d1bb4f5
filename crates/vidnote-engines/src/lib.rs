//! HTTP clients for the opaque inference collaborators: a local
//! speech-to-text sidecar and an OpenAI-compatible text-generation server.

pub mod error;
pub mod generate;
pub mod speech;

pub use error::{EngineError, EngineResult};
pub use generate::{GeneratorConfig, OllamaGenerator, TextGenerator};
pub use speech::{HttpSpeechEngine, SpeechConfig, SpeechEngine};
