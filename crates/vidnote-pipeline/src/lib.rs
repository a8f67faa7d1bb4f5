//! The vidnote processing pipeline.
//!
//! One pipeline run takes a submitted item from `queued` through download,
//! transcription, summarization and categorization to a terminal state,
//! persisting every transition and broadcasting progress to subscribers.
//! Runs are independent tokio tasks; nothing here caps how many execute at
//! once.

pub mod categorize;
pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;
pub mod summarize;
pub mod transcribe;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::{PipelineError, PipelineResult, TranscribeError};
pub use progress::{ProgressEvent, TaskRegistry};
pub use runner::{spawn_run, submit, Submission};
pub use transcribe::Transcriber;
