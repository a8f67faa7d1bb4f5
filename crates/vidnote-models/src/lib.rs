//! Shared data models for the vidnote backend.

pub mod category;
pub mod event;
pub mod item;
pub mod media;

pub use category::{CategoryId, CategoryRecord};
pub use event::{ItemProgress, ProgressSnapshot, WsMessage};
pub use item::{step, ItemId, ItemRecord, ItemStatus};
pub use media::{FetchMetadata, TranscriptSegment, Transcription};
