//! External media plumbing: yt-dlp fetching, ffprobe/ffmpeg audio checks.

pub mod audio;
pub mod error;
pub mod fetch;
pub mod fs_utils;
pub mod key;

pub use audio::{AudioValidator, AudioVerdict, FfprobeValidator};
pub use error::{MediaError, MediaResult};
pub use fetch::{MediaFetcher, YtDlpFetcher};
pub use fs_utils::move_file;
pub use key::media_key;
