//! Audio validation and mono-repair via ffprobe/ffmpeg.
//!
//! `validate` never returns an error: every failure mode collapses into a
//! verdict with a distinct reason string, because those reasons are part of
//! the user-visible error taxonomy. `repair_mono` likewise downgrades every
//! failure to `false`.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::fs_utils::move_file;

/// Budget for a single ffprobe invocation.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Budget for the mono re-encode.
const REPAIR_TIMEOUT: Duration = Duration::from_secs(60);

/// Minimum plausible audio file size.
const MIN_AUDIO_BYTES: u64 = 1024;

/// Duration bounds for transcription, in seconds.
const MIN_DURATION_SECS: f64 = 1.0;
const MAX_DURATION_SECS: f64 = 7200.0;

/// Outcome of an audio validation pass.
#[derive(Debug, Clone)]
pub struct AudioVerdict {
    pub ok: bool,
    pub reason: String,
}

impl AudioVerdict {
    fn pass(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            reason: reason.into(),
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Structural audio checks and the mono-downmix repair.
#[async_trait]
pub trait AudioValidator: Send + Sync {
    /// Check that the file at `path` is transcribable audio.
    async fn validate(&self, path: &Path) -> AudioVerdict;

    /// Re-encode the file in place to a single channel. Returns whether the
    /// re-encode succeeded (or was unnecessary). Never fails hard.
    async fn repair_mono(&self, path: &Path) -> bool;
}

/// ffprobe/ffmpeg-backed validator.
#[derive(Debug, Clone, Default)]
pub struct FfprobeValidator;

impl FfprobeValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioValidator for FfprobeValidator {
    async fn validate(&self, path: &Path) -> AudioVerdict {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => return AudioVerdict::fail("Audio file does not exist"),
        };

        if let Some(reason) = size_reason(size) {
            return AudioVerdict::fail(reason);
        }

        if which::which("ffprobe").is_err() {
            return AudioVerdict::fail("ffprobe not found in PATH");
        }

        // Duration probe
        let output = match run_probe(
            &[
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ],
            path,
        )
        .await
        {
            ProbeOutcome::Done(output) => output,
            ProbeOutcome::TimedOut => return AudioVerdict::fail("Audio validation timeout"),
            ProbeOutcome::SpawnFailed(e) => {
                warn!(error = %e, "ffprobe failed to start");
                return AudioVerdict::fail("Invalid audio file (ffprobe failed)");
            }
        };

        if !output.status.success() {
            return AudioVerdict::fail("Invalid audio file (ffprobe failed)");
        }

        let duration_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if duration_str.is_empty() {
            return AudioVerdict::fail("Unable to read audio duration");
        }

        let duration: f64 = match duration_str.parse() {
            Ok(d) => d,
            Err(_) => return AudioVerdict::fail("Invalid audio duration format"),
        };

        if let Some(reason) = duration_reason(duration) {
            return AudioVerdict::fail(reason);
        }

        // Audio stream presence probe
        let output = match run_probe(
            &[
                "-v",
                "error",
                "-select_streams",
                "a:0",
                "-show_entries",
                "stream=codec_type,codec_name",
                "-of",
                "json",
            ],
            path,
        )
        .await
        {
            ProbeOutcome::Done(output) => output,
            ProbeOutcome::TimedOut => return AudioVerdict::fail("Audio validation timeout"),
            ProbeOutcome::SpawnFailed(_) => {
                return AudioVerdict::fail("Invalid audio stream - may be corrupted or silent")
            }
        };

        if !output.status.success() || !has_audio_stream(&output.stdout) {
            return AudioVerdict::fail("Invalid audio stream - may be corrupted or silent");
        }

        AudioVerdict::pass(format!("Audio file valid, duration: {:.1}s", duration))
    }

    async fn repair_mono(&self, path: &Path) -> bool {
        debug!(path = %path.display(), "checking channel layout before mono repair");

        match probe_channels(path).await {
            // Already single-channel, or an indeterminate count we cannot
            // improve on: nothing to re-encode.
            Some(channels) if channels == "1" || channels == "0" || channels == "unknown" => {
                debug!("audio already mono or channel count indeterminate");
                true
            }
            Some(channels) => {
                debug!(channels = %channels, "re-encoding to mono");
                reencode_mono(path).await
            }
            // Channel info unavailable: attempt the re-encode unconditionally
            // and report its outcome.
            None => {
                debug!("channel info unavailable, attempting mono re-encode anyway");
                reencode_mono(path).await
            }
        }
    }
}

/// First-failure reason for a file size, if any.
fn size_reason(size: u64) -> Option<String> {
    if size < MIN_AUDIO_BYTES {
        Some(format!(
            "Audio file too small ({} bytes) - video may be silent or have no audio track",
            size
        ))
    } else {
        None
    }
}

/// First-failure reason for a duration, if any.
fn duration_reason(duration: f64) -> Option<String> {
    if duration < MIN_DURATION_SECS {
        Some(format!(
            "Audio too short for transcription ({:.1}s) - minimum: 1 second",
            duration
        ))
    } else if duration > MAX_DURATION_SECS {
        Some(format!(
            "Audio too long for efficient processing ({:.1} minutes) - maximum: 2 hours",
            duration / 60.0
        ))
    } else {
        None
    }
}

/// Whether an ffprobe `-of json` stream listing contains an audio stream.
fn has_audio_stream(stdout: &[u8]) -> bool {
    #[derive(serde::Deserialize)]
    struct Streams {
        #[serde(default)]
        streams: Vec<StreamEntry>,
    }
    #[derive(serde::Deserialize)]
    struct StreamEntry {
        codec_type: Option<String>,
    }

    match serde_json::from_slice::<Streams>(stdout) {
        Ok(parsed) => parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
        Err(_) => false,
    }
}

enum ProbeOutcome {
    Done(std::process::Output),
    TimedOut,
    SpawnFailed(std::io::Error),
}

async fn run_probe(args: &[&str], path: &Path) -> ProbeOutcome {
    let future = Command::new("ffprobe")
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, future).await {
        Ok(Ok(output)) => ProbeOutcome::Done(output),
        Ok(Err(e)) => ProbeOutcome::SpawnFailed(e),
        Err(_) => ProbeOutcome::TimedOut,
    }
}

/// Probe the channel count of the first audio stream. `None` when the probe
/// fails or reports nothing.
async fn probe_channels(path: &Path) -> Option<String> {
    if which::which("ffprobe").is_err() {
        return None;
    }

    let output = match run_probe(
        &[
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=channels",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ],
        path,
    )
    .await
    {
        ProbeOutcome::Done(output) if output.status.success() => output,
        _ => return None,
    };

    let text = String::from_utf8_lossy(&output.stdout);
    let first = text.lines().next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

/// Re-encode `path` to single-channel audio, overwriting the original.
/// The encode goes to a sibling temp file and is moved into place so a
/// failed encode never clobbers the input.
async fn reencode_mono(path: &Path) -> bool {
    if which::which("ffmpeg").is_err() {
        warn!("ffmpeg not found in PATH, cannot repair audio");
        return false;
    }

    let tmp = path.with_extension("mono.tmp.mp3");

    let future = Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .args(["-ac", "1", "-y"])
        .arg(&tmp)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    let output = match tokio::time::timeout(REPAIR_TIMEOUT, future).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(error = %e, "ffmpeg failed to start for mono repair");
            return false;
        }
        Err(_) => {
            warn!("mono re-encode timed out");
            let _ = tokio::fs::remove_file(&tmp).await;
            return false;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            stderr = %stderr.lines().last().unwrap_or("unknown error"),
            "mono re-encode failed"
        );
        let _ = tokio::fs::remove_file(&tmp).await;
        return false;
    }

    match move_file(&tmp, path).await {
        Ok(()) => {
            debug!(path = %path.display(), "mono re-encode complete");
            true
        }
        Err(e) => {
            warn!(error = %e, "failed to move re-encoded audio into place");
            let _ = tokio::fs::remove_file(&tmp).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_reason_small_file() {
        let reason = size_reason(500).unwrap();
        assert!(reason.contains("500 bytes"));
        assert!(reason.contains("too small"));
        assert!(size_reason(1024).is_none());
    }

    #[test]
    fn test_duration_reason_bounds() {
        assert!(duration_reason(0.5).unwrap().contains("too short"));
        assert!(duration_reason(7201.0).unwrap().contains("too long"));
        assert!(duration_reason(1.0).is_none());
        assert!(duration_reason(7200.0).is_none());
        assert!(duration_reason(300.0).is_none());
    }

    #[test]
    fn test_has_audio_stream() {
        let json = br#"{"streams": [{"codec_type": "audio", "codec_name": "mp3"}]}"#;
        assert!(has_audio_stream(json));

        let empty = br#"{"streams": []}"#;
        assert!(!has_audio_stream(empty));

        let video_only = br#"{"streams": [{"codec_type": "video"}]}"#;
        assert!(!has_audio_stream(video_only));

        assert!(!has_audio_stream(b"not json"));
    }

    #[tokio::test]
    async fn test_validate_missing_file() {
        let verdict = FfprobeValidator::new()
            .validate(Path::new("/nonexistent/audio.mp3"))
            .await;
        assert!(!verdict.ok);
        assert_eq!(verdict.reason, "Audio file does not exist");
    }

    #[tokio::test]
    async fn test_validate_tiny_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tiny.mp3");
        tokio::fs::write(&path, vec![0u8; 500]).await.unwrap();

        let verdict = FfprobeValidator::new().validate(&path).await;
        assert!(!verdict.ok);
        assert!(verdict.reason.contains("500 bytes"));
    }
}
