//! Media key derivation.
//!
//! Every cached artifact (audio blob, metadata sidecar, transcription
//! sidecar) is keyed by a stable identifier derived from the source URL:
//! the YouTube video id when the URL carries one, otherwise a SHA-256 hash
//! of the trimmed URL.

use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{MediaError, MediaResult};

/// Derive the normalized media key for a source URL.
///
/// Fails only when the URL is not a parseable http(s) URL.
pub fn media_key(source_url: &str) -> MediaResult<String> {
    let trimmed = source_url.trim();
    let parsed =
        Url::parse(trimmed).map_err(|_| MediaError::InvalidUrl(source_url.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MediaError::InvalidUrl(source_url.to_string()));
    }

    if let Some(id) = extract_youtube_id(&parsed) {
        return Ok(id);
    }

    let digest = Sha256::digest(trimmed.as_bytes());
    Ok(format!("{:x}", digest))
}

/// Extract an 11-character YouTube video id from a parsed URL, if present.
fn extract_youtube_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;

    let candidate = if host.ends_with("youtu.be") {
        url.path_segments()?.next().map(str::to_string)
    } else if host.ends_with("youtube.com") {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
            Some(v.to_string())
        } else {
            // /embed/<id> and /shorts/<id> forms
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("embed") | Some("shorts") => segments.next().map(str::to_string),
                _ => None,
            }
        }
    } else {
        None
    };

    candidate.filter(|id| is_valid_youtube_id(id))
}

fn is_valid_youtube_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            media_key("https://www.youtube.com/watch?v=abc123def45").unwrap(),
            "abc123def45"
        );
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(
            media_key("https://youtube.com/watch?v=abc123def45&list=xyz").unwrap(),
            "abc123def45"
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(
            media_key("https://youtu.be/abc123def45").unwrap(),
            "abc123def45"
        );
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            media_key("https://youtube.com/embed/abc123def45").unwrap(),
            "abc123def45"
        );
    }

    #[test]
    fn test_non_youtube_url_hashes() {
        let key = media_key("https://vimeo.com/123456").unwrap();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_invalid_video_id_falls_back_to_hash() {
        // Wrong length: not a valid video id, but still a fetchable URL.
        let key = media_key("https://youtube.com/watch?v=abc").unwrap();
        assert_eq!(key.len(), 64);
    }

    #[test]
    fn test_same_url_same_key() {
        let a = media_key("https://example.com/some/video").unwrap();
        let b = media_key("  https://example.com/some/video  ").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(media_key("not a url").is_err());
        assert!(media_key("ftp://example.com/video").is_err());
    }
}
