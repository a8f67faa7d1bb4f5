//! Filesystem helpers for cross-device file moves.

use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Move a file from `src` to `dst`, overwriting the destination.
///
/// Tries a fast rename first and falls back to copy-then-delete when the
/// paths live on different filesystems (EXDEV). The fallback copies to a
/// temp file next to `dst` and renames it into place so the destination
/// never holds a partial write.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        // EXDEV (18 on Linux/macOS): cross-device rename
        Err(e) if e.raw_os_error() == Some(18) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "cross-device rename, copying instead"
            );
            let tmp = dst.with_extension("tmp");
            fs::copy(src, &tmp).await?;
            if let Err(e) = fs::rename(&tmp, dst).await {
                let _ = fs::remove_file(&tmp).await;
                return Err(e.into());
            }
            if let Err(e) = fs::remove_file(src).await {
                tracing::warn!(src = %src.display(), error = %e, "failed to remove moved source");
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
