// actions.rs - Single-shot request/response actions
//! Download-to-disk and the multipart store actions. Each is one exchange
//! with the backend, no polling; the browser original's object-URL dance
//! becomes a staging-file guard that is released exactly once on every path.

use crate::backend::Backend;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "flv", "wmv", "webm", "m4v"];
pub const MAX_VIDEO_BYTES: u64 = 500 * 1024 * 1024;

/// A fetched video saved locally, plus the server-side filename used for the
/// follow-up cleanup call.
#[derive(Debug)]
pub struct Downloaded {
    pub filename: String,
    pub path: PathBuf,
}

/// Staging file that is removed on drop unless it was persisted. The
/// removal happens at most once; `persist` hands ownership of the bytes to
/// their final path and disarms the guard.
#[derive(Debug)]
pub struct SavedFile {
    path: PathBuf,
    kept: bool,
}

impl SavedFile {
    /// Write `bytes` to a `.part` staging file inside `dir`.
    pub fn stage(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.part", filename));
        std::fs::write(&path, bytes)?;
        Ok(Self { path, kept: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged file to its final destination.
    pub fn persist(mut self, dest: &Path) -> std::io::Result<PathBuf> {
        std::fs::rename(&self.path, dest)?;
        self.kept = true;
        Ok(dest.to_path_buf())
    }
}

impl Drop for SavedFile {
    fn drop(&mut self) {
        if !self.kept {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::debug!("Staging file already gone ({}): {}", self.path.display(), e);
            }
        }
    }
}

/// Ask the backend to download a reel, then fetch the stored file into
/// `dest_dir`. The caller decides when to issue the server-side cleanup.
pub async fn download_video(
    backend: &dyn Backend,
    url: &str,
    dest_dir: &Path,
) -> Result<Downloaded> {
    let filename = backend.start_download(url).await?;
    tracing::info!("Fetching downloaded video: {}", filename);

    let bytes = backend.fetch_video(&filename).await?;
    let staged = SavedFile::stage(dest_dir, &filename, &bytes)?;
    let path = staged.persist(&dest_dir.join(&filename))?;

    Ok(Downloaded { filename, path })
}

/// Best-effort server-side cleanup, immediately.
pub async fn cleanup_now(backend: &dyn Backend, filename: &str) {
    if let Err(e) = backend.cleanup(filename).await {
        tracing::debug!("Cleanup failed (non-critical): {}", e);
    }
}

/// Best-effort server-side cleanup after a delay, detached from the caller.
pub fn cleanup_later(backend: Arc<dyn Backend>, filename: String, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        cleanup_now(backend.as_ref(), &filename).await;
    });
}

/// Store a device video in the backend gallery; returns the gallery
/// filename.
pub async fn upload_video_to_gallery(backend: &dyn Backend, path: &Path) -> Result<String> {
    validate_video_file(path)?;
    let stored = backend.upload_to_gallery(path).await?;
    if !stored.success {
        return Err(Error::api_or(stored.error, "Upload failed"));
    }
    stored
        .filename
        .ok_or_else(|| Error::Api("Upload returned no filename".to_string()))
}

/// Store a device video for the local-upload pipeline; returns the
/// server-side filepath expected by `/upload-local-async`.
pub async fn store_local_video(backend: &dyn Backend, path: &Path) -> Result<String> {
    validate_video_file(path)?;
    let stored = backend.upload_local_video(path).await?;
    if !stored.success {
        return Err(Error::api_or(stored.error, "Upload failed"));
    }
    stored
        .filepath
        .ok_or_else(|| Error::Api("Upload returned no filepath".to_string()))
}

/// Extension and size checks matching the backend's limits.
pub fn validate_video_file(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::Validation(
            "Invalid file type. Please upload a video file.".to_string(),
        ));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|_| Error::Validation("Video file not found".to_string()))?;
    if metadata.len() > MAX_VIDEO_BYTES {
        return Err(Error::Validation(
            "File size too large. Maximum 500MB allowed.".to_string(),
        ));
    }
    Ok(())
}
