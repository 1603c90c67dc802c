// editing.rs - Editing options assembly
//! Music and overlay preferences are collected into one `EditingForm` and
//! resolved into the wire-level `EditingOptions` immediately before a job is
//! submitted. The music source is a single enum; there is no second place
//! the selected tab is derived from. A failed music upload aborts the whole
//! submission; a partial options object is never sent.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::models::{EditingOptions, TextOverlay};
use std::path::{Path, PathBuf};

pub const MUSIC_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac"];
pub const MAX_MUSIC_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_OVERLAY_SECONDS: u32 = 5;

/// Where the background music comes from. Exactly one variant is ever
/// active, replacing the original's tab-opacity sniffing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MusicSource {
    #[default]
    None,
    Url(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayForm {
    pub text: String,
    pub position: String,
    pub duration: Option<u32>,
}

/// Raw form values as entered by the user.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditingForm {
    pub enabled: bool,
    pub music: MusicSource,
    /// Slider value, 0–100.
    pub music_volume_percent: u8,
    pub overlays: Vec<OverlayForm>,
}

/// Resolve a form into submit-ready options. A `File` music source is
/// uploaded first via the multipart endpoint and replaced by the server-side
/// path; any failure in that sub-step propagates so the caller aborts before
/// starting the job.
pub async fn assemble(
    backend: &dyn Backend,
    form: &EditingForm,
) -> Result<Option<EditingOptions>> {
    if !form.enabled {
        return Ok(None);
    }

    let (music_url, music_file) = match &form.music {
        MusicSource::None => (None, None),
        MusicSource::Url(url) => {
            let trimmed = url.trim();
            if trimmed.is_empty() {
                (None, None)
            } else {
                (Some(trimmed.to_string()), None)
            }
        }
        MusicSource::File(path) => {
            validate_music_file(path)?;
            tracing::info!("Uploading background music: {}", path.display());
            let stored = backend.upload_music(path).await?;
            if !stored.success {
                return Err(Error::api_or(stored.error, "Music upload failed"));
            }
            let filepath = stored
                .filepath
                .ok_or_else(|| Error::Api("Music upload returned no filepath".to_string()))?;
            (None, Some(filepath))
        }
    };

    let overlays: Vec<TextOverlay> = form
        .overlays
        .iter()
        .filter(|overlay| !overlay.text.trim().is_empty())
        .map(|overlay| TextOverlay {
            text: overlay.text.trim().to_string(),
            position: overlay.position.clone(),
            duration: overlay.duration.unwrap_or(DEFAULT_OVERLAY_SECONDS),
        })
        .collect();

    Ok(Some(EditingOptions {
        enabled: true,
        music_url,
        music_file,
        music_volume: f32::from(form.music_volume_percent.min(100)) / 100.0,
        text_overlays: (!overlays.is_empty()).then_some(overlays),
    }))
}

/// Client-side checks matching the backend's `/upload-music` limits, so an
/// oversized or mistyped file never leaves the machine.
pub fn validate_music_file(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !MUSIC_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::Validation(
            "Please select a valid audio file (MP3, WAV, M4A, AAC)".to_string(),
        ));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|_| Error::Validation("Audio file not found".to_string()))?;
    if metadata.len() > MAX_MUSIC_BYTES {
        return Err(Error::Validation(
            "File size too large. Maximum 50MB allowed.".to_string(),
        ));
    }
    Ok(())
}
