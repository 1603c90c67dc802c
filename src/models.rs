// models.rs - Wire types for the repurposing backend's JSON contract
use serde::{Deserialize, Serialize};

/// Authenticated-channel state as observed from the backend. Re-fetched on
/// demand; never persisted client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub channel: Option<Channel>,
}

impl Session {
    /// The fail-safe state used whenever a session check cannot complete.
    pub fn signed_out() -> Self {
        Self {
            authenticated: false,
            channel: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(rename = "subscriberCount", default)]
    pub subscriber_count: u64,
    #[serde(rename = "videoCount", default)]
    pub video_count: u64,
}

/// Server-side pipeline states for an async upload task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Started,
    Downloading,
    /// Local-upload variant of the pipeline's first phase.
    Processing,
    Editing,
    GeneratingMetadata,
    Uploading,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Display title for the progress panel.
    pub fn title(self) -> &'static str {
        match self {
            TaskState::Started => "Starting...",
            TaskState::Downloading => "Downloading Reel",
            TaskState::Processing => "Processing Video",
            TaskState::Editing => "Editing Video",
            TaskState::GeneratingMetadata => "AI Analyzing Video",
            TaskState::Uploading => "Uploading to YouTube",
            TaskState::Completed => "Upload Complete",
            TaskState::Failed => "Upload Failed",
            TaskState::Unknown => "Processing...",
        }
    }
}

/// One `/task-status/{id}` observation. Each snapshot fully replaces the
/// previous one; nothing is merged client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    pub status: TaskState,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub metadata: Option<MetadataPreview>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// AI-generated metadata, either from a preview call or embedded in a task
/// snapshot while it uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataPreview {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub video_analysis: Option<String>,
    /// Gallery filename of the analyzed video, when the backend stored one.
    #[serde(default)]
    pub video_file: Option<String>,
}

/// User-specified music/overlay augmentation attached to an upload job.
/// Assembled immediately before submission and not retained afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditingOptions {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_file: Option<String>,
    pub music_volume: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_overlays: Option<Vec<TextOverlay>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    pub position: String,
    pub duration: u32,
}

// ============================================================================
// RESPONSE ENVELOPES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthStart {
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartedTask {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub task: Option<TaskSnapshot>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadStarted {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(flatten)]
    pub metadata: MetadataPreview,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryListing {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub error: Option<String>,
}

/// Stored-file ack for the multipart upload endpoints. `/upload-music` and
/// `/upload-local-video` return a server `filepath`; `/upload-to-gallery`
/// returns a gallery `filename`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredFile {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsListing {
    #[serde(default)]
    pub files: Vec<DownloadEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadEntry {
    pub filename: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_decodes_snake_case() {
        let s: TaskState = serde_json::from_str("\"generating_metadata\"").unwrap();
        assert_eq!(s, TaskState::GeneratingMetadata);
        assert!(!s.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }

    #[test]
    fn unknown_task_state_does_not_fail_decoding() {
        let s: TaskState = serde_json::from_str("\"reticulating_splines\"").unwrap();
        assert_eq!(s, TaskState::Unknown);
        assert_eq!(s.title(), "Processing...");
    }

    #[test]
    fn snapshot_decodes_partial_payloads() {
        let snap: TaskSnapshot =
            serde_json::from_str(r#"{"status":"uploading","progress":55}"#).unwrap();
        assert_eq!(snap.status, TaskState::Uploading);
        assert_eq!(snap.progress, 55);
        assert!(snap.youtube_url.is_none());
        assert!(snap.metadata.is_none());
    }

    #[test]
    fn editing_options_skip_absent_music_fields() {
        let opts = EditingOptions {
            enabled: true,
            music_url: Some("https://example.com/track.mp3".into()),
            music_file: None,
            music_volume: 0.3,
            text_overlays: None,
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert!(json.get("music_file").is_none());
        assert_eq!(json["music_url"], "https://example.com/track.mp3");
    }

    #[test]
    fn channel_decodes_camel_case_counts() {
        let ch: Channel = serde_json::from_str(
            r#"{"title":"Clips","thumbnail":null,"subscriberCount":1200,"videoCount":34}"#,
        )
        .unwrap();
        assert_eq!(ch.subscriber_count, 1200);
        assert_eq!(ch.video_count, 34);
    }
}
