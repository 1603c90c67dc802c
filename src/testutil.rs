// testutil.rs - Scripted backend fake shared by the unit tests
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::models::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) fn signed_in_session(title: &str) -> Session {
    Session {
        authenticated: true,
        channel: Some(Channel {
            title: title.to_string(),
            thumbnail: None,
            subscriber_count: 1_000,
            video_count: 10,
        }),
    }
}

pub(crate) fn snapshot(status: TaskState, progress: u8) -> TaskSnapshot {
    TaskSnapshot {
        id: None,
        status,
        progress,
        message: String::new(),
        metadata: None,
        youtube_url: None,
        error: None,
    }
}

/// Backend whose responses are scripted per endpoint. Queued entries are
/// consumed in order; an exhausted queue yields an `Api` error so a test
/// that over-polls fails loudly instead of hanging.
#[derive(Default)]
pub(crate) struct FakeBackend {
    sessions: Mutex<VecDeque<Result<Session>>>,
    statuses: Mutex<VecDeque<Result<TaskSnapshot>>>,
    pub status_calls: AtomicUsize,
    pub cleanup_calls: AtomicUsize,
    auth_url: Mutex<Option<String>>,
    authenticate_success: Mutex<bool>,
    logout_success: Mutex<bool>,
    task_id: Mutex<Option<String>>,
    download_filename: Mutex<Option<String>>,
    video_bytes: Mutex<Option<Vec<u8>>>,
    music_filepath: Mutex<Option<String>>,
    preview: Mutex<Option<MetadataPreview>>,
    gallery: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_session(&self, result: Result<Session>) {
        self.sessions.lock().unwrap().push_back(result);
    }

    pub fn push_status(&self, result: Result<TaskSnapshot>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    pub fn set_auth_url(&self, url: Option<String>) {
        *self.auth_url.lock().unwrap() = url;
    }

    pub fn set_authenticate_success(&self, success: bool) {
        *self.authenticate_success.lock().unwrap() = success;
    }

    pub fn set_logout_success(&self, success: bool) {
        *self.logout_success.lock().unwrap() = success;
    }

    pub fn set_task_id(&self, id: &str) {
        *self.task_id.lock().unwrap() = Some(id.to_string());
    }

    pub fn set_download(&self, filename: &str, bytes: Vec<u8>) {
        *self.download_filename.lock().unwrap() = Some(filename.to_string());
        *self.video_bytes.lock().unwrap() = Some(bytes);
    }

    pub fn set_music_filepath(&self, filepath: Option<String>) {
        *self.music_filepath.lock().unwrap() = filepath;
    }

    pub fn set_preview(&self, preview: MetadataPreview) {
        *self.preview.lock().unwrap() = Some(preview);
    }

    pub fn set_gallery(&self, videos: Vec<String>) {
        *self.gallery.lock().unwrap() = videos;
    }

    fn not_scripted<T>(what: &str) -> Result<T> {
        Err(Error::Api(format!("{} not scripted", what)))
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn check_auth(&self) -> Result<Session> {
        match self.sessions.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(Session::signed_out()),
        }
    }

    async fn channel_info(&self) -> Result<Session> {
        self.check_auth().await
    }

    async fn start_auth(&self) -> Result<AuthStart> {
        Ok(AuthStart {
            auth_url: self.auth_url.lock().unwrap().clone(),
            error: None,
        })
    }

    async fn authenticate(&self) -> Result<ApiAck> {
        let success = *self.authenticate_success.lock().unwrap();
        Ok(ApiAck {
            success,
            error: (!success).then(|| "Authentication failed".to_string()),
            message: None,
        })
    }

    async fn logout(&self) -> Result<ApiAck> {
        let success = *self.logout_success.lock().unwrap();
        Ok(ApiAck {
            success,
            error: None,
            message: None,
        })
    }

    async fn generate_preview(&self, _url: &str) -> Result<MetadataPreview> {
        match self.preview.lock().unwrap().clone() {
            Some(preview) => Ok(preview),
            None => Self::not_scripted("preview"),
        }
    }

    async fn generate_metadata_instagram(&self, url: &str) -> Result<MetadataPreview> {
        self.generate_preview(url).await
    }

    async fn generate_metadata_gallery(&self, video_file: &str) -> Result<MetadataPreview> {
        self.generate_preview(video_file).await
    }

    async fn auto_upload(&self, _url: &str, _editing: Option<&EditingOptions>) -> Result<String> {
        match self.task_id.lock().unwrap().clone() {
            Some(id) => Ok(id),
            None => Self::not_scripted("auto_upload"),
        }
    }

    async fn upload_local(
        &self,
        _video_filepath: &str,
        _editing: Option<&EditingOptions>,
    ) -> Result<String> {
        match self.task_id.lock().unwrap().clone() {
            Some(id) => Ok(id),
            None => Self::not_scripted("upload_local"),
        }
    }

    async fn task_status(&self, _task_id: &str) -> Result<TaskSnapshot> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Self::not_scripted("task_status"),
        }
    }

    async fn start_download(&self, _url: &str) -> Result<String> {
        match self.download_filename.lock().unwrap().clone() {
            Some(filename) => Ok(filename),
            None => Self::not_scripted("start_download"),
        }
    }

    async fn fetch_video(&self, _filename: &str) -> Result<Vec<u8>> {
        match self.video_bytes.lock().unwrap().clone() {
            Some(bytes) => Ok(bytes),
            None => Self::not_scripted("fetch_video"),
        }
    }

    async fn cleanup(&self, _filename: &str) -> Result<()> {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upload_to_gallery(&self, path: &Path) -> Result<StoredFile> {
        Ok(StoredFile {
            success: true,
            filename: path
                .file_name()
                .map(|n| format!("device_upload_{}", n.to_string_lossy())),
            filepath: None,
            size: None,
            error: None,
        })
    }

    async fn upload_music(&self, _path: &Path) -> Result<StoredFile> {
        match self.music_filepath.lock().unwrap().clone() {
            Some(filepath) => Ok(StoredFile {
                success: true,
                filename: None,
                filepath: Some(filepath),
                size: None,
                error: None,
            }),
            None => Err(Error::Api("Music upload failed".into())),
        }
    }

    async fn upload_local_video(&self, path: &Path) -> Result<StoredFile> {
        Ok(StoredFile {
            success: true,
            filename: None,
            filepath: Some(path.to_string_lossy().into_owned()),
            size: None,
            error: None,
        })
    }

    async fn list_gallery(&self) -> Result<Vec<String>> {
        Ok(self.gallery.lock().unwrap().clone())
    }

    async fn list_downloads(&self) -> Result<Vec<DownloadEntry>> {
        Ok(Vec::new())
    }

    async fn health(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "status": "ok" }))
    }
}
