// backend.rs - HTTP boundary to the repurposing backend
//! Typed client for the backend endpoints. Everything above this module talks
//! to the `Backend` trait so controllers, the session client, and the poller
//! can be exercised against scripted fakes.

use crate::error::{Error, Result};
use crate::models::*;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::path::Path;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn check_auth(&self) -> Result<Session>;
    async fn channel_info(&self) -> Result<Session>;
    async fn start_auth(&self) -> Result<AuthStart>;
    async fn authenticate(&self) -> Result<ApiAck>;
    async fn logout(&self) -> Result<ApiAck>;

    async fn generate_preview(&self, url: &str) -> Result<MetadataPreview>;
    async fn generate_metadata_instagram(&self, url: &str) -> Result<MetadataPreview>;
    async fn generate_metadata_gallery(&self, video_file: &str) -> Result<MetadataPreview>;

    /// Submit an async reel upload; returns the server-issued task id.
    async fn auto_upload(&self, url: &str, editing: Option<&EditingOptions>) -> Result<String>;
    /// Submit an async upload of a previously stored local video.
    async fn upload_local(
        &self,
        video_filepath: &str,
        editing: Option<&EditingOptions>,
    ) -> Result<String>;
    async fn task_status(&self, task_id: &str) -> Result<TaskSnapshot>;

    /// Ask the backend to download a reel; returns the stored filename.
    async fn start_download(&self, url: &str) -> Result<String>;
    async fn fetch_video(&self, filename: &str) -> Result<Vec<u8>>;
    /// Best-effort server-side file removal.
    async fn cleanup(&self, filename: &str) -> Result<()>;

    async fn upload_to_gallery(&self, path: &Path) -> Result<StoredFile>;
    async fn upload_music(&self, path: &Path) -> Result<StoredFile>;
    async fn upload_local_video(&self, path: &Path) -> Result<StoredFile>;

    async fn list_gallery(&self) -> Result<Vec<String>>;
    async fn list_downloads(&self) -> Result<Vec<DownloadEntry>>;
    async fn health(&self) -> Result<serde_json::Value>;
}

/// `Backend` over reqwest against a configured base URL.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.post(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post_file<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        file: &Path,
    ) -> Result<T> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            // The backend wraps errors as {"error": "..."} even on non-2xx.
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(text);
            return Err(Error::Api(format!("backend error ({}): {}", status, message)));
        }
        Ok(response.json().await?)
    }

    fn metadata_from(response: MetadataResponse, fallback: &str) -> Result<MetadataPreview> {
        if response.success {
            Ok(response.metadata)
        } else {
            Err(Error::api_or(response.error, fallback))
        }
    }

    fn task_id_from(response: StartedTask, fallback: &str) -> Result<String> {
        match (response.success, response.task_id) {
            (true, Some(task_id)) => Ok(task_id),
            (_, _) => Err(Error::api_or(response.error, fallback)),
        }
    }

    fn upload_body(primary: (&str, &str), editing: Option<&EditingOptions>) -> serde_json::Value {
        let (key, value) = primary;
        match editing {
            Some(options) => json!({ key: value, "editing": options }),
            None => json!({ key: value }),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn check_auth(&self) -> Result<Session> {
        self.get_json("/check-auth").await
    }

    async fn channel_info(&self) -> Result<Session> {
        self.get_json("/get-channel-info").await
    }

    async fn start_auth(&self) -> Result<AuthStart> {
        self.get_json("/auth/start").await
    }

    async fn authenticate(&self) -> Result<ApiAck> {
        self.post_empty("/authenticate").await
    }

    async fn logout(&self) -> Result<ApiAck> {
        self.post_empty("/logout").await
    }

    async fn generate_preview(&self, url: &str) -> Result<MetadataPreview> {
        let response = self
            .post_json("/generate-preview", &json!({ "url": url }))
            .await?;
        Self::metadata_from(response, "Preview generation failed")
    }

    async fn generate_metadata_instagram(&self, url: &str) -> Result<MetadataPreview> {
        let response = self
            .post_json("/generate-metadata-instagram", &json!({ "url": url }))
            .await?;
        Self::metadata_from(response, "Generation failed")
    }

    async fn generate_metadata_gallery(&self, video_file: &str) -> Result<MetadataPreview> {
        let response = self
            .post_json(
                "/generate-metadata-gallery",
                &json!({ "video_file": video_file }),
            )
            .await?;
        Self::metadata_from(response, "Generation failed")
    }

    async fn auto_upload(&self, url: &str, editing: Option<&EditingOptions>) -> Result<String> {
        let body = Self::upload_body(("url", url), editing);
        let response = self.post_json("/auto-upload-async", &body).await?;
        Self::task_id_from(response, "Upload failed")
    }

    async fn upload_local(
        &self,
        video_filepath: &str,
        editing: Option<&EditingOptions>,
    ) -> Result<String> {
        let body = Self::upload_body(("video_filepath", video_filepath), editing);
        let response = self.post_json("/upload-local-async", &body).await?;
        Self::task_id_from(response, "Upload failed")
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        let path = format!("/task-status/{}", urlencoding::encode(task_id));
        let response: TaskStatusResponse = self.get_json(&path).await?;
        match (response.success, response.task) {
            (true, Some(task)) => Ok(task),
            (_, _) => Err(Error::api_or(response.error, "Task status unavailable")),
        }
    }

    async fn start_download(&self, url: &str) -> Result<String> {
        let response: DownloadStarted =
            self.post_json("/download", &json!({ "url": url })).await?;
        match (response.success, response.filename) {
            (true, Some(filename)) => Ok(filename),
            (_, _) => Err(Error::api_or(response.error, "Download failed")),
        }
    }

    async fn fetch_video(&self, filename: &str) -> Result<Vec<u8>> {
        let path = format!("/get-video/{}", urlencoding::encode(filename));
        let response = self.client.get(self.url(&path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(format!(
                "failed to fetch video file ({})",
                status
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn cleanup(&self, filename: &str) -> Result<()> {
        let path = format!("/cleanup/{}", urlencoding::encode(filename));
        let _: ApiAck = self.post_empty(&path).await?;
        Ok(())
    }

    async fn upload_to_gallery(&self, path: &Path) -> Result<StoredFile> {
        self.post_file("/upload-to-gallery", "video", path).await
    }

    async fn upload_music(&self, path: &Path) -> Result<StoredFile> {
        self.post_file("/upload-music", "music", path).await
    }

    async fn upload_local_video(&self, path: &Path) -> Result<StoredFile> {
        self.post_file("/upload-local-video", "video", path).await
    }

    async fn list_gallery(&self) -> Result<Vec<String>> {
        let response: GalleryListing = self.get_json("/list-gallery-videos").await?;
        if response.success {
            Ok(response.videos)
        } else {
            Err(Error::api_or(response.error, "Failed to list gallery"))
        }
    }

    async fn list_downloads(&self) -> Result<Vec<DownloadEntry>> {
        let response: DownloadsListing = self.get_json("/list-downloads").await?;
        match response.error {
            None => Ok(response.files),
            Some(error) => Err(Error::Api(error)),
        }
    }

    async fn health(&self) -> Result<serde_json::Value> {
        self.get_json("/health").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_body_omits_editing_when_absent() {
        let body = HttpBackend::upload_body(("url", "https://instagram.com/reel/x"), None);
        assert!(body.get("editing").is_none());
        assert_eq!(body["url"], "https://instagram.com/reel/x");
    }

    #[test]
    fn upload_body_embeds_editing_options() {
        let options = EditingOptions {
            enabled: true,
            music_url: None,
            music_file: Some("/srv/music/track.mp3".into()),
            music_volume: 0.5,
            text_overlays: None,
        };
        let body = HttpBackend::upload_body(("video_filepath", "/srv/v.mp4"), Some(&options));
        assert_eq!(body["editing"]["music_file"], "/srv/music/track.mp3");
        assert_eq!(body["video_filepath"], "/srv/v.mp4");
    }

    #[test]
    fn task_id_requires_success_and_id() {
        let ok = StartedTask {
            success: true,
            task_id: Some("abc".into()),
            error: None,
        };
        assert_eq!(HttpBackend::task_id_from(ok, "Upload failed").unwrap(), "abc");

        let rejected = StartedTask {
            success: false,
            task_id: None,
            error: Some("Not authenticated with YouTube".into()),
        };
        let err = HttpBackend::task_id_from(rejected, "Upload failed").unwrap_err();
        assert!(err.to_string().contains("Not authenticated"));
    }
}
