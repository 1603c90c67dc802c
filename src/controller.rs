// controller.rs - Page controller driving the upload pages
//! One controller serves both upload pages; the page kind only decides which
//! submission sources it accepts. Everything else (editing assembly, job
//! registration, polling, panel transitions) is the same code path, so the
//! two pages cannot drift apart behaviorally.

use crate::actions;
use crate::backend::Backend;
use crate::editing::{self, EditingForm};
use crate::error::{Error, Result};
use crate::models::{TaskSnapshot, TaskState};
use crate::poller::{PollPolicy, TaskPoller};
use crate::view::{Surface, ToastKind, ViewState};
use crate::AppState;
use std::path::PathBuf;
use std::sync::Arc;

/// Which upload page this controller is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Reel-URL page: submits Instagram links to `/auto-upload-async`.
    Reel,
    /// Device-upload page: stores a local file, then `/upload-local-async`.
    LocalStudio,
}

/// What the user is submitting.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadSource {
    ReelUrl(String),
    DeviceFile(PathBuf),
}

pub struct PageController<S: Surface> {
    app: Arc<AppState>,
    kind: PageKind,
    pub view: ViewState,
    surface: S,
}

impl<S: Surface> PageController<S> {
    pub fn new(app: Arc<AppState>, kind: PageKind, surface: S) -> Self {
        Self {
            app,
            kind,
            view: ViewState::new(),
            surface,
        }
    }

    fn backend(&self) -> &dyn Backend {
        self.app.backend.as_ref()
    }

    fn render(&mut self) {
        self.surface.render(&self.view);
    }

    fn fail(&mut self, error: Error) -> Error {
        self.view.toast(ToastKind::Error, error.to_string());
        self.view.show_error(error.to_string());
        self.render();
        error
    }

    /// Re-check the session and fan the result out to every auth region.
    pub async fn refresh_session(&mut self) {
        let session = self.app.session.check_session().await;
        self.view.set_session(&session);
        self.render();
    }

    pub async fn sign_in(&mut self, prompt: &dyn crate::session::AuthPrompt) -> Result<()> {
        match self.app.session.sign_in(prompt).await {
            Ok(session) => {
                self.view.set_session(&session);
                if session.authenticated {
                    self.view.toast(ToastKind::Success, "Signed in");
                } else {
                    self.view
                        .toast(ToastKind::Warning, "Sign-in did not complete");
                }
                self.render();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn sign_out(&mut self, prompt: &dyn crate::session::AuthPrompt) -> Result<bool> {
        match self.app.session.sign_out(prompt).await {
            Ok(true) => {
                self.view.set_session(&self.app.session.current());
                self.view.clear_results();
                self.view.toast(ToastKind::Info, "Signed out");
                self.render();
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Non-empty guard shared by the one-shot actions; nothing is sent for
    /// blank input.
    fn require_input(&mut self, value: &str, message: &str) -> Result<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(self.fail(Error::Validation(message.to_string())));
        }
        Ok(trimmed.to_string())
    }

    fn validate_source(&self, source: &UploadSource) -> Result<()> {
        match (self.kind, source) {
            (PageKind::Reel, UploadSource::ReelUrl(url)) => {
                let trimmed = url.trim();
                if trimmed.is_empty() {
                    return Err(Error::Validation(
                        "Please enter an Instagram Reel URL".to_string(),
                    ));
                }
                if !trimmed.contains("instagram.com") {
                    return Err(Error::Validation(
                        "Please enter a valid Instagram URL".to_string(),
                    ));
                }
                Ok(())
            }
            (PageKind::LocalStudio, UploadSource::DeviceFile(path)) => {
                actions::validate_video_file(path)
            }
            _ => Err(Error::Validation(
                "This page does not accept that kind of upload".to_string(),
            )),
        }
    }

    /// Submit an upload and follow it to a terminal state. Registers the task
    /// as the active job (cancelling any previous one), renders every status
    /// snapshot, and surfaces the AI metadata as soon as the pipeline reaches
    /// the uploading phase.
    pub async fn submit_upload(
        &mut self,
        source: UploadSource,
        editing_form: &EditingForm,
    ) -> Result<TaskSnapshot> {
        if let Err(e) = self.validate_source(&source) {
            return Err(self.fail(e));
        }
        if !self.app.session.current().authenticated {
            return Err(self.fail(Error::Validation(
                "Please sign in with YouTube first".to_string(),
            )));
        }

        // Editing options are resolved before the job starts; a failed music
        // upload aborts the submission entirely.
        let editing = match editing::assemble(self.backend(), editing_form).await {
            Ok(editing) => editing,
            Err(e) => return Err(self.fail(e)),
        };

        self.view.clear_results();
        self.view.show_loading("Starting upload...");
        self.render();

        let submitted = match &source {
            UploadSource::ReelUrl(url) => {
                self.backend().auto_upload(url.trim(), editing.as_ref()).await
            }
            UploadSource::DeviceFile(path) => {
                match actions::store_local_video(self.backend(), path).await {
                    Ok(filepath) => self.backend().upload_local(&filepath, editing.as_ref()).await,
                    Err(e) => Err(e),
                }
            }
        };
        let task_id = match submitted {
            Ok(task_id) => task_id,
            Err(e) => return Err(self.fail(e)),
        };
        tracing::info!("Upload task started: {}", task_id);

        let cancel = self.app.begin_job(&task_id);
        let poller = TaskPoller::new(
            self.app.backend.clone(),
            PollPolicy::from_config(&self.app.config),
        );

        let view = &mut self.view;
        let surface = &mut self.surface;
        let result = poller
            .run(&task_id, cancel, |snapshot| {
                view.show_progress(snapshot);
                if snapshot.status == TaskState::Uploading {
                    if let Some(metadata) = &snapshot.metadata {
                        view.show_preview(metadata.clone());
                    }
                }
                surface.render(view);
            })
            .await;
        self.app.finish_job(&task_id);

        match result {
            Ok(snapshot) => {
                self.view.show_success(snapshot.youtube_url.clone());
                self.view
                    .toast(ToastKind::Success, "Video uploaded successfully!");
                self.render();
                Ok(snapshot)
            }
            // A newer submission took over; its own panel is already showing.
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Cancel the active job and return the page to its idle state.
    pub fn reset(&mut self) {
        self.app.abort_active_job();
        self.view.clear_results();
        self.render();
    }

    /// Fetch AI metadata for a reel without uploading it.
    pub async fn preview(&mut self, url: &str) -> Result<()> {
        let url = self.require_input(url, "Please enter an Instagram Reel URL")?;
        self.view.show_loading("Generating preview...");
        self.render();

        match self.backend().generate_preview(&url).await {
            Ok(metadata) => {
                self.view.show_preview(metadata);
                self.view.panel = Some(crate::view::Panel::Idle);
                self.render();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Fetch AI metadata for a reel, including the analysis text.
    pub async fn metadata_for_reel(&mut self, url: &str) -> Result<()> {
        let url = self.require_input(url, "Please enter an Instagram Reel URL")?;
        self.view.show_loading("Analyzing video...");
        self.render();

        match self.backend().generate_metadata_instagram(&url).await {
            Ok(metadata) => {
                self.view.show_preview(metadata);
                self.view.panel = Some(crate::view::Panel::Idle);
                // Analysis may have stored the video in the gallery.
                if let Ok(videos) = self.backend().list_gallery().await {
                    self.view.gallery = videos;
                }
                self.render();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Fetch AI metadata for a stored gallery video.
    pub async fn metadata_for_gallery(&mut self, video_file: &str) -> Result<()> {
        let video_file =
            self.require_input(video_file, "Please select a video from the gallery")?;
        self.view.show_loading("Analyzing video...");
        self.render();

        match self.backend().generate_metadata_gallery(&video_file).await {
            Ok(metadata) => {
                self.view.show_preview(metadata);
                self.view.panel = Some(crate::view::Panel::Idle);
                if let Ok(videos) = self.backend().list_gallery().await {
                    self.view.gallery = videos;
                }
                self.render();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Download a reel to the configured directory, scheduling the delayed
    /// server-side cleanup.
    pub async fn download(&mut self, url: &str) -> Result<PathBuf> {
        let url = self.require_input(url, "Please enter a video URL")?;
        self.view.show_loading("Downloading video...");
        self.render();

        match actions::download_video(self.backend(), &url, &self.app.config.download_dir)
            .await
        {
            Ok(downloaded) => {
                actions::cleanup_later(
                    self.app.backend.clone(),
                    downloaded.filename.clone(),
                    self.app.config.cleanup_delay,
                );
                self.view.panel = Some(crate::view::Panel::Idle);
                self.view.toast(
                    ToastKind::Success,
                    format!("Downloaded {}", downloaded.filename),
                );
                self.render();
                Ok(downloaded.path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Refresh the gallery listing shown on the device-upload page.
    pub async fn load_gallery(&mut self) -> Result<()> {
        match self.backend().list_gallery().await {
            Ok(videos) => {
                self.view.gallery = videos;
                self.render();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}
