// lib.rs - Client library for the reel-to-YouTube repurposing backend
//! Typed client for the video repurposing service: session management,
//! async job submission with bounded status polling, one-shot download and
//! store actions, editing-options assembly, and an offline asset cache.

pub mod actions;
pub mod backend;
pub mod config;
pub mod controller;
pub mod editing;
pub mod error;
pub mod models;
pub mod offline;
pub mod poller;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::ClientConfig;
pub use error::{Error, Result};

use backend::Backend;
use session::SessionClient;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::watch;

/// Cancellation handle for the one in-flight upload job.
#[derive(Debug)]
pub struct JobHandle {
    pub task_id: String,
    cancel: watch::Sender<bool>,
}

impl JobHandle {
    fn stop(&self) {
        // Receivers may already be gone when the poller finished on its own.
        let _ = self.cancel.send(true);
    }
}

/// Shared state for one running client: the backend handle, the session
/// broadcaster, and the single active-job slot. At most one upload job is
/// tracked at a time; starting a new one cancels the previous poller.
pub struct AppState {
    pub config: ClientConfig,
    pub backend: Arc<dyn Backend>,
    pub session: SessionClient,
    active_job: Mutex<Option<JobHandle>>,
}

impl AppState {
    pub fn new(config: ClientConfig, backend: Arc<dyn Backend>) -> Self {
        let session = SessionClient::new(backend.clone(), config.auth_check_interval);
        Self {
            config,
            backend,
            session,
            active_job: Mutex::new(None),
        }
    }

    /// Register `task_id` as the active job, cancelling any previous one.
    /// Returns the cancellation receiver the new poll loop listens on.
    pub fn begin_job(&self, task_id: &str) -> watch::Receiver<bool> {
        let (sender, receiver) = watch::channel(false);
        let previous = self.active_job.lock().unwrap().replace(JobHandle {
            task_id: task_id.to_string(),
            cancel: sender,
        });
        if let Some(job) = previous {
            tracing::info!("Cancelling previous job {}", job.task_id);
            job.stop();
        }
        receiver
    }

    /// Cancel the active job, if any. Used by the reset action.
    pub fn abort_active_job(&self) {
        if let Some(job) = self.active_job.lock().unwrap().take() {
            job.stop();
        }
    }

    /// Drop the job slot once its poll loop has returned, without disturbing
    /// a newer job that may have replaced it.
    pub fn finish_job(&self, task_id: &str) {
        let mut slot = self.active_job.lock().unwrap();
        if slot.as_ref().map(|job| job.task_id.as_str()) == Some(task_id) {
            *slot = None;
        }
    }

    pub fn active_task_id(&self) -> Option<String> {
        self.active_job
            .lock()
            .unwrap()
            .as_ref()
            .map(|job| job.task_id.clone())
    }
}
