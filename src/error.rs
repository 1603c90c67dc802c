// error.rs - Client error taxonomy
use std::time::Duration;
use thiserror::Error;

/// Failures a page controller can surface. Validation errors are caught
/// before any request is issued; transport errors come from the HTTP layer;
/// `Api` carries the backend's own `error` text for `success:false` payloads.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    /// The backend reported a terminal `failed` status for a tracked task.
    #[error("{0}")]
    JobFailed(String),

    /// The task never reached a terminal state within the polling deadline.
    #[error("job did not finish within {} seconds", .0.as_secs())]
    PollTimeout(Duration),

    /// The active poll loop was stopped locally (reset or new submission).
    #[error("polling cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Server-supplied error text with a generic fallback, mirroring the
    /// `data.error || 'Upload failed'` pattern the backend contract assumes.
    pub fn api_or(message: Option<String>, fallback: &str) -> Self {
        Error::Api(message.unwrap_or_else(|| fallback.to_string()))
    }

    /// True for errors a polling loop should swallow and retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Api(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
