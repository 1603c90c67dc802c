// session.rs - Auth session client
//! Session state is observed from the backend and broadcast through a single
//! watch channel, so every surface that shows auth state (main panel, navbar,
//! mobile menu) derives from one value instead of keeping its own flag.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::models::Session;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Handle to the secondary browser window opened for OAuth. The client only
/// ever asks whether it has been closed; closure is the signal to re-check
/// the session.
pub trait AuthWindow: Send + Sync {
    fn is_closed(&self) -> bool;
}

/// Host hooks for the interactive parts of authentication: opening the
/// provider's consent page and confirming sign-out.
pub trait AuthPrompt: Send + Sync {
    fn confirm_sign_out(&self) -> bool;
    fn open_auth_window(&self, auth_url: &str) -> Box<dyn AuthWindow>;
}

pub struct SessionClient {
    backend: Arc<dyn Backend>,
    check_interval: Duration,
    sender: watch::Sender<Session>,
}

impl SessionClient {
    pub fn new(backend: Arc<dyn Backend>, check_interval: Duration) -> Self {
        let (sender, _) = watch::channel(Session::signed_out());
        Self {
            backend,
            check_interval,
            sender,
        }
    }

    /// Subscribe a view region to auth-state changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> Session {
        self.sender.borrow().clone()
    }

    /// Check the session against the backend. Any transport or decode error
    /// is treated as signed-out rather than propagated; a failed check must
    /// never leave a stale signed-in surface behind.
    pub async fn check_session(&self) -> Session {
        let session = match self.backend.check_auth().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Session check failed, treating as signed out: {}", e);
                Session::signed_out()
            }
        };
        self.sender.send_replace(session.clone());
        session
    }

    /// Run the sign-in flow. With an `auth_url` the consent page is opened in
    /// a secondary window and we wait (1 s checks) for its closure before
    /// re-checking the session; without one we fall back to the direct
    /// authenticate call.
    pub async fn sign_in(&self, prompt: &dyn AuthPrompt) -> Result<Session> {
        let start = self.backend.start_auth().await?;

        match start.auth_url {
            Some(auth_url) => {
                tracing::info!("Opening auth window");
                let window = prompt.open_auth_window(&auth_url);
                let mut ticker = tokio::time::interval(self.check_interval);
                ticker.tick().await;
                while !window.is_closed() {
                    ticker.tick().await;
                }
                Ok(self.check_session().await)
            }
            None => {
                if let Some(error) = start.error {
                    tracing::warn!("Auth start returned no URL: {}", error);
                }
                let ack = self.backend.authenticate().await?;
                if ack.success {
                    Ok(self.check_session().await)
                } else {
                    Err(Error::api_or(ack.error, "Authentication failed"))
                }
            }
        }
    }

    /// End the session. Returns `Ok(false)` when the user declines the
    /// confirmation; on success the signed-out state is broadcast to every
    /// subscribed region.
    pub async fn sign_out(&self, prompt: &dyn AuthPrompt) -> Result<bool> {
        if !prompt.confirm_sign_out() {
            return Ok(false);
        }

        let ack = self.backend.logout().await?;
        if ack.success {
            self.sender.send_replace(Session::signed_out());
            tracing::info!("Signed out");
            Ok(true)
        } else {
            Err(Error::api_or(ack.error, "Logout failed"))
        }
    }
}
