// poller.rs - Bounded task-status polling
//! After a job is submitted the backend is the single source of truth; the
//! client only observes `/task-status/{id}` until a terminal state. The loop
//! keeps the original fixed 2 s cadence but is bounded: transient failures
//! retry with exponential backoff and the whole loop carries a deadline that
//! surfaces a timeout instead of polling forever against a stalled job.

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{TaskSnapshot, TaskState};
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cadence and bounds for one poll loop.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay between successful status reads.
    pub interval: Duration,
    /// Overall deadline before the loop gives up with `PollTimeout`.
    pub deadline: Duration,
    /// Cap for the transient-failure backoff.
    pub max_retry_interval: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval,
            deadline: config.poll_deadline,
            max_retry_interval: Duration::from_secs(30),
        }
    }

    fn transient_backoff(&self, remaining: Duration) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.interval)
            .with_max_interval(self.max_retry_interval)
            .with_max_elapsed_time(Some(remaining))
            .build()
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

pub struct TaskPoller {
    backend: Arc<dyn Backend>,
    policy: PollPolicy,
}

impl TaskPoller {
    pub fn new(backend: Arc<dyn Backend>, policy: PollPolicy) -> Self {
        Self { backend, policy }
    }

    /// Poll until the task reaches a terminal state. Every snapshot (terminal
    /// included) is handed to `on_snapshot` before the loop acts on it.
    ///
    /// Terminal outcomes: `Ok(snapshot)` for `completed`; `JobFailed` for
    /// `failed` (carrying the server's error text); `PollTimeout` when the
    /// deadline passes; `Cancelled` when the `cancel` channel flips or its
    /// sender is dropped. Transient tick failures are logged and retried,
    /// never surfaced per-tick.
    pub async fn run<F>(
        &self,
        task_id: &str,
        mut cancel: watch::Receiver<bool>,
        mut on_snapshot: F,
    ) -> Result<TaskSnapshot>
    where
        F: FnMut(&TaskSnapshot),
    {
        let started = Instant::now();
        let deadline = started + self.policy.deadline;
        let mut ticker =
            tokio::time::interval_at(started + self.policy.interval, self.policy.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut retry = self.policy.transient_backoff(self.policy.deadline);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::debug!("Polling for task {} cancelled", task_id);
                        return Err(Error::Cancelled);
                    }
                    continue;
                }
            }

            if Instant::now() >= deadline {
                tracing::warn!("Task {} never reached a terminal state", task_id);
                return Err(Error::PollTimeout(self.policy.deadline));
            }

            match self.backend.task_status(task_id).await {
                Ok(snapshot) => {
                    // A good read resets the transient budget.
                    retry = self
                        .policy
                        .transient_backoff(deadline.saturating_duration_since(Instant::now()));
                    on_snapshot(&snapshot);

                    match snapshot.status {
                        TaskState::Completed => {
                            tracing::info!("Task {} completed", task_id);
                            return Ok(snapshot);
                        }
                        TaskState::Failed => {
                            let message = snapshot
                                .error
                                .clone()
                                .unwrap_or_else(|| "Upload failed".to_string());
                            tracing::warn!("Task {} failed: {}", task_id, message);
                            return Err(Error::JobFailed(message));
                        }
                        _ => {}
                    }
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!("Status check for task {} failed (will retry): {}", task_id, e);
                    match retry.next_backoff() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(Error::PollTimeout(self.policy.deadline)),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
