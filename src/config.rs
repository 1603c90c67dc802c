// config.rs - Environment-driven client configuration
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the client. Every field has a sensible default
/// so the binary works against a local backend with no environment at all.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the repurposing backend.
    pub base_url: String,
    /// Cadence between successful task-status reads.
    pub poll_interval: Duration,
    /// Overall deadline for a poll loop before it surfaces a timeout.
    pub poll_deadline: Duration,
    /// Cadence for checking whether the auth window has been closed.
    pub auth_check_interval: Duration,
    /// Where `download` saves fetched videos.
    pub download_dir: PathBuf,
    /// Where the offline shell cache is persisted.
    pub cache_dir: PathBuf,
    /// Delay before the best-effort server-side cleanup after a download.
    pub cleanup_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            poll_interval: Duration::from_secs(2),
            poll_deadline: Duration::from_secs(30 * 60),
            auth_check_interval: Duration::from_secs(1),
            download_dir: PathBuf::from("downloads"),
            cache_dir: PathBuf::from("offline-cache"),
            cleanup_delay: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Build a config from `REELCAST_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("REELCAST_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        Self {
            base_url,
            poll_interval: env_secs("REELCAST_POLL_INTERVAL_SECS", defaults.poll_interval),
            poll_deadline: env_secs("REELCAST_POLL_DEADLINE_SECS", defaults.poll_deadline),
            auth_check_interval: defaults.auth_check_interval,
            download_dir: std::env::var("REELCAST_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            cache_dir: std::env::var("REELCAST_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            cleanup_delay: env_secs("REELCAST_CLEANUP_DELAY_SECS", defaults.cleanup_delay),
        }
    }
}

fn env_secs(key: &str, fallback: Duration) -> Duration {
    match std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(secs) => Duration::from_secs(secs),
        None => fallback,
    }
}
