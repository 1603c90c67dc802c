// view.rs - Typed view state and the render seam
//! Controllers never touch a real UI; they mutate a `ViewState` and hand it
//! to a `Surface`. Rendering is a pure function of the state, so the same
//! state rendered twice has no additional observable effect and every panel
//! transition is testable headlessly.

use crate::models::{Channel, MetadataPreview, Session, TaskSnapshot};
use chrono::{DateTime, Utc};

/// Render caps carried over from the metadata preview panel.
pub const MAX_PREVIEW_TAGS: usize = 15;
pub const MAX_PREVIEW_HASHTAGS: usize = 20;

/// Bounded toast history; older entries are dropped.
const MAX_TOASTS: usize = 8;

/// The page's primary panel. Exactly one is visible at a time, which rules
/// out the original's "progress and error both shown" class of bug.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Idle,
    Loading(String),
    Progress {
        title: String,
        percent: u8,
        message: String,
    },
    Success {
        watch_url: Option<String>,
    },
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// One auth surface (main panel, navbar, or mobile menu).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthRegion {
    pub signed_in: bool,
    pub channel_title: Option<String>,
    pub channel_stats: Option<String>,
    pub avatar_url: Option<String>,
}

/// All auth surfaces. "Signed in" is one boolean fanned out to every region;
/// the regions can never disagree because they are only written through
/// [`AuthRegions::apply`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthRegions {
    pub main: AuthRegion,
    pub navbar: AuthRegion,
    pub mobile: AuthRegion,
}

impl AuthRegions {
    pub fn apply(&mut self, session: &Session) {
        let region = region_for(session);
        self.main = region.clone();
        // The navbar shows subscribers only, matching the original layout.
        self.navbar = AuthRegion {
            channel_stats: session.channel.as_ref().map(subscriber_line),
            ..region.clone()
        };
        self.mobile = self.navbar.clone();
    }

    pub fn all_signed_out(&self) -> bool {
        !self.main.signed_in && !self.navbar.signed_in && !self.mobile.signed_in
    }
}

fn region_for(session: &Session) -> AuthRegion {
    match (session.authenticated, &session.channel) {
        (true, Some(channel)) => AuthRegion {
            signed_in: true,
            channel_title: Some(channel.title.clone()),
            channel_stats: Some(channel_line(channel)),
            avatar_url: channel.thumbnail.clone(),
        },
        (true, None) => AuthRegion {
            signed_in: true,
            ..AuthRegion::default()
        },
        _ => AuthRegion::default(),
    }
}

fn channel_line(channel: &Channel) -> String {
    format!(
        "{} subscribers • {} videos",
        format_count(channel.subscriber_count),
        format_count(channel.video_count)
    )
}

fn subscriber_line(channel: &Channel) -> String {
    format!("{} subscribers", format_count(channel.subscriber_count))
}

/// Humanize large counts the way the original pages did (1.2M, 3.4K).
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Full page state. Everything the original stored as element visibility or
/// text lives here as plain data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub auth: AuthRegions,
    pub panel: Option<Panel>,
    pub preview: Option<MetadataPreview>,
    pub gallery: Vec<String>,
    pub toasts: Vec<Toast>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            panel: Some(Panel::Idle),
            ..Self::default()
        }
    }

    pub fn panel(&self) -> &Panel {
        self.panel.as_ref().unwrap_or(&Panel::Idle)
    }

    pub fn toast(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.toasts.push(Toast {
            kind,
            message: message.into(),
            at: Utc::now(),
        });
        if self.toasts.len() > MAX_TOASTS {
            let overflow = self.toasts.len() - MAX_TOASTS;
            self.toasts.drain(..overflow);
        }
    }

    pub fn set_session(&mut self, session: &Session) {
        self.auth.apply(session);
    }

    pub fn show_loading(&mut self, message: impl Into<String>) {
        self.panel = Some(Panel::Loading(message.into()));
    }

    pub fn show_progress(&mut self, snapshot: &TaskSnapshot) {
        self.panel = Some(Panel::Progress {
            title: snapshot.status.title().to_string(),
            percent: snapshot.progress.min(100),
            message: snapshot.message.clone(),
        });
    }

    pub fn show_success(&mut self, watch_url: Option<String>) {
        self.panel = Some(Panel::Success { watch_url });
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.panel = Some(Panel::Error(message.into()));
    }

    /// Store a metadata preview, capped to the displayable tag counts.
    pub fn show_preview(&mut self, mut preview: MetadataPreview) {
        preview.tags.truncate(MAX_PREVIEW_TAGS);
        preview.hashtags.truncate(MAX_PREVIEW_HASHTAGS);
        self.preview = Some(preview);
    }

    /// Hide result panels and the preview; the idle panel stays operable.
    pub fn clear_results(&mut self) {
        self.panel = Some(Panel::Idle);
        self.preview = None;
    }
}

/// Render seam. Implementations must be idempotent with respect to equal
/// states.
pub trait Surface: Send {
    fn render(&mut self, state: &ViewState);
}

/// Terminal renderer for the CLI: narrates panel transitions and new toasts,
/// skipping states identical to the last rendered one.
pub struct TerminalSurface {
    last: Option<ViewState>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn render(&mut self, state: &ViewState) {
        if self.last.as_ref() == Some(state) {
            return;
        }

        let previous_toasts = self.last.as_ref().map(|s| s.toasts.len()).unwrap_or(0);
        for toast in state.toasts.iter().skip(previous_toasts) {
            let prefix = match toast.kind {
                ToastKind::Info => "·",
                ToastKind::Success => "✔",
                ToastKind::Warning => "!",
                ToastKind::Error => "✖",
            };
            println!("{} {}", prefix, toast.message);
        }

        let panel_changed = self.last.as_ref().map(|s| s.panel()) != Some(state.panel());
        if panel_changed {
            match state.panel() {
                Panel::Idle => {}
                Panel::Loading(message) => println!("… {}", message),
                Panel::Progress {
                    title,
                    percent,
                    message,
                } => println!("[{:>3}%] {} — {}", percent, title, message),
                Panel::Success { watch_url } => match watch_url {
                    Some(url) => println!("Done: {}", url),
                    None => println!("Done."),
                },
                Panel::Error(message) => println!("Error: {}", message),
            }
        }

        self.last = Some(state.clone());
    }
}

/// Records every rendered frame; used by headless embedders and tests.
#[derive(Default)]
pub struct RecordingSurface {
    pub frames: Vec<ViewState>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&ViewState> {
        self.frames.last()
    }
}

impl Surface for RecordingSurface {
    fn render(&mut self, state: &ViewState) {
        if self.frames.last() == Some(state) {
            return;
        }
        self.frames.push(state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskState;

    fn signed_in_session() -> Session {
        Session {
            authenticated: true,
            channel: Some(Channel {
                title: "Reel Channel".into(),
                thumbnail: Some("https://example.com/a.png".into()),
                subscriber_count: 1_234_000,
                video_count: 321,
            }),
        }
    }

    #[test]
    fn one_session_drives_all_three_regions() {
        let mut state = ViewState::new();
        state.set_session(&signed_in_session());
        assert!(state.auth.main.signed_in);
        assert!(state.auth.navbar.signed_in);
        assert!(state.auth.mobile.signed_in);
        assert_eq!(
            state.auth.main.channel_stats.as_deref(),
            Some("1.2M subscribers • 321 videos")
        );
        assert_eq!(
            state.auth.navbar.channel_stats.as_deref(),
            Some("1.2M subscribers")
        );

        state.set_session(&Session::signed_out());
        assert!(state.auth.all_signed_out());
        assert!(state.auth.navbar.channel_title.is_none());
    }

    #[test]
    fn format_count_humanizes() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_500), "1.5K");
        assert_eq!(format_count(2_400_000), "2.4M");
    }

    #[test]
    fn preview_is_capped_to_displayable_tags() {
        let mut state = ViewState::new();
        let preview = MetadataPreview {
            title: "t".into(),
            description: "d".into(),
            tags: (0..30).map(|i| format!("tag{}", i)).collect(),
            hashtags: (0..30).map(|i| format!("#h{}", i)).collect(),
            video_analysis: None,
            video_file: None,
        };
        state.show_preview(preview);
        let stored = state.preview.as_ref().unwrap();
        assert_eq!(stored.tags.len(), MAX_PREVIEW_TAGS);
        assert_eq!(stored.hashtags.len(), MAX_PREVIEW_HASHTAGS);
    }

    #[test]
    fn progress_panel_follows_snapshot() {
        let mut state = ViewState::new();
        let snapshot = TaskSnapshot {
            id: None,
            status: TaskState::Uploading,
            progress: 55,
            message: "Uploading to YouTube...".into(),
            metadata: None,
            youtube_url: None,
            error: None,
        };
        state.show_progress(&snapshot);
        match state.panel() {
            Panel::Progress {
                title, percent, ..
            } => {
                assert_eq!(title, "Uploading to YouTube");
                assert_eq!(*percent, 55);
            }
            other => panic!("unexpected panel: {:?}", other),
        }
    }

    #[test]
    fn recording_surface_skips_identical_states() {
        let mut surface = RecordingSurface::new();
        let mut state = ViewState::new();
        surface.render(&state);
        surface.render(&state);
        assert_eq!(surface.frames.len(), 1);

        state.show_loading("working");
        surface.render(&state);
        assert_eq!(surface.frames.len(), 2);
    }

    #[test]
    fn toast_history_is_bounded() {
        let mut state = ViewState::new();
        for i in 0..20 {
            state.toast(ToastKind::Info, format!("toast {}", i));
        }
        assert_eq!(state.toasts.len(), 8);
        assert_eq!(state.toasts.last().unwrap().message, "toast 19");
    }
}
