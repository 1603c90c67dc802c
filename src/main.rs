use clap::{Parser, Subcommand};
use reelcast::backend::HttpBackend;
use reelcast::controller::{PageController, PageKind, UploadSource};
use reelcast::editing::{EditingForm, MusicSource, OverlayForm};
use reelcast::session::{AuthPrompt, AuthWindow};
use reelcast::view::TerminalSurface;
use reelcast::{AppState, ClientConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "reelcast", version, about = "Repurpose Instagram Reels to YouTube Shorts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Session management
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Submit a reel URL for the full download-edit-upload pipeline
    Upload {
        url: String,
        #[command(flatten)]
        editing: EditingArgs,
    },
    /// Submit a video file from this machine
    UploadLocal {
        file: PathBuf,
        #[command(flatten)]
        editing: EditingArgs,
    },
    /// Download a reel without uploading it
    Download { url: String },
    /// Generate AI metadata for a reel without uploading
    Preview { url: String },
    /// Generate AI metadata without uploading
    Metadata {
        #[command(subcommand)]
        command: MetadataCommand,
    },
    /// Server-side video gallery
    Gallery {
        #[command(subcommand)]
        command: GalleryCommand,
    },
    /// List videos stored on the server by previous downloads
    Downloads,
    /// Warm the offline shell cache, persisted under the cache directory
    Cache,
    /// Check backend health
    Health,
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Show the current session
    Status,
    /// Run the sign-in flow
    SignIn,
    /// End the session
    SignOut,
}

#[derive(Subcommand)]
enum MetadataCommand {
    /// Analyze a reel by URL
    Reel { url: String },
    /// Analyze a video stored in the gallery
    Gallery { video_file: String },
}

#[derive(Subcommand)]
enum GalleryCommand {
    /// List stored gallery videos
    List,
    /// Store a video file in the gallery
    Add { file: PathBuf },
}

#[derive(clap::Args)]
struct EditingArgs {
    /// Background music URL
    #[arg(long, conflicts_with = "music_file")]
    music_url: Option<String>,
    /// Background music file to upload
    #[arg(long)]
    music_file: Option<PathBuf>,
    /// Music volume, 0-100
    #[arg(long, default_value_t = 30)]
    music_volume: u8,
    /// Text overlay as "text@position:seconds" (position and seconds optional)
    #[arg(long = "overlay", value_parser = parse_overlay)]
    overlays: Vec<OverlayForm>,
}

impl EditingArgs {
    fn into_form(self) -> EditingForm {
        let music = match (self.music_url, self.music_file) {
            (Some(url), _) => MusicSource::Url(url),
            (None, Some(path)) => MusicSource::File(path),
            (None, None) => MusicSource::None,
        };
        let enabled = music != MusicSource::None || !self.overlays.is_empty();
        EditingForm {
            enabled,
            music,
            music_volume_percent: self.music_volume,
            overlays: self.overlays,
        }
    }
}

fn parse_overlay(raw: &str) -> Result<OverlayForm, String> {
    let (text, rest) = match raw.split_once('@') {
        Some((text, rest)) => (text, Some(rest)),
        None => (raw, None),
    };
    if text.trim().is_empty() {
        return Err("overlay text must not be empty".to_string());
    }

    let (position, duration) = match rest {
        Some(rest) => match rest.split_once(':') {
            Some((position, seconds)) => {
                let seconds: u32 = seconds
                    .parse()
                    .map_err(|_| format!("invalid overlay duration: {}", seconds))?;
                (position.to_string(), Some(seconds))
            }
            None => (rest.to_string(), None),
        },
        None => ("bottom".to_string(), None),
    };

    Ok(OverlayForm {
        text: text.to_string(),
        position,
        duration,
    })
}

/// Interactive prompt for the terminal. The auth window is the user's own
/// browser; "closed" is signalled by pressing Enter.
struct TerminalPrompt;

struct EnterClosedWindow {
    closed: Arc<AtomicBool>,
}

impl AuthWindow for EnterClosedWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AuthPrompt for TerminalPrompt {
    fn confirm_sign_out(&self) -> bool {
        println!("Are you sure you want to sign out? [y/N]");
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim(), "y" | "Y" | "yes")
    }

    fn open_auth_window(&self, auth_url: &str) -> Box<dyn AuthWindow> {
        println!("Open this URL in your browser to sign in:");
        println!("  {}", auth_url);
        println!("Press Enter here once you have finished.");

        let closed = Arc::new(AtomicBool::new(false));
        let flag = closed.clone();
        std::thread::spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            flag.store(true, Ordering::SeqCst);
        });
        Box::new(EnterClosedWindow { closed })
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> reelcast::Result<()> {
    let config = ClientConfig::from_env();

    if let Err(e) = std::fs::create_dir_all(&config.download_dir) {
        tracing::warn!("Failed to create download directory: {}", e);
    }

    let backend = Arc::new(HttpBackend::new(config.base_url.clone()));
    let app = Arc::new(AppState::new(config, backend));
    let mut controller = PageController::new(app.clone(), PageKind::Reel, TerminalSurface::new());

    match cli.command {
        Command::Auth { command } => match command {
            AuthCommand::Status => {
                let mut session = app.session.check_session().await;
                if session.authenticated && session.channel.is_none() {
                    // check-auth answers with a slim payload; ask for the
                    // full channel details before printing.
                    if let Ok(full) = app.backend.channel_info().await {
                        session = full;
                    }
                }
                match session.channel {
                    Some(channel) => {
                        println!("Signed in as {}", channel.title);
                        println!(
                            "  {} subscribers, {} videos",
                            reelcast::view::format_count(channel.subscriber_count),
                            reelcast::view::format_count(channel.video_count)
                        );
                    }
                    None if session.authenticated => println!("Signed in (no channel info)"),
                    None => println!("Not signed in"),
                }
            }
            AuthCommand::SignIn => controller.sign_in(&TerminalPrompt).await?,
            AuthCommand::SignOut => {
                if !controller.sign_out(&TerminalPrompt).await? {
                    println!("Sign-out cancelled.");
                }
            }
        },
        Command::Upload { url, editing } => {
            controller.refresh_session().await;
            controller
                .submit_upload(UploadSource::ReelUrl(url), &editing.into_form())
                .await?;
        }
        Command::UploadLocal { file, editing } => {
            let mut controller =
                PageController::new(app.clone(), PageKind::LocalStudio, TerminalSurface::new());
            controller.refresh_session().await;
            controller
                .submit_upload(UploadSource::DeviceFile(file), &editing.into_form())
                .await?;
        }
        Command::Download { url } => {
            let path = controller.download(&url).await?;
            println!("Saved to {}", path.display());
        }
        Command::Preview { url } => {
            controller.preview(&url).await?;
            print_preview(&controller);
        }
        Command::Metadata { command } => {
            match command {
                MetadataCommand::Reel { url } => controller.metadata_for_reel(&url).await?,
                MetadataCommand::Gallery { video_file } => {
                    controller.metadata_for_gallery(&video_file).await?
                }
            }
            print_preview(&controller);
        }
        Command::Gallery { command } => match command {
            GalleryCommand::List => {
                controller.load_gallery().await?;
                if controller.view.gallery.is_empty() {
                    println!("Gallery is empty.");
                }
                for video in &controller.view.gallery {
                    println!("{}", video);
                }
            }
            GalleryCommand::Add { file } => {
                let filename =
                    reelcast::actions::upload_video_to_gallery(app.backend.as_ref(), &file).await?;
                println!("Stored as {}", filename);
            }
        },
        Command::Downloads => {
            let files = app.backend.list_downloads().await?;
            if files.is_empty() {
                println!("No server-side downloads.");
            }
            for entry in files {
                match entry.size {
                    Some(size) => println!("{}  ({} bytes)", entry.filename, size),
                    None => println!("{}", entry.filename),
                }
            }
        }
        Command::Cache => {
            use reelcast::offline::{AssetCache, DirStore, HttpAssetFetch, PRECACHE_PATHS};
            let fetch = HttpAssetFetch::new(reqwest::Client::new(), app.config.base_url.clone());
            let cache = AssetCache::new(
                Arc::new(DirStore::new(&app.config.cache_dir)),
                Arc::new(fetch),
            );
            cache.install().await?;
            cache.activate();
            println!(
                "Cached {} shell assets under {}:",
                PRECACHE_PATHS.len(),
                app.config.cache_dir.display()
            );
            for path in PRECACHE_PATHS {
                println!("  {}", path);
            }
        }
        Command::Health => {
            let health = app.backend.health().await?;
            println!("{:#}", health);
        }
    }

    Ok(())
}

fn print_preview<S: reelcast::view::Surface>(controller: &PageController<S>) {
    if let Some(preview) = &controller.view.preview {
        println!("Title: {}", preview.title);
        println!("Description:\n{}", preview.description);
        if !preview.tags.is_empty() {
            println!("Tags: {}", preview.tags.join(", "));
        }
        if !preview.hashtags.is_empty() {
            println!("Hashtags: {}", preview.hashtags.join(" "));
        }
        if let Some(analysis) = &preview.video_analysis {
            println!("Analysis:\n{}", analysis);
        }
    }
}

// Logging configuration shared by every subcommand
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,reelcast=trace,reqwest=info,hyper=info".to_string()
        } else {
            "warn,reelcast=info,reqwest=warn,hyper=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Log level: {}", log_level);
    Ok(())
}
