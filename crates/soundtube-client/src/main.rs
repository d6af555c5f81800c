use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use soundtube_client::notifier::{ViewEvent, ViewNotifier};
use soundtube_client::{
    AudioFile, FeedState, HttpTransport, PendingUpload, SoundClient, UploadPhase,
};
use soundtube_proto::config::Config;
use soundtube_proto::protocol::{ReactionType, Subject, Track, UserReaction};
use soundtube_proto::storage::FileSessionStorage;

#[derive(Debug, Parser)]
#[command(name = "soundtube", version, about = "Share and discuss audio tracks")]
struct Cli {
    /// Config file (defaults to ~/.config/soundtube/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend origin from the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SOUNDTUBE_PASSWORD")]
        password: String,
    },
    /// Log in and show the feed
    Login {
        username: String,
        #[arg(long, env = "SOUNDTUBE_PASSWORD")]
        password: String,
    },
    Logout,
    /// Show who is logged in
    Whoami,
    /// List tracks
    Feed,
    /// Show a track's reaction counters
    Reactions { track_id: i64 },
    /// Like or dislike a track
    React { track_id: i64, reaction: ReactionType },
    /// Remove your reaction from a track
    Unreact { track_id: i64 },
    /// Show a track's comments
    Comments { track_id: i64 },
    /// Comment on a track
    Comment { track_id: i64, text: String },
    /// Like or dislike a comment on a track
    ReactComment {
        track_id: i64,
        comment_id: i64,
        reaction: ReactionType,
    },
    /// Create a track and upload its audio file
    Upload {
        file: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        album: String,
        #[arg(long)]
        genre: String,
    },
}

/// Renders view events as plain text on stdout.
struct ConsoleNotifier;

impl ViewNotifier for ConsoleNotifier {
    fn notify(&self, event: &ViewEvent) {
        match event {
            ViewEvent::SessionChanged { user_name: Some(name) } => println!("Hello, {name}!"),
            ViewEvent::SessionChanged { user_name: None } => println!("Logged out."),
            ViewEvent::FeedChanged(FeedState::Unauthenticated) => {
                println!("Log in to see tracks.")
            }
            ViewEvent::FeedChanged(FeedState::Empty) => {
                println!("No tracks yet. Be the first to upload one!")
            }
            ViewEvent::FeedChanged(FeedState::Populated(tracks)) => {
                for track in tracks {
                    println!("{}", format_track(track));
                }
            }
            ViewEvent::ReactionsChanged {
                subject,
                counts: Some(counts),
            } => println!(
                "{subject}: {} likes, {} dislikes{}",
                counts.likes,
                counts.dislikes,
                match counts.user_reaction {
                    UserReaction::Liked => " (you liked this)",
                    UserReaction::Disliked => " (you disliked this)",
                    UserReaction::None => "",
                }
            ),
            ViewEvent::ReactionsChanged { counts: None, .. } => {}
            ViewEvent::ThreadChanged { sound_id, comments } => {
                println!("Comments on track #{sound_id}:");
                if comments.is_empty() {
                    println!("  (none yet)");
                }
                for c in comments {
                    let when = c
                        .created_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!(
                        "  #{} {} {} [+{} -{}]: {}",
                        c.id, c.author_name, when, c.likes, c.dislikes, c.text
                    );
                }
            }
            ViewEvent::ThreadClosed { .. } => {}
            ViewEvent::UploadChanged(UploadPhase::MetadataSubmitted) => {
                println!("Track record created, uploading file...")
            }
            ViewEvent::UploadChanged(UploadPhase::Committed) => {
                println!("Track created and file uploaded.")
            }
            ViewEvent::UploadChanged(_) => {}
        }
    }
}

fn format_track(track: &Track) -> String {
    let author = track
        .author_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let audio = match &track.file_path {
        Some(path) => format!("/static/{path}"),
        None => "no audio uploaded".to_string(),
    };
    format!(
        "#{:<5} {} - {} [{}] by author {} (+{} -{}) {}",
        track.id, track.name, track.album, track.genre, author, track.likes, track.dislikes, audio
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = soundtube_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("soundtube.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    tracing::debug!("soundtube log: {}", log_path.display());

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load config")?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    tracing::info!("soundtube starting against {}", config.api.base_url);

    let transport = Arc::new(HttpTransport::new(&config.api)?);
    let storage = Arc::new(FileSessionStorage::open(config.session.file.clone()));
    let mut client = SoundClient::new(transport, storage, Arc::new(ConsoleNotifier));

    if let Err(e) = run(&mut client, cli.command).await {
        eprintln!("error: {e}");
        eprintln!("(details in {})", log_path.display());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(client: &mut SoundClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Register {
            username,
            email,
            password,
        } => {
            client.register(&username, &email, &password).await?;
            println!("Registered {username}. You can log in now.");
        }
        Command::Login { username, password } => {
            client.login(&username, &password).await?;
        }
        Command::Logout => client.logout().await,
        Command::Whoami => match client.session().current().await {
            Some(session) => println!("{}", session.user_name),
            None => println!("Not logged in."),
        },
        Command::Feed => {
            client.refresh_feed().await?;
        }
        Command::Reactions { track_id } => {
            client.load_reactions(track_id).await?;
        }
        Command::React { track_id, reaction } => {
            client.set_reaction(Subject::track(track_id), reaction).await?;
        }
        Command::Unreact { track_id } => {
            client.clear_reaction(Subject::track(track_id)).await?;
        }
        Command::Comments { track_id } => {
            client.open_thread(track_id).await?;
        }
        Command::Comment { track_id, text } => {
            client.open_thread(track_id).await?;
            client.post_comment(&text).await?;
        }
        Command::ReactComment {
            track_id,
            comment_id,
            reaction,
        } => {
            client.open_thread(track_id).await?;
            client
                .set_reaction(Subject::comment(comment_id), reaction)
                .await?;
        }
        Command::Upload {
            file,
            name,
            album,
            genre,
        } => {
            let media_type = soundtube_client::upload::media_type_for(&file)
                .unwrap_or("application/octet-stream");
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());

            let mut pending = PendingUpload::new(name, album, genre);
            pending.select_file(AudioFile {
                file_name,
                media_type: media_type.to_string(),
                bytes,
            })?;
            client.stage_upload(pending);
            client.upload().await?;
        }
    }
    Ok(())
}
