#![forbid(unsafe_code)]

//! `resurfacer`: manage saved posts and their review schedule.
//!
//! Every subcommand opens the configured `SQLite` store, applies one
//! operation, and prints the affected records as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use feed_resurfacer::config::GlobalConfig;
use feed_resurfacer::models::item::{PostPayload, SavedItem};
use feed_resurfacer::models::review::ReviewOutcome;
use feed_resurfacer::persistence::db;
use feed_resurfacer::persistence::item_repo::{ItemRepo, Snapshot};
use feed_resurfacer::review::{now_ms, ReviewService, Scheduler};
use feed_resurfacer::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "resurfacer", about = "Spaced-repetition store for saved posts", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the database path from the configuration.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save a post for review; it becomes due one day from now.
    Save {
        /// Stable post identifier.
        #[arg(long)]
        id: String,
        /// Link to the original post.
        #[arg(long)]
        url: String,
        /// Author handle.
        #[arg(long, default_value = "")]
        handle: String,
        /// Post text.
        #[arg(long, default_value = "")]
        text: String,
        /// Author profile URL.
        #[arg(long)]
        account_link: Option<String>,
        /// Author profile picture URL.
        #[arg(long)]
        profile_pic: Option<String>,
        /// Attached media URL.
        #[arg(long)]
        media_url: Option<String>,
        /// Quoted post URL.
        #[arg(long)]
        quoted_url: Option<String>,
        /// Outbound link (repeatable).
        #[arg(long = "link")]
        links: Vec<String>,
    },

    /// List every saved post.
    List,

    /// List posts that are due now.
    Due,

    /// Record that a post was remembered.
    Remember {
        /// Post identifier.
        id: String,
    },

    /// Record that a post was forgotten.
    Forget {
        /// Post identifier.
        id: String,
    },

    /// Make a post due immediately.
    ReviewToday {
        /// Post identifier.
        id: String,
    },

    /// Halve the remaining wait before a post is due.
    ReviewEarlier {
        /// Post identifier.
        id: String,
    },

    /// Delete a saved post.
    Remove {
        /// Post identifier.
        id: String,
    },

    /// Delete every saved post.
    Clear,

    /// Write all saved posts to a JSON snapshot.
    Export {
        /// Destination file.
        path: PathBuf,
    },

    /// Load saved posts from a JSON snapshot, overwriting matching ids.
    Import {
        /// Source file.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(db_path) = args.db {
        config.db_path = db_path;
    }

    let pool = Arc::new(db::connect(&config.db_path).await?);
    let repo = ItemRepo::new(Arc::clone(&pool));
    let service = ReviewService::new(Arc::new(repo.clone()), Scheduler::new(config.time_scale));
    let now = now_ms();

    match args.command {
        Command::Save {
            id,
            url,
            handle,
            text,
            account_link,
            profile_pic,
            media_url,
            quoted_url,
            links,
        } => {
            let payload = PostPayload {
                url,
                handle,
                profile_pic,
                account_link,
                text,
                media_url,
                quoted_tweet_url: quoted_url,
                links,
                metrics: None,
            };
            let item = service.save(id, payload, now).await?;
            print_item(&item)?;
        }
        Command::List => {
            for item in service.list().await? {
                print_item(&item)?;
            }
        }
        Command::Due => {
            for item in service.due_items(now).await? {
                print_item(&item)?;
            }
        }
        Command::Remember { id } => {
            let item = service.mark(&id, ReviewOutcome::Positive, now).await?;
            print_item(&found(item, &id)?)?;
        }
        Command::Forget { id } => {
            let item = service.mark(&id, ReviewOutcome::Negative, now).await?;
            print_item(&found(item, &id)?)?;
        }
        Command::ReviewToday { id } => {
            let item = service.review_today(&id, now).await?;
            print_item(&found(item, &id)?)?;
        }
        Command::ReviewEarlier { id } => {
            let item = service.review_earlier(&id, now).await?;
            print_item(&found(item, &id)?)?;
        }
        Command::Remove { id } => {
            if !service.remove(&id).await? {
                return Err(AppError::NotFound(format!("no saved item {id}")));
            }
            info!(item_id = %id, "item removed");
        }
        Command::Clear => {
            service.clear().await?;
        }
        Command::Export { path } => {
            let snapshot = repo.export_snapshot().await?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(&path, json)
                .map_err(|err| AppError::Io(format!("failed to write {}: {err}", path.display())))?;
            info!(items = snapshot.saved_items.len(), path = %path.display(), "snapshot exported");
        }
        Command::Import { path } => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|err| AppError::Io(format!("failed to read {}: {err}", path.display())))?;
            let snapshot: Snapshot = serde_json::from_str(&raw)?;
            let written = repo.import_snapshot(snapshot, config.time_scale).await?;
            info!(items = written, path = %path.display(), "snapshot imported");
        }
    }

    Ok(())
}

fn found(item: Option<SavedItem>, id: &str) -> Result<SavedItem> {
    item.ok_or_else(|| AppError::NotFound(format!("no saved item {id}")))
}

fn print_item(item: &SavedItem) -> Result<()> {
    println!("{}", serde_json::to_string(item)?);
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
