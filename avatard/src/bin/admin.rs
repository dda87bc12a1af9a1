//! avatard_admin - seed the avatar database
//!
//! Adds users, communities and images to an avatard SQLite database.

use std::path::PathBuf;

use anyhow::{bail, Result};
use avatard::db::Database;
use avatard::directory::SqliteDirectory;
use avatard::store::{SqliteObjectStore, DEFAULT_RENDITION};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// avatard database administration tool
#[derive(Parser, Debug)]
#[command(
    name = "avatard_admin",
    version,
    about = "Seed users, communities and images into an avatard database"
)]
struct Args {
    /// Path to SQLite database file (created if missing)
    #[arg(short, long)]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a user
    AddUser {
        #[arg(long)]
        email: String,
        /// Id of the user's avatar image
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Add a community and print its id
    AddCommunity {
        #[arg(long)]
        title: String,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Store an image file and print its id
    AddImage {
        #[arg(long)]
        file: PathBuf,
        /// Image id (random when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Rendition tag
        #[arg(long, default_value = DEFAULT_RENDITION)]
        format: String,
        /// Content type (guessed from the extension when omitted)
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avatard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let db_path = args
        .database
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid database path: {}", args.database.display()))?;
    let db = Database::new(Some(db_path)).await?;

    match args.command {
        Command::AddUser { email, avatar } => {
            let directory = SqliteDirectory::new(db.pool().clone());
            let user = directory.create_user(&email, avatar.as_deref()).await?;
            println!("{}", user.id);
        }
        Command::AddCommunity { title, avatar } => {
            let directory = SqliteDirectory::new(db.pool().clone());
            let community = directory
                .create_community(&title, avatar.as_deref())
                .await?;
            println!("{}", community.id);
        }
        Command::AddImage {
            file,
            id,
            format,
            content_type,
        } => {
            if !file.exists() {
                bail!("Image file not found: {}", file.display());
            }

            let data = tokio::fs::read(&file)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;
            let content_type = content_type.unwrap_or_else(|| {
                mime_guess::from_path(&file)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            let store = SqliteObjectStore::new(db.pool().clone());
            let metadata = store
                .put(&id, &format, &data, &content_type, chrono::Utc::now())
                .await?;
            tracing::info!(
                "Stored {} ({} bytes, {})",
                id,
                metadata.content_length,
                metadata.identity
            );
            println!("{}", id);
        }
    }

    Ok(())
}
