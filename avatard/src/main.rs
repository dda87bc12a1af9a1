//! avatard - avatar resource delivery daemon

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use avatard::{Config, LogFormat, Server};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Avatar delivery daemon
#[derive(Parser, Debug)]
#[command(name = "avatard", version, about = "Serve user, community and image avatars")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// SQLite database file (overrides config)
    #[arg(short, long)]
    database: Option<String>,

    /// Directory served under /images (overrides config)
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "avatard=info,tower_http=debug".into());

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = args.database {
        config.db_path = Some(database);
    }
    if let Some(static_dir) = args.static_dir {
        config.static_dir = Some(static_dir);
    }

    init_tracing(config.log_format);

    let server = Arc::new(Server::new(config).await?);

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            signal_server.shutdown();
        }
    });

    server.run().await?;

    Ok(())
}
