//! avatard - avatar resource delivery daemon
//!
//! Resolves avatars for users, communities and raw images, serves them with
//! conditional-GET semantics, and falls back to placeholder redirects.

pub mod api;
pub mod avatars;
pub mod config;
pub mod db;
pub mod directory;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use avatars::AvatarService;
use db::Database;
use directory::{Directory, SqliteDirectory};
use store::{ObjectStore, SqliteObjectStore};

pub use config::{Config, LogFormat};

/// The avatard server instance
pub struct Server {
    config: Config,
    db: Arc<Database>,
    avatars: Arc<AvatarService>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server backed by the SQLite directory and object store
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(config.db_path.as_deref()).await?;
        let directory = Arc::new(SqliteDirectory::new(db.pool().clone()));
        let store = Arc::new(SqliteObjectStore::new(db.pool().clone()));

        Ok(Self::with_collaborators(config, db, directory, store))
    }

    /// Create a server over explicit collaborators
    pub fn with_collaborators(
        config: Config,
        db: Database,
        directory: Arc<dyn Directory>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let avatars =
            AvatarService::with_collaborators(directory, store, config.placeholders.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            db: Arc::new(db),
            avatars: Arc::new(avatars),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get the database handle
    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Build the router
    fn router(&self) -> Router {
        let state = api::AppState {
            db: self.db.clone(),
            avatars: self.avatars.clone(),
        };
        api::router(state, self.config.static_dir.as_deref())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("avatard listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("avatard shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
