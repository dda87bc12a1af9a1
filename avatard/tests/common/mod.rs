//! Common test utilities - AvatardTest harness for end-to-end testing

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use avatard::db::Database;
use avatard::directory::{Directory, SqliteDirectory};
use avatard::store::{ObjectStore, SqliteObjectStore};
use avatard::{Config, Server};
use reqwest::Client;
use tokio::task::JoinHandle;

/// Test harness that spawns a real avatard server on a random port
pub struct AvatardTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl AvatardTest {
    /// Start a server with the SQLite collaborators and an in-memory database
    pub async fn start() -> Result<Self> {
        Self::start_with_config(Config::default()).await
    }

    /// Start a server with a custom config (bind address is replaced)
    pub async fn start_with_config(mut config: Config) -> Result<Self> {
        config.bind_addr = free_addr()?;
        config.db_path = None; // In-memory for tests
        let server = Server::new(config).await?;
        Self::launch(server).await
    }

    /// Start a server over explicit collaborators
    pub async fn start_with_collaborators(
        directory: Arc<dyn Directory>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        let config = Config {
            bind_addr: free_addr()?,
            ..Config::default()
        };
        let db = Database::new(None).await?;
        let server = Server::with_collaborators(config, db, directory, store);
        Self::launch(server).await
    }

    async fn launch(server: Server) -> Result<Self> {
        let addr = server.bind_addr();
        let server = Arc::new(server);
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        // Redirects must be observed, not followed
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a GET request with an If-Modified-Since header
    pub async fn get_if_modified_since(
        &self,
        path: &str,
        since: &str,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .header("If-Modified-Since", since)
            .send()
            .await?)
    }

    /// Get direct access to the database for test setup/assertions
    pub fn db(&self) -> Arc<Database> {
        self.server.db()
    }

    /// Directory over the server's database
    pub fn directory(&self) -> SqliteDirectory {
        SqliteDirectory::new(self.db().pool().clone())
    }

    /// Object store over the server's database
    pub fn store(&self) -> SqliteObjectStore {
        SqliteObjectStore::new(self.db().pool().clone())
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

impl Drop for AvatardTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}

/// Find a random available port
fn free_addr() -> Result<SocketAddr> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}
