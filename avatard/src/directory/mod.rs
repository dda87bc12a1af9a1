//! Subject directory
//!
//! Users and communities are owned by the surrounding social network. The
//! avatar endpoint only needs to find them and ask where their avatar lives.

mod memory;
mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::ResourceLocator;

pub use memory::MemoryDirectory;
pub use sqlite::SqliteDirectory;

/// End-user record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Id of the current avatar image, if one was uploaded
    pub avatar: Option<String>,
}

impl User {
    /// Locator of the user's current avatar
    pub fn avatar_locator(&self, format: Option<&str>) -> Option<ResourceLocator> {
        self.avatar
            .as_deref()
            .map(|id| ResourceLocator::new(id, format))
    }
}

/// Community record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Community {
    pub id: String,
    pub title: String,
    pub avatar: Option<String>,
}

impl Community {
    /// Locator of the community's avatar
    pub fn avatar_locator(&self, format: Option<&str>) -> Option<ResourceLocator> {
        self.avatar
            .as_deref()
            .map(|id| ResourceLocator::new(id, format))
    }
}

/// Directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("directory unavailable")]
    Unavailable,
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Find a user by email (case-insensitive)
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;

    /// Load a community by id
    async fn load_community(&self, id: &str) -> Result<Option<Community>, DirectoryError>;
}
