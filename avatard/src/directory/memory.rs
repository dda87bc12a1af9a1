//! In-memory directory

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Community, Directory, DirectoryError, User};

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    /// Keyed by lowercased email
    users: RwLock<HashMap<String, User>>,
    communities: RwLock<HashMap<String, Community>>,
    unavailable: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.write().insert(user.email.to_lowercase(), user);
    }

    pub fn add_community(&self, community: Community) {
        self.communities
            .write()
            .insert(community.id.clone(), community);
    }

    /// Make every lookup fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        self.check()?;
        Ok(self.users.read().get(&email.trim().to_lowercase()).cloned())
    }

    async fn load_community(&self, id: &str) -> Result<Option<Community>, DirectoryError> {
        self.check()?;
        Ok(self.communities.read().get(id).cloned())
    }
}
