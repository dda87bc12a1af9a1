//! Subject resolution
//!
//! Each subject kind has one `Resolve` strategy that turns a request into a
//! `ResourceLocator`. Failures are always one of:
//! - `NotFound`: no subject, or the subject has no avatar
//! - `ServerError`: an infrastructure failure worth telling apart in logs
//!
//! Both end in the same redirect; see `fallback`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::request::{AvatarRequest, SubjectKind};
use crate::directory::Directory;
use crate::store::ResourceLocator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("subject not found")]
    NotFound,

    #[error("server error: {0}")]
    ServerError(String),
}

/// Strategy resolving one subject kind
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, request: &AvatarRequest) -> Result<ResourceLocator, ResolveError>;
}

/// End-user avatar, looked up by email
pub struct UserResolver {
    directory: Arc<dyn Directory>,
}

impl UserResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Resolve for UserResolver {
    async fn resolve(&self, request: &AvatarRequest) -> Result<ResourceLocator, ResolveError> {
        // Lookup errors are reported as NotFound so an email never leaks detail
        let user = match self.directory.find_user_by_email(&request.key).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("No user for avatar email");
                return Err(ResolveError::NotFound);
            }
            Err(e) => {
                warn!("User lookup failed: {}", e);
                return Err(ResolveError::NotFound);
            }
        };

        user.avatar_locator(request.format.as_deref())
            .ok_or(ResolveError::NotFound)
    }
}

/// Community avatar, loaded by id
pub struct CommunityResolver {
    directory: Arc<dyn Directory>,
}

impl CommunityResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Resolve for CommunityResolver {
    async fn resolve(&self, request: &AvatarRequest) -> Result<ResourceLocator, ResolveError> {
        let community = match self.directory.load_community(&request.key).await {
            Ok(Some(community)) => community,
            Ok(None) => {
                debug!("No community {}", request.key);
                return Err(ResolveError::NotFound);
            }
            Err(e) => {
                warn!("Community {} load failed: {}", request.key, e);
                return Err(ResolveError::ServerError(e.to_string()));
            }
        };

        community
            .avatar_locator(request.format.as_deref())
            .ok_or(ResolveError::NotFound)
    }
}

/// Raw image: the id is the locator
pub struct ImageResolver;

#[async_trait]
impl Resolve for ImageResolver {
    async fn resolve(&self, request: &AvatarRequest) -> Result<ResourceLocator, ResolveError> {
        Ok(ResourceLocator::new(
            request.key.as_str(),
            request.format.as_deref(),
        ))
    }
}

/// One strategy per subject kind
#[derive(Clone)]
pub struct Resolvers {
    user: Arc<dyn Resolve>,
    community: Arc<dyn Resolve>,
    image: Arc<dyn Resolve>,
}

impl Resolvers {
    /// Default strategies over a directory
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            user: Arc::new(UserResolver::new(directory.clone())),
            community: Arc::new(CommunityResolver::new(directory)),
            image: Arc::new(ImageResolver),
        }
    }

    /// Strategy for a subject kind
    pub fn for_kind(&self, kind: SubjectKind) -> &dyn Resolve {
        match kind {
            SubjectKind::User => self.user.as_ref(),
            SubjectKind::Community => self.community.as_ref(),
            SubjectKind::Image => self.image.as_ref(),
        }
    }

    /// Resolve with the strategy matching the request's kind
    pub async fn resolve(&self, request: &AvatarRequest) -> Result<ResourceLocator, ResolveError> {
        self.for_kind(request.kind).resolve(request).await
    }
}
