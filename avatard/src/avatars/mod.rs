//! Avatar delivery
//!
//! Per request:
//! 1. `request`: validate the query into an `AvatarRequest` (400 on failure)
//! 2. `resolver`: find the stored object behind the subject
//! 3. `delivery`: conditional GET against the object store
//! 4. `fallback`: any failure after step 1 redirects to the kind's placeholder
//!
//! Resolution always finishes before delivery starts.

mod delivery;
mod fallback;
mod request;
mod resolver;
mod stream;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::directory::Directory;
use crate::store::{ObjectMetadata, ObjectStore};

pub use delivery::{
    format_http_date, is_unmodified, parse_http_date, truncate_to_second, DeliveryEngine,
    DeliveryOutcome,
};
pub use fallback::{Failure, FallbackPolicy, Placeholders};
pub use request::{AvatarQuery, AvatarRequest, SubjectKind, ValidationError};
pub use resolver::{
    CommunityResolver, ImageResolver, Resolve, ResolveError, Resolvers, UserResolver,
};
pub use stream::{ByteStream, Release};

/// Terminal result of an avatar request
#[derive(Debug)]
pub enum AvatarOutcome {
    /// 304, no body
    NotModified,
    /// 200 with Last-Modified and the object content
    Transfer {
        metadata: ObjectMetadata,
        stream: ByteStream,
    },
    /// 302 to a placeholder
    Redirect(String),
}

/// Resolver, delivery engine and fallback policy composed
#[derive(Clone)]
pub struct AvatarService {
    resolvers: Resolvers,
    delivery: DeliveryEngine,
    fallback: FallbackPolicy,
}

impl AvatarService {
    pub fn new(resolvers: Resolvers, delivery: DeliveryEngine, fallback: FallbackPolicy) -> Self {
        Self {
            resolvers,
            delivery,
            fallback,
        }
    }

    /// Default strategies over the given collaborators
    pub fn with_collaborators(
        directory: Arc<dyn Directory>,
        store: Arc<dyn ObjectStore>,
        placeholders: Placeholders,
    ) -> Self {
        Self::new(
            Resolvers::new(directory),
            DeliveryEngine::new(store),
            FallbackPolicy::new(placeholders),
        )
    }

    /// Serve a validated request
    pub async fn serve(&self, request: &AvatarRequest, token: Option<DateTime<Utc>>) -> AvatarOutcome {
        let locator = match self.resolvers.resolve(request).await {
            Ok(locator) => locator,
            Err(e) => return self.redirect(request, e.into()),
        };

        match self.delivery.deliver(&locator, token).await {
            DeliveryOutcome::NotModified => AvatarOutcome::NotModified,
            DeliveryOutcome::FullTransfer { metadata, stream } => {
                AvatarOutcome::Transfer { metadata, stream }
            }
            DeliveryOutcome::Unavailable => self.redirect(request, Failure::Unavailable),
        }
    }

    fn redirect(&self, request: &AvatarRequest, failure: Failure) -> AvatarOutcome {
        AvatarOutcome::Redirect(self.fallback.redirect(request.kind, &failure).to_string())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::TimeZone;
    use futures_util::TryStreamExt;

    use super::*;
    use crate::directory::{Community, MemoryDirectory, User};
    use crate::store::{MemoryObjectStore, DEFAULT_RENDITION};

    struct Fixture {
        directory: Arc<MemoryDirectory>,
        store: Arc<MemoryObjectStore>,
        service: AvatarService,
    }

    fn modified() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_250).unwrap()
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(MemoryDirectory::new());
        directory.add_user(User {
            id: "u1".into(),
            email: "alice@example.com".into(),
            avatar: Some("img-alice".into()),
        });
        directory.add_user(User {
            id: "u2".into(),
            email: "dangling@example.com".into(),
            avatar: Some("img-gone".into()),
        });
        directory.add_community(Community {
            id: "c1".into(),
            title: "Rustaceans".into(),
            avatar: Some("img-c1".into()),
        });

        let store = Arc::new(MemoryObjectStore::new());
        store.insert("img-alice", DEFAULT_RENDITION, &b"alice"[..], "image/png", modified());
        store.insert("img-c1", DEFAULT_RENDITION, &b"community"[..], "image/png", modified());
        store.insert("img-raw", "original", &b"raw original"[..], "image/jpeg", modified());

        let service = AvatarService::with_collaborators(
            directory.clone(),
            store.clone(),
            Placeholders::default(),
        );
        Fixture {
            directory,
            store,
            service,
        }
    }

    fn request(kind: SubjectKind, key: &str, format: Option<&str>) -> AvatarRequest {
        AvatarRequest {
            kind,
            key: key.into(),
            format: format.map(Into::into),
        }
    }

    async fn body(outcome: AvatarOutcome) -> Vec<u8> {
        match outcome {
            AvatarOutcome::Transfer { stream, .. } => {
                let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
                chunks.concat()
            }
            other => panic!("expected transfer, got {:?}", other),
        }
    }

    fn location(outcome: AvatarOutcome) -> String {
        match outcome {
            AvatarOutcome::Redirect(location) => location,
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_each_kind_transfers() {
        let f = fixture();
        let user = f
            .service
            .serve(&request(SubjectKind::User, "alice@example.com", None), None)
            .await;
        assert_eq!(body(user).await, b"alice");

        let community = f
            .service
            .serve(&request(SubjectKind::Community, "c1", None), None)
            .await;
        assert_eq!(body(community).await, b"community");

        let image = f
            .service
            .serve(&request(SubjectKind::Image, "img-raw", Some("original")), None)
            .await;
        assert_eq!(body(image).await, b"raw original");
    }

    #[tokio::test]
    async fn test_resolve_failures_use_subject_placeholder() {
        let f = fixture();
        let unknown = f
            .service
            .serve(&request(SubjectKind::User, "ghost@example.com", None), None)
            .await;
        assert_eq!(location(unknown), "/images/not_a_user.png");

        f.directory.set_unavailable(true);
        let outage = f
            .service
            .serve(&request(SubjectKind::Community, "c1", None), None)
            .await;
        assert_eq!(location(outage), "/images/not_a_user.png");
    }

    #[tokio::test]
    async fn test_store_failures_keep_the_kind_placeholder() {
        let f = fixture();
        let dangling = f
            .service
            .serve(&request(SubjectKind::User, "dangling@example.com", None), None)
            .await;
        assert_eq!(location(dangling), "/images/not_a_user.png");

        let missing = f
            .service
            .serve(&request(SubjectKind::Image, "nope", None), None)
            .await;
        assert_eq!(location(missing), "/images/activitystream.png");

        f.store.set_unavailable(true);
        let outage = f
            .service
            .serve(&request(SubjectKind::Image, "img-raw", Some("original")), None)
            .await;
        assert_eq!(location(outage), "/images/activitystream.png");
    }

    #[tokio::test]
    async fn test_missing_community_and_store_outage_look_the_same() {
        let f = fixture();
        let missing = location(
            f.service
                .serve(&request(SubjectKind::Community, "nope", None), None)
                .await,
        );

        f.store.set_unavailable(true);
        let outage = location(
            f.service
                .serve(&request(SubjectKind::Community, "c1", None), None)
                .await,
        );
        assert_eq!(missing, outage);

        let ghost = location(
            f.service
                .serve(&request(SubjectKind::User, "ghost@example.com", None), None)
                .await,
        );
        let alice_outage = location(
            f.service
                .serve(&request(SubjectKind::User, "alice@example.com", None), None)
                .await,
        );
        assert_eq!(ghost, alice_outage);
    }

    #[tokio::test]
    async fn test_not_modified_for_every_kind() {
        let f = fixture();
        let token = Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        for req in [
            request(SubjectKind::User, "alice@example.com", None),
            request(SubjectKind::Community, "c1", None),
            request(SubjectKind::Image, "img-raw", Some("original")),
        ] {
            assert!(matches!(
                f.service.serve(&req, token).await,
                AvatarOutcome::NotModified
            ));
        }
        assert_eq!(f.store.releases(), vec![Release::Aborted; 3]);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let f = fixture();
        let req = request(SubjectKind::Community, "c1", None);

        let first = body(f.service.serve(&req, None).await).await;
        let second = body(f.service.serve(&req, None).await).await;
        assert_eq!(first, second);

        let ghost = request(SubjectKind::User, "ghost@example.com", None);
        assert_eq!(
            location(f.service.serve(&ghost, None).await),
            location(f.service.serve(&ghost, None).await)
        );
    }
}
