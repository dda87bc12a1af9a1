//! Placeholder fallback
//!
//! Once the subject kind is valid, every failure becomes a redirect to a
//! static placeholder chosen by subject kind alone. A caller cannot tell "no
//! such community" from "image store outage".

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::request::SubjectKind;
use super::resolver::ResolveError;

/// Placeholder destinations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placeholders {
    /// Served for any user or community avatar failure
    pub subject: String,
    /// Served for any raw image failure
    pub image: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            subject: "/images/not_a_user.png".to_string(),
            image: "/images/activitystream.png".to_string(),
        }
    }
}

/// Reason an avatar could not be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Subject resolution failed
    Resolve(ResolveError),
    /// The store could not deliver the object
    Unavailable,
}

impl From<ResolveError> for Failure {
    fn from(e: ResolveError) -> Self {
        Failure::Resolve(e)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    placeholders: Placeholders,
}

impl FallbackPolicy {
    pub fn new(placeholders: Placeholders) -> Self {
        Self { placeholders }
    }

    /// Redirect target for a failed request. The failure is only logged.
    pub fn redirect(&self, kind: SubjectKind, failure: &Failure) -> &str {
        let location = match kind {
            SubjectKind::User | SubjectKind::Community => self.placeholders.subject.as_str(),
            SubjectKind::Image => self.placeholders.image.as_str(),
        };
        debug!("Avatar for {} falls back to {} ({:?})", kind, location, failure);
        location
    }
}
