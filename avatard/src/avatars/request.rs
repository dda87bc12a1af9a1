//! Avatar request parsing and validation
//!
//! The query string is checked once, here. Resolvers and the delivery engine
//! assume a well-formed `AvatarRequest`.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Kind of subject an avatar is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    /// End-user, addressed by email
    User,
    /// Community, addressed by id
    Community,
    /// Stored image, addressed by id
    Image,
}

impl SubjectKind {
    pub const ALL: [SubjectKind; 3] = [SubjectKind::User, SubjectKind::Community, SubjectKind::Image];

    /// Wire name used in the `objectType` parameter
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectKind::User => "user",
            SubjectKind::Community => "community",
            SubjectKind::Image => "image",
        }
    }

    /// Pick the identifying parameter this kind requires
    fn key<'a>(self, query: &'a AvatarQuery) -> Result<&'a str, ValidationError> {
        let (value, details) = match self {
            SubjectKind::User => (&query.email, "Email is mandatory"),
            SubjectKind::Community => (&query.id, "Community id is mandatory"),
            SubjectKind::Image => (&query.id, "Avatar id is mandatory"),
        };
        present(value).ok_or(ValidationError::new(details))
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubjectKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(ValidationError::new("Unknown objectType parameter"))
    }
}

/// Raw avatar query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarQuery {
    #[serde(rename = "objectType")]
    pub object_type: Option<String>,
    pub email: Option<String>,
    pub id: Option<String>,
    pub format: Option<String>,
}

/// Rejected request, reported to the caller as 400
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{details}")]
pub struct ValidationError {
    pub details: &'static str,
}

impl ValidationError {
    const fn new(details: &'static str) -> Self {
        Self { details }
    }
}

/// Validated avatar request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRequest {
    pub kind: SubjectKind,
    /// Email for users, id otherwise
    pub key: String,
    /// Optional rendition tag
    pub format: Option<String>,
}

impl TryFrom<AvatarQuery> for AvatarRequest {
    type Error = ValidationError;

    fn try_from(query: AvatarQuery) -> Result<Self, Self::Error> {
        let kind: SubjectKind = present(&query.object_type)
            .ok_or(ValidationError::new("objectType parameter is mandatory"))?
            .parse()?;
        let key = kind.key(&query)?.to_string();

        Ok(Self {
            kind,
            key,
            format: present(&query.format).map(str::to_string),
        })
    }
}

/// Empty parameters count as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
