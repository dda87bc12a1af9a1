//! Conditional delivery
//!
//! Given a locator and the client's If-Modified-Since instant, decide between
//! a 304, a full transfer, or giving up. Freshness is compared at whole-second
//! resolution on both sides: HTTP dates carry no sub-second part, while the
//! store keeps milliseconds.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use tracing::{debug, warn};

use super::stream::ByteStream;
use crate::store::{ObjectMetadata, ObjectStore, ResourceLocator};

/// IMF-fixdate, the preferred HTTP-date format
const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Obsolete asctime() HTTP-date format
const ASCTIME: &str = "%a %b %e %H:%M:%S %Y";

/// Discard sub-second precision
pub fn truncate_to_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(0)
}

/// True when both instants fall in the same second
pub fn is_unmodified(token: DateTime<Utc>, modified: DateTime<Utc>) -> bool {
    truncate_to_second(token) == truncate_to_second(modified)
}

/// Parse an HTTP-date header value. Unparseable values yield None.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, ASCTIME)
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Format an instant as IMF-fixdate
pub fn format_http_date(instant: DateTime<Utc>) -> String {
    instant.format(IMF_FIXDATE).to_string()
}

/// What to send for a resolved locator
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Client copy is current; no body
    NotModified,
    /// Send the object
    FullTransfer {
        metadata: ObjectMetadata,
        stream: ByteStream,
    },
    /// Object missing, content missing, or store failure
    Unavailable,
}

/// Conditional delivery engine over an object store
#[derive(Clone)]
pub struct DeliveryEngine {
    store: Arc<dyn ObjectStore>,
}

impl DeliveryEngine {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetch the object and decide how to answer
    pub async fn deliver(
        &self,
        locator: &ResourceLocator,
        token: Option<DateTime<Utc>>,
    ) -> DeliveryOutcome {
        let object = match self.store.fetch(locator).await {
            Ok(Some(object)) => object,
            Ok(None) => {
                debug!("Object {} not in store", locator);
                return DeliveryOutcome::Unavailable;
            }
            Err(e) => {
                warn!("Object store fetch for {} failed: {}", locator, e);
                return DeliveryOutcome::Unavailable;
            }
        };

        let Some(stream) = object.stream else {
            warn!("Object {} has metadata but no content", locator);
            return DeliveryOutcome::Unavailable;
        };

        if token.is_some_and(|token| is_unmodified(token, object.metadata.modified)) {
            stream.abort();
            return DeliveryOutcome::NotModified;
        }

        DeliveryOutcome::FullTransfer {
            metadata: object.metadata,
            stream,
        }
    }
}
