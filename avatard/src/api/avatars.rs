//! Avatar endpoint
//!
//! GET /api/avatars?objectType=user|community|image&email=..&id=..&format=..

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::warn;

use super::AppState;
use crate::avatars::{format_http_date, parse_http_date, AvatarOutcome, AvatarQuery, AvatarRequest};

/// Served when a stored content type is not a valid header value
const FALLBACK_CONTENT_TYPE: HeaderValue = HeaderValue::from_static("application/octet-stream");

/// Build the avatars router
pub fn router() -> Router<AppState> {
    Router::new().route("/api/avatars", get(get_avatar))
}

/// Error body: `{"error": {"status", "message", "details"}}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: &'static str,
    pub details: String,
}

fn bad_request(details: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: ErrorBody {
                status: StatusCode::BAD_REQUEST.as_u16(),
                message: "Bad request",
                details: details.to_string(),
            },
        }),
    )
        .into_response()
}

/// Serve an avatar
async fn get_avatar(
    State(state): State<AppState>,
    query: Result<Query<AvatarQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };

    let request = match AvatarRequest::try_from(query) {
        Ok(request) => request,
        Err(e) => return bad_request(e.details),
    };

    let token = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date);

    match state.avatars.serve(&request, token).await {
        AvatarOutcome::NotModified => StatusCode::NOT_MODIFIED.into_response(),
        AvatarOutcome::Transfer { metadata, stream } => {
            let content_type = HeaderValue::from_str(&metadata.content_type).unwrap_or_else(|_| {
                warn!("Invalid stored content type {:?}", metadata.content_type);
                FALLBACK_CONTENT_TYPE
            });
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, content_type);
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.content_length));
            if let Ok(last_modified) = HeaderValue::from_str(&format_http_date(metadata.modified)) {
                headers.insert(header::LAST_MODIFIED, last_modified);
            }
            (StatusCode::OK, headers, Body::from_stream(stream)).into_response()
        }
        AvatarOutcome::Redirect(location) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
    }
}
