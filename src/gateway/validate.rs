//! Structural checks run before anything is forwarded.
//!
//! These are shape checks only. Whether the caller may touch a resource is
//! decided by the authority.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Multipart},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::bearer_token;
use crate::auth::validation::{sanitize_filename, validate_link, validate_uid};
use crate::share::ShareScope;
use crate::web::dto::Query;
use crate::web::error::ApiError;
use crate::web::handlers::parse_scope;

/// Resource id path segment.
pub fn uid(value: &str) -> Result<(), ApiError> {
    Ok(validate_uid(value)?)
}

/// Public link path segment.
pub fn link(value: &str) -> Result<(), ApiError> {
    Ok(validate_link(value)?)
}

/// File name path segment, reduced to its base component.
pub fn filename(value: &str) -> Result<String, ApiError> {
    Ok(sanitize_filename(value)?)
}

/// Optional `scope` query value. `None` stays `None` so the authority
/// applies its default.
pub fn scope(value: Option<&str>) -> Result<Option<ShareScope>, ApiError> {
    value.map(|v| parse_scope(Some(v))).transpose()
}

/// Parse and check a query body.
///
/// An unknown `op` or a missing field fails deserialization; ids and
/// codes then go through the same shape checks as the REST routes.
pub fn query(body: &Bytes) -> Result<Query, ApiError> {
    let query: Query = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e)))?;
    query.validate()?;
    Ok(query)
}

/// Read the single `file` field of an upload.
///
/// Returns the sanitized name and the bytes.
pub async fn upload(mut multipart: Multipart) -> Result<(String, Bytes), ApiError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let name = filename(field.file_name().unwrap_or_default())?;
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read file content: {}", e);
            ApiError::bad_request("Failed to read file")
        })?;
        upload = Some((name, data));
    }

    upload.ok_or_else(|| ApiError::bad_request("No file provided"))
}

/// The caller's bearer token, passed on to the authority unchanged.
///
/// Absent on the routes that need no session.
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BearerToken(
            parts
                .headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(bearer_token)
                .map(str::to_string),
        ))
    }
}
