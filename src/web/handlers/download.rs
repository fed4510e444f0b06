//! Public link downloads.
//!
//! These routes are reached with the share's link token instead of a
//! session. The token is the capability: whoever holds it may download
//! while the share is public and its window is open.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;

use super::file::content_disposition;
use super::share::bad_input;
use crate::auth::validation::{validate_link, validate_uid};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

fn attachment(content_type: &str, filename: &str, data: Vec<u8>) -> Result<Response, ApiError> {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition(filename))
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal()
        })
}

/// GET /shares/download/:link - The whole share as a zip archive.
pub async fn download_public_share(
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
) -> Result<Response, ApiError> {
    validate_link(&link).map_err(bad_input)?;
    let archive = state.shares().public_archive(&link, Utc::now()).await?;
    tracing::info!(share_id = %archive.share.id, "Public share downloaded");
    attachment(
        "application/zip",
        &format!("{}.zip", archive.share.name),
        archive.data,
    )
}

/// GET /shares/download/:link/:file_id/raw - One file of a public share.
pub async fn download_public_file(
    State(state): State<Arc<AppState>>,
    Path((link, file_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    validate_link(&link).map_err(bad_input)?;
    validate_uid(&file_id).map_err(bad_input)?;
    let (_, content) = state
        .shares()
        .public_file(&link, &file_id, Utc::now())
        .await?;

    let content_type = mime_guess::from_path(&content.file.name)
        .first_or_octet_stream()
        .to_string();
    attachment(&content_type, &content.file.name, content.data)
}
