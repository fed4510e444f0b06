//! File handlers.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::sync::Arc;

use crate::auth::validation::validate_uid;
use crate::web::dto::{FileListResponse, FileResponse, SuccessResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// Build a Content-Disposition value for a download.
///
/// Quotes, backslashes and control characters are replaced in the plain
/// `filename` parameter; non-ASCII names also get an RFC 5987 `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let plain: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if filename.is_ascii() && plain == filename {
        return format!("attachment; filename=\"{filename}\"");
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        plain.replace(|c: char| !c.is_ascii(), "_"),
        urlencoding::encode(filename)
    )
}

/// POST /files/upload - Upload one file (multipart field `file`).
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read file content: {}", e);
            ApiError::bad_request("Failed to read file")
        })?;
        upload = Some((filename, content.to_vec()));
    }

    let (filename, content) = upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let file = state
        .files()
        .upload(&current.user, &filename, &content)
        .await?;

    Ok(Json(FileResponse::from(&file)))
}

/// GET /files - The caller's files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.files().list(&current.user).await?;
    Ok(Json(FileListResponse {
        files: files.iter().map(FileResponse::from).collect(),
    }))
}

/// DELETE /files/:uid
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(file_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    validate_uid(&file_id).map_err(|e| ApiError::bad_request(e.to_string()))?;
    state.files().delete(&current.user, &file_id).await?;
    Ok(Json(SuccessResponse::ok()))
}
