//! Share handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::auth::validation::{sanitize_filename, validate_uid, ValidationError};
use crate::share::{give_access as grant, GrantOutcome, GrantRequest, ShareScope};
use crate::web::dto::{
    AddFileRequest, CreateShareRequest, FileDataResponse, GiveAccessRequest, ShareListQuery,
    ShareListResponse, ShareResponse, SuccessResponse, ToggleResponse, UidResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

pub(crate) fn bad_input(e: ValidationError) -> ApiError {
    e.into()
}

/// Parse the optional `scope` query value.
pub fn parse_scope(value: Option<&str>) -> Result<ShareScope, ApiError> {
    match value {
        None => Ok(ShareScope::default()),
        Some(v) => v.parse().map_err(|_| {
            bad_input(ValidationError::UnknownVariant {
                field: "scope",
                value: v.chars().take(32).collect(),
            })
        }),
    }
}

/// POST /shares - Bundle owned files into a new share.
pub async fn create_share(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateShareRequest>,
) -> Result<Json<UidResponse>, ApiError> {
    let share = state
        .shares()
        .create(&current.user, &req.name, &req.files)
        .await?;
    Ok(Json(UidResponse { uid: share.id }))
}

/// GET /shares - Owned shares and shares the caller is listed on.
pub async fn list_shares(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(query): Query<ShareListQuery>,
) -> Result<Json<ShareListResponse>, ApiError> {
    let scope = parse_scope(query.scope.as_deref())?;
    let details = state.shares().list(&current.user, scope).await?;
    Ok(Json(ShareListResponse {
        shares: details
            .into_iter()
            .map(|d| ShareResponse::for_viewer(d, &current.user.id))
            .collect(),
    }))
}

/// GET /shares/:uid
pub async fn get_share(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(share_id): Path<String>,
) -> Result<Json<ShareResponse>, ApiError> {
    validate_uid(&share_id).map_err(bad_input)?;
    let detail = state.shares().get(&current.user, &share_id).await?;
    Ok(Json(ShareResponse::for_viewer(detail, &current.user.id)))
}

/// GET /shares/:uid/toggle-publish
pub async fn toggle_publish(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(share_id): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    validate_uid(&share_id).map_err(bad_input)?;
    let visibility = state
        .shares()
        .toggle_visibility(&current.user, &share_id, Utc::now())
        .await?;
    Ok(Json(visibility.into()))
}

/// POST /shares/:uid/give-access - OTP-gated ACL grant.
///
/// A wrong code is answered with 200 and `success: false`.
pub async fn give_access(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(share_id): Path<String>,
    ValidatedJson(req): ValidatedJson<GiveAccessRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    validate_uid(&share_id).map_err(bad_input)?;
    let request = GrantRequest {
        share_id: &share_id,
        username: &req.username,
        otp_code: &req.otp,
    };
    let outcome = grant(&state.db, &current.user, &request, Utc::now()).await?;
    Ok(Json(grant_response(outcome)))
}

pub(crate) fn grant_response(outcome: GrantOutcome) -> SuccessResponse {
    if outcome.is_success() {
        SuccessResponse::ok()
    } else {
        SuccessResponse::failed("OTP invalid")
    }
}

/// POST /shares/:uid/files - Attach one of the caller's files.
pub async fn add_share_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(share_id): Path<String>,
    ValidatedJson(req): ValidatedJson<AddFileRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    validate_uid(&share_id).map_err(bad_input)?;
    state
        .shares()
        .add_file(&current.user, &share_id, &req.file_id)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /shares/:uid/files/:filename
pub async fn remove_share_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((share_id, filename)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, ApiError> {
    validate_uid(&share_id).map_err(bad_input)?;
    let filename = sanitize_filename(&filename).map_err(bad_input)?;
    state
        .shares()
        .remove_file(&current.user, &share_id, &filename)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /shares/:uid/files/:filename - One file with its content as base64.
pub async fn get_share_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((share_id, filename)): Path<(String, String)>,
) -> Result<Json<FileDataResponse>, ApiError> {
    validate_uid(&share_id).map_err(bad_input)?;
    let filename = sanitize_filename(&filename).map_err(bad_input)?;
    let (_, content) = state
        .shares()
        .file_by_name(&current.user, &share_id, &filename)
        .await?;
    Ok(Json(FileDataResponse::from(&content)))
}

/// DELETE /shares/:uid
pub async fn delete_share(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(share_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    validate_uid(&share_id).map_err(bad_input)?;
    state.shares().delete(&current.user, &share_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope(None).unwrap(), ShareScope::All);
        assert_eq!(parse_scope(Some("owned")).unwrap(), ShareScope::Owned);
        assert!(parse_scope(Some("everything")).is_err());
    }

    #[test]
    fn test_grant_response() {
        assert!(grant_response(GrantOutcome::Granted).success);
        assert!(grant_response(GrantOutcome::AlreadyMember).success);
        let failed = grant_response(GrantOutcome::OtpInvalid);
        assert!(!failed.success);
        assert_eq!(failed.message.as_deref(), Some("OTP invalid"));
    }
}
