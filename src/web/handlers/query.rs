//! Typed query endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use super::share::{bad_input, grant_response};
use crate::auth::UserProfile;
use crate::db::UserRepository;
use crate::share::{give_access, GrantRequest};
use crate::web::dto::{
    ArchiveResponse, FileDataResponse, Query, QueryResponse, ShareResponse, UserView,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// POST /query - Run one typed operation.
///
/// Every operation goes through the same services and access rules as the
/// REST routes.
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    payload: Result<Json<Query>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(query) =
        payload.map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e.body_text())))?;
    query.validate().map_err(bad_input)?;
    tracing::debug!(op = query.op(), user_id = %current.user.id, "Query");

    let actor = &current.user;
    let shares = state.shares();
    let response = match query {
        Query::Me => QueryResponse::Me(UserProfile::new(actor, &state.otp_issuer)?),
        Query::User { id } => {
            let user = UserRepository::new(state.db.pool())
                .get_by_id(&id)
                .await?
                .ok_or_else(|| ApiError::not_found("User not found."))?;
            QueryResponse::User(UserView {
                id: user.id,
                username: user.username,
            })
        }
        Query::Share { id } => {
            let detail = shares.get(actor, &id).await?;
            QueryResponse::Share(ShareResponse::for_viewer(detail, &actor.id))
        }
        Query::FileShare {
            share_link,
            file_id,
        } => {
            let (_, content) = shares.public_file(&share_link, &file_id, Utc::now()).await?;
            QueryResponse::FileShare(FileDataResponse::from(&content))
        }
        Query::DownloadFile { share_id, file_id } => {
            let (_, content) = shares.file_by_id(actor, &share_id, &file_id).await?;
            QueryResponse::DownloadFile(FileDataResponse::from(&content))
        }
        Query::DownloadShare { id } => {
            let archive = shares.archive_for(actor, &id).await?;
            QueryResponse::DownloadShare(ArchiveResponse::new(&archive.share.name, &archive.data))
        }
        Query::GiveAccess { id, otp, username } => {
            let request = GrantRequest {
                share_id: &id,
                username: &username,
                otp_code: &otp,
            };
            let outcome = give_access(&state.db, actor, &request, Utc::now()).await?;
            QueryResponse::GiveAccess(grant_response(outcome))
        }
        Query::ToggleShareVisibility { id } => {
            let visibility = shares.toggle_visibility(actor, &id, Utc::now()).await?;
            QueryResponse::ToggleShareVisibility(visibility.into())
        }
    };

    Ok(Json(response))
}
