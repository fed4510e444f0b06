//! Gateway handlers.
//!
//! Each handler checks the request's shape, then relays it to the matching
//! authority route. Nothing malformed is forwarded.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    response::Response,
    Json,
};

use super::proxy::{AuthorityClient, Forward};
use super::validate::{self, BearerToken};
use crate::auth::{SessionAuthority, StoreRevocation};
use crate::db::Database;
use crate::web::dto::{
    AddFileRequest, ChangePasswordRequest, CreateShareRequest, GiveAccessRequest, HealthResponse,
    LoginRequest, RegisterRequest, ShareListQuery, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{SessionGuard, SessionState};

/// Shared state of the gateway.
pub struct GatewayState {
    pub guard: Arc<SessionGuard>,
    pub authority: AuthorityClient,
}

impl GatewayState {
    pub fn new(guard: SessionGuard, authority: AuthorityClient) -> Self {
        Self {
            guard: Arc::new(guard),
            authority,
        }
    }

    /// Verify sessions against the shared store.
    pub fn with_store(db: &Database, sessions: SessionAuthority, authority: AuthorityClient) -> Self {
        let revocation = Arc::new(StoreRevocation::new(db.pool().clone()));
        Self::new(SessionGuard::new(sessions, revocation), authority)
    }
}

impl SessionState for GatewayState {
    fn session_guard(&self) -> &SessionGuard {
        &self.guard
    }
}

type Gateway = State<Arc<GatewayState>>;

fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes, ApiError> {
    serde_json::to_vec(value).map(Bytes::from).map_err(|e| {
        tracing::error!("Failed to encode request: {}", e);
        ApiError::internal()
    })
}

/// POST /api/auth/register
pub async fn register(
    State(state): Gateway,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let body = to_json(&req)?;
    Ok(state
        .authority
        .relay(Forward::post("/auth/register").json(body))
        .await)
}

/// POST /api/auth/login
pub async fn login(
    State(state): Gateway,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let body = to_json(&req)?;
    Ok(state
        .authority
        .relay(Forward::post("/auth/login").json(body))
        .await)
}

/// GET /api/auth/profile
pub async fn profile(State(state): Gateway, BearerToken(token): BearerToken) -> Response {
    state
        .authority
        .relay(Forward::get("/auth/profile").token(token))
        .await
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    let body = to_json(&req)?;
    Ok(state
        .authority
        .relay(Forward::post("/auth/change-password").token(token).json(body))
        .await)
}

/// DELETE /api/auth/account
pub async fn delete_account(State(state): Gateway, BearerToken(token): BearerToken) -> Response {
    state
        .authority
        .relay(Forward::delete("/auth/account").token(token))
        .await
}

/// GET /api/files
pub async fn list_files(State(state): Gateway, BearerToken(token): BearerToken) -> Response {
    state
        .authority
        .relay(Forward::get("/files").token(token))
        .await
}

/// POST /api/files/upload
///
/// The multipart body is rebuilt with the sanitized file name.
pub async fn upload_file(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let (filename, data) = validate::upload(multipart).await?;
    Ok(state
        .authority
        .relay(Forward::post("/files/upload").token(token).file(filename, data))
        .await)
}

/// DELETE /api/files/:uid
pub async fn delete_file(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Path(uid): Path<String>,
) -> Result<Response, ApiError> {
    validate::uid(&uid)?;
    Ok(state
        .authority
        .relay(Forward::delete(format!("/files/{uid}")).token(token))
        .await)
}

/// GET /api/shares
pub async fn list_shares(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Query(query): Query<ShareListQuery>,
) -> Result<Response, ApiError> {
    let mut forward = Forward::get("/shares").token(token);
    if let Some(scope) = validate::scope(query.scope.as_deref())? {
        forward = forward.query("scope", scope.as_str());
    }
    Ok(state.authority.relay(forward).await)
}

/// POST /api/shares
pub async fn create_share(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    ValidatedJson(req): ValidatedJson<CreateShareRequest>,
) -> Result<Response, ApiError> {
    let body = to_json(&req)?;
    Ok(state
        .authority
        .relay(Forward::post("/shares").token(token).json(body))
        .await)
}

/// GET /api/shares/:uid
pub async fn get_share(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Path(uid): Path<String>,
) -> Result<Response, ApiError> {
    validate::uid(&uid)?;
    Ok(state
        .authority
        .relay(Forward::get(format!("/shares/{uid}")).token(token))
        .await)
}

/// DELETE /api/shares/:uid
pub async fn delete_share(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Path(uid): Path<String>,
) -> Result<Response, ApiError> {
    validate::uid(&uid)?;
    Ok(state
        .authority
        .relay(Forward::delete(format!("/shares/{uid}")).token(token))
        .await)
}

/// GET /api/shares/:uid/toggle-publish
pub async fn toggle_publish(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Path(uid): Path<String>,
) -> Result<Response, ApiError> {
    validate::uid(&uid)?;
    Ok(state
        .authority
        .relay(Forward::get(format!("/shares/{uid}/toggle-publish")).token(token))
        .await)
}

/// POST /api/shares/:uid/give-access
pub async fn give_access(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Path(uid): Path<String>,
    ValidatedJson(req): ValidatedJson<GiveAccessRequest>,
) -> Result<Response, ApiError> {
    validate::uid(&uid)?;
    let body = to_json(&req)?;
    Ok(state
        .authority
        .relay(
            Forward::post(format!("/shares/{uid}/give-access"))
                .token(token)
                .json(body),
        )
        .await)
}

/// POST /api/shares/:uid/files
pub async fn add_share_file(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Path(uid): Path<String>,
    ValidatedJson(req): ValidatedJson<AddFileRequest>,
) -> Result<Response, ApiError> {
    validate::uid(&uid)?;
    let body = to_json(&req)?;
    Ok(state
        .authority
        .relay(
            Forward::post(format!("/shares/{uid}/files"))
                .token(token)
                .json(body),
        )
        .await)
}

/// GET /api/shares/:uid/files/:filename
pub async fn get_share_file(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Path((uid, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    validate::uid(&uid)?;
    let filename = validate::filename(&filename)?;
    let path = format!("/shares/{uid}/files/{}", urlencoding::encode(&filename));
    Ok(state.authority.relay(Forward::get(path).token(token)).await)
}

/// DELETE /api/shares/:uid/files/:filename
pub async fn remove_share_file(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    Path((uid, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    validate::uid(&uid)?;
    let filename = validate::filename(&filename)?;
    let path = format!("/shares/{uid}/files/{}", urlencoding::encode(&filename));
    Ok(state
        .authority
        .relay(Forward::delete(path).token(token))
        .await)
}

/// GET /api/shares/download/:link
pub async fn download_public_share(
    State(state): Gateway,
    Path(link): Path<String>,
) -> Result<Response, ApiError> {
    validate::link(&link)?;
    Ok(state
        .authority
        .relay(Forward::get(format!("/shares/download/{link}")))
        .await)
}

/// GET /api/shares/download/:link/:file_id/raw
pub async fn download_public_file(
    State(state): Gateway,
    Path((link, file_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    validate::link(&link)?;
    validate::uid(&file_id)?;
    Ok(state
        .authority
        .relay(Forward::get(format!("/shares/download/{link}/{file_id}/raw")))
        .await)
}

/// POST /api/query
///
/// The operation is parsed and checked here, then the original body is
/// forwarded untouched.
pub async fn run_query(
    State(state): Gateway,
    BearerToken(token): BearerToken,
    body: Bytes,
) -> Result<Response, ApiError> {
    let query = validate::query(&body)?;
    tracing::debug!(op = query.op(), "Forwarding query");
    Ok(state
        .authority
        .relay(Forward::post("/query").token(token).json(body))
        .await)
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "gateway".to_string(),
    })
}
