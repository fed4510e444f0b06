//! Account handlers.

use axum::{extract::State, response::IntoResponse, response::Response, Json};
use std::sync::Arc;

use crate::auth::{self, AccountError, RegistrationRequest, UserProfile};
use crate::db::UserRepository;
use crate::web::dto::{
    ChangePasswordRequest, FailureResponse, IdResponse, LoginRequest, LoginResponse,
    RegisterRequest, SuccessResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// POST /auth/register - Create an unverified account.
///
/// A taken username is a normal outcome answered with 200 and an error flag.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    match auth::register(&repo, RegistrationRequest::new(req.username, req.password)).await {
        Ok(user) => Ok(Json(IdResponse { id: user.id }).into_response()),
        Err(e @ AccountError::UsernameExists) => {
            Ok(Json(FailureResponse::new(e.to_string())).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/login - Exchange credentials for a session token.
///
/// Unknown users and wrong passwords get the same answer.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = match auth::authenticate(&repo, &req.username, &req.password).await {
        Ok(user) => user,
        Err(e @ AccountError::InvalidCredentials) => {
            tracing::info!(username = %req.username.trim(), "Failed login");
            return Ok(Json(FailureResponse::new(e.to_string())).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let access_token = state.sessions().issue(&user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions().expiry().as_secs(),
    })
    .into_response())
}

/// GET /auth/profile - The caller's account and OTP enrolment URI.
pub async fn profile(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(UserProfile::new(&current.user, &state.otp_issuer)?))
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let result = auth::change_password(
        &repo,
        &current.user.id,
        &req.password,
        &req.new_password,
        &req.new_password_confirmation,
    )
    .await;

    match result {
        Ok(()) => Ok(Json(SuccessResponse::ok()).into_response()),
        Err(e @ AccountError::WrongPassword) => {
            Ok(Json(FailureResponse::new(e.to_string())).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// DELETE /auth/account - Delete the caller's account and everything it owns.
///
/// Tokens issued before this call are revoked by the next verification.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<SuccessResponse>, ApiError> {
    auth::delete_account(&state.db, &state.storage, &current.user.id).await?;
    Ok(Json(SuccessResponse::ok()))
}
