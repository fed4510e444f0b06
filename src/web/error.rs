//! API error handling shared by the authority and the gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::auth::{AccessError, AccountError, SessionError, ValidationError};
use crate::{FileShareError, ServiceError};

/// Message sent for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error.";

/// Status for an expired public link.
pub const LINK_EXPIRED_STATUS: u16 = 498;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request (400).
    BadRequest,
    /// Field-level validation failure (400).
    ValidationError,
    /// Missing, invalid, expired or revoked token (401).
    Unauthenticated,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Request body too large (413).
    PayloadTooLarge,
    /// Rate limited (429).
    TooManyRequests,
    /// Public link past its window (498).
    Expired,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::Expired => {
                StatusCode::from_u16(LINK_EXPIRED_STATUS).unwrap_or(StatusCode::GONE)
            }
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Always true, so clients can branch on one field.
    pub error: bool,
    pub code: ErrorCode,
    pub message: String,
    /// `token_invalid` or `token_revoked` on 401 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Set when the token's account is gone and clients should drop their state.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub delete_account: bool,
    /// Field-level validation error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
    /// Offending file IDs when a request names files the actor does not own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    reason: Option<&'static str>,
    delete_account: bool,
    details: Option<HashMap<String, Vec<String>>>,
    files: Option<Vec<String>>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            reason: None,
            delete_account: false,
            details: None,
            files: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthenticated error with the `token_invalid` reason.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorCode::Unauthenticated, message);
        err.reason = Some("token_invalid");
        err
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a rate limit error.
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    /// Create an internal server error with the uniform message.
    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, INTERNAL_ERROR_MESSAGE)
    }

    /// Create a validation error with field-level details.
    pub fn validation(details: HashMap<String, Vec<String>>) -> Self {
        let mut err = Self::new(ErrorCode::ValidationError, "Validation failed");
        err.details = Some(details);
        err
    }

    /// Create a validation error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details: HashMap<String, Vec<String>> = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            details.insert(field.to_string(), messages);
        }

        Self::validation(details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: true,
            code: self.code,
            message: self.message,
            reason: self.reason,
            delete_account: self.delete_account,
            details: self.details,
            files: self.files,
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<FileShareError> for ApiError {
    fn from(err: FileShareError) -> Self {
        match &err {
            FileShareError::NotFound(_) => ApiError::not_found(err.to_string()),
            FileShareError::Validation(msg) => ApiError::bad_request(msg.clone()),
            FileShareError::Permission(msg) => ApiError::forbidden(msg.clone()),
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal()
            }
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Expired => ApiError::new(ErrorCode::Expired, err.to_string()),
            AccessError::MissingExpiry => {
                tracing::error!("Public share without an expiry");
                ApiError::internal()
            }
            _ => ApiError::forbidden(err.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Invalid(msg) => ApiError::bad_request(msg),
            ServiceError::Access(e) => e.into(),
            ServiceError::FilesNotOwned(ids) => {
                let mut api = ApiError::forbidden(ServiceError::FilesNotOwned(vec![]).to_string());
                api.files = Some(ids);
                api
            }
            ServiceError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                ApiError::internal()
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Invalid => ApiError::unauthenticated("Invalid or expired token"),
            SessionError::Revoked => {
                let mut api = ApiError::new(ErrorCode::Unauthenticated, "Token revoked");
                api.reason = Some("token_revoked");
                api.delete_account = true;
                api
            }
            SessionError::Store(e) => {
                tracing::error!("Revocation check failed: {}", e);
                ApiError::internal()
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound => ApiError::not_found(err.to_string()),
            AccountError::Store(e) => e.into(),
            e if e.is_client_error() => ApiError::bad_request(e.to_string()),
            e => {
                tracing::error!("Account operation failed: {}", e);
                ApiError::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::ValidationError.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Expired.status_code().as_u16(), 498);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_body_shape() {
        let (status, json) = body_json(ApiError::not_found("Share not found.")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], true);
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Share not found.");
        assert!(json.get("reason").is_none());
        assert!(json.get("deleteAccount").is_none());
    }

    #[tokio::test]
    async fn test_session_errors_carry_reason() {
        let (status, json) = body_json(SessionError::Invalid.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["reason"], "token_invalid");
        assert!(json.get("deleteAccount").is_none());

        let (status, json) = body_json(SessionError::Revoked.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["reason"], "token_revoked");
        assert_eq!(json["deleteAccount"], true);
    }

    #[tokio::test]
    async fn test_service_error_mapping() {
        let (status, _) = body_json(ServiceError::Access(AccessError::Expired).into()).await;
        assert_eq!(status.as_u16(), 498);

        let (status, json) = body_json(ServiceError::Access(AccessError::NotPublic).into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["message"], "Share not public.");

        let (status, json) =
            body_json(ServiceError::FilesNotOwned(vec!["f1".to_string()]).into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["files"][0], "f1");
        assert_eq!(json["message"], "The file does not belong to you.");
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let err: ApiError =
            ServiceError::Internal(FileShareError::Database("disk I/O error".into())).into();
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_validation_error() {
        let mut details = HashMap::new();
        details.insert("name".to_string(), vec!["Too short".to_string()]);

        let err = ApiError::validation(details);
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Validation failed");
        assert_eq!(
            err.details.unwrap().get("name").unwrap(),
            &vec!["Too short".to_string()]
        );
    }
}
