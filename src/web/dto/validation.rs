//! Validation utilities for API DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::auth::validation as shape;
use crate::web::error::ApiError;

/// A JSON extractor that validates the request body.
///
/// Deserializes the body as JSON, then runs the `validator` rules. Both
/// failures answer 400; the second one carries field-level details.
///
/// # Example
///
/// ```ignore
/// use fileshare::web::dto::ValidatedJson;
///
/// async fn create_share(
///     ValidatedJson(payload): ValidatedJson<CreateShareRequest>,
/// ) -> Result<Json<UidResponse>, ApiError> {
///     // payload is already validated
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;

        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

fn invalid(code: &'static str, err: shape::ValidationError) -> validator::ValidationError {
    validator::ValidationError::new(code).with_message(err.to_string().into())
}

/// Username of 5 to 100 characters once trimmed.
pub fn username_shape(value: &str) -> Result<(), validator::ValidationError> {
    shape::validate_username(value)
        .map(|_| ())
        .map_err(|e| invalid("username", e))
}

/// Share name of 4 to 80 ASCII letters.
pub fn share_name_shape(value: &str) -> Result<(), validator::ValidationError> {
    shape::validate_share_name(value).map_err(|e| invalid("share_name", e))
}

/// Canonical hyphenated UID.
pub fn uid_shape(value: &str) -> Result<(), validator::ValidationError> {
    shape::validate_uid(value).map_err(|e| invalid("uid", e))
}

/// Non-empty list of canonical UIDs.
pub fn uid_list_shape(values: &[String]) -> Result<(), validator::ValidationError> {
    if values.is_empty() {
        return Err(invalid("uid_list", shape::ValidationError::Empty("files")));
    }
    values.iter().try_for_each(|v| uid_shape(v))
}

/// Six-digit OTP code.
pub fn otp_shape(value: &str) -> Result<(), validator::ValidationError> {
    shape::validate_otp_code(value).map_err(|e| invalid("otp", e))
}

/// Validate that a string does not contain control characters or NULL bytes.
pub fn no_control_chars(value: &str) -> Result<(), validator::ValidationError> {
    if value.chars().any(char::is_control) {
        return Err(validator::ValidationError::new("no_control_chars")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}
