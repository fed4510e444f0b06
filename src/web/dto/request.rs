//! Request DTOs.
//!
//! The same types are validated by the gateway before forwarding and by the
//! authority when a request arrives.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation::{
    no_control_chars, otp_shape, share_name_shape, uid_list_shape, uid_shape, username_shape,
};

/// Login request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, max = 250, message = "Password is required"))]
    pub password: String,
}

/// Registration request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "username_shape"))]
    pub username: String,
    #[validate(
        length(
            min = 8,
            max = 250,
            message = "Password must be between 8 and 250 characters"
        ),
        custom(function = "no_control_chars")
    )]
    pub password: String,
}

/// Password change request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 250, message = "Current password is required"))]
    pub password: String,
    #[validate(
        length(
            min = 8,
            max = 250,
            message = "Password must be between 8 and 250 characters"
        ),
        custom(function = "no_control_chars")
    )]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "The new passwords don't match."))]
    pub new_password_confirmation: String,
}

/// Share creation request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateShareRequest {
    #[validate(custom(function = "share_name_shape"))]
    pub name: String,
    /// IDs of the files to bundle.
    #[validate(custom(function = "uid_list_shape"))]
    pub files: Vec<String>,
}

/// Delegation request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct GiveAccessRequest {
    /// User to add to the share's ACL.
    #[validate(custom(function = "username_shape"))]
    pub username: String,
    /// Current code from the owner's authenticator.
    #[validate(custom(function = "otp_shape"))]
    pub otp: String,
}

/// Request to attach a file to a share.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddFileRequest {
    #[validate(custom(function = "uid_shape"))]
    pub file_id: String,
}

/// Query string of the share listing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ShareListQuery {
    /// One of `all`, `owned`, `accessible`. Checked against
    /// [`ShareScope::VALUES`](crate::share::ShareScope::VALUES).
    #[serde(default)]
    pub scope: Option<String>,
}
