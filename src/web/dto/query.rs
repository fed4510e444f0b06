//! Typed query contract served at `POST /query`.
//!
//! A request is one tagged operation; the response carries the same tag
//! next to its data. Both sides are plain serde types, so the set of
//! operations and their fields is fixed at compile time.

use serde::{Deserialize, Serialize};

use super::response::{
    ArchiveResponse, FileDataResponse, ShareResponse, SuccessResponse, ToggleResponse,
};
use crate::auth::validation::{
    validate_link, validate_otp_code, validate_uid, validate_username, ValidationError,
};
use crate::auth::UserProfile;

/// Operation names accepted by the query endpoint.
pub const QUERY_OPS: [&str; 8] = [
    "me",
    "user",
    "share",
    "fileShare",
    "downloadFile",
    "downloadShare",
    "giveAccess",
    "toggleShareVisibility",
];

/// One query operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Query {
    /// The caller's own profile.
    Me,
    /// Public information about a user.
    User { id: String },
    /// A share the caller owns or is listed on.
    Share { id: String },
    /// One file of a public share, reached through its link.
    FileShare { share_link: String, file_id: String },
    /// One file of a share the caller can read.
    DownloadFile { share_id: String, file_id: String },
    /// Every file of a share the caller can read, zipped.
    DownloadShare { id: String },
    /// Delegation: add `username` to the share's ACL.
    GiveAccess {
        id: String,
        otp: String,
        username: String,
    },
    /// Flip the public flag of a share.
    ToggleShareVisibility { id: String },
}

impl Query {
    /// The operation tag.
    pub fn op(&self) -> &'static str {
        match self {
            Query::Me => "me",
            Query::User { .. } => "user",
            Query::Share { .. } => "share",
            Query::FileShare { .. } => "fileShare",
            Query::DownloadFile { .. } => "downloadFile",
            Query::DownloadShare { .. } => "downloadShare",
            Query::GiveAccess { .. } => "giveAccess",
            Query::ToggleShareVisibility { .. } => "toggleShareVisibility",
        }
    }

    /// Structural checks on every field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Query::Me => Ok(()),
            Query::User { id }
            | Query::Share { id }
            | Query::DownloadShare { id }
            | Query::ToggleShareVisibility { id } => validate_uid(id),
            Query::FileShare {
                share_link,
                file_id,
            } => {
                validate_link(share_link)?;
                validate_uid(file_id)
            }
            Query::DownloadFile { share_id, file_id } => {
                validate_uid(share_id)?;
                validate_uid(file_id)
            }
            Query::GiveAccess { id, otp, username } => {
                validate_uid(id)?;
                validate_otp_code(otp)?;
                validate_username(username).map(|_| ())
            }
        }
    }
}

/// Public view of another user.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
}

/// Data returned for a query, tagged like the request.
#[derive(Debug, Serialize)]
#[serde(tag = "op", content = "data", rename_all = "camelCase")]
pub enum QueryResponse {
    Me(UserProfile),
    User(UserView),
    Share(ShareResponse),
    FileShare(FileDataResponse),
    DownloadFile(FileDataResponse),
    DownloadShare(ArchiveResponse),
    GiveAccess(SuccessResponse),
    ToggleShareVisibility(ToggleResponse),
}
