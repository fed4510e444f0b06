//! Response DTOs.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::file::{FileRecord, FileSummary};
use crate::share::{FileContent, ShareDetail, Visibility};

/// Business failure answered with 200, like a duplicate registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureResponse {
    pub error: bool,
    pub message: String,
}

impl FailureResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

/// Plain success flag, optionally with a message.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// ID of a newly registered user.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

/// ID of a newly created share.
#[derive(Debug, Serialize, Deserialize)]
pub struct UidResponse {
    pub uid: String,
}

/// Login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Session token (JWT).
    pub access_token: String,
    /// Always "Bearer".
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Result of a publish toggle.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub success: bool,
    pub is_public: bool,
    pub valid_until: Option<DateTime<Utc>>,
}

impl From<Visibility> for ToggleResponse {
    fn from(v: Visibility) -> Self {
        Self {
            success: true,
            is_public: v.is_public,
            valid_until: v.valid_until,
        }
    }
}

/// A file owned by the caller.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&FileRecord> for FileResponse {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            created_at: file.created_at,
        }
    }
}

/// The caller's files.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
}

/// A file with its content encoded as base64.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileDataResponse {
    pub id: String,
    pub name: String,
    pub data: String,
}

impl From<&FileContent> for FileDataResponse {
    fn from(content: &FileContent) -> Self {
        Self {
            id: content.file.id.clone(),
            name: content.file.name.clone(),
            data: STANDARD.encode(&content.data),
        }
    }
}

/// A zip archive encoded as base64.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveResponse {
    /// Suggested file name.
    pub name: String,
    pub data: String,
}

impl ArchiveResponse {
    pub fn new(share_name: &str, data: &[u8]) -> Self {
        Self {
            name: format!("{share_name}.zip"),
            data: STANDARD.encode(data),
        }
    }
}

/// A share as seen by its owner or an ACL member.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub id: String,
    pub name: String,
    pub owner: String,
    /// Whether the caller owns the share.
    pub mine: bool,
    pub is_public: bool,
    pub valid_until: Option<DateTime<Utc>>,
    /// Public link token. Only the owner sees it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub files: Vec<FileSummary>,
    /// IDs of the users on the ACL. Only the owner sees them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_for: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl ShareResponse {
    /// Build the view of `detail` for the user `viewer_id`.
    pub fn for_viewer(detail: ShareDetail, viewer_id: &str) -> Self {
        let mine = detail.share.is_owned_by(viewer_id);
        Self {
            id: detail.share.id,
            name: detail.share.name,
            owner: detail.share.owner_id,
            mine,
            is_public: detail.share.is_public,
            valid_until: detail.share.valid_until,
            link: mine.then_some(detail.share.link),
            files: detail.files.iter().map(FileSummary::from).collect(),
            available_for: mine.then_some(detail.allowed_users),
            created_at: detail.share.created_at,
        }
    }
}

/// Shares visible to the caller.
#[derive(Debug, Serialize)]
pub struct ShareListResponse {
    pub shares: Vec<ShareResponse>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}
