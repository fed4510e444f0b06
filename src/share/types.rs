//! Share types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::file::FileRecord;

/// How long a share stays public after being published.
pub const PUBLIC_WINDOW_DAYS: i64 = 7;

/// The public window opened by publishing at `now`.
pub fn public_window_end(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(PUBLIC_WINDOW_DAYS)
}

/// A named bundle of files owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Share {
    /// Opaque UUID string.
    pub id: String,
    pub owner_id: String,
    /// Letters only, unique per owner.
    pub name: String,
    pub is_public: bool,
    /// Public link token, fixed at creation.
    pub link: String,
    /// End of the public window. `None` while private.
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Share {
    /// Check if `user_id` owns this share.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// Data for creating a share.
#[derive(Debug, Clone)]
pub struct NewShare {
    pub owner_id: String,
    pub name: String,
    /// Files to attach. Must be non-empty and owned by `owner_id`.
    pub file_ids: Vec<String>,
}

impl NewShare {
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>, file_ids: Vec<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            name: name.into(),
            file_ids,
        }
    }
}

/// A share with its files and access list.
#[derive(Debug, Clone)]
pub struct ShareDetail {
    pub share: Share,
    pub files: Vec<FileRecord>,
    /// IDs of users on the ACL.
    pub allowed_users: Vec<String>,
}

/// Result of a publish toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub is_public: bool,
    pub valid_until: Option<DateTime<Utc>>,
}

impl From<&Share> for Visibility {
    fn from(share: &Share) -> Self {
        Self {
            is_public: share.is_public,
            valid_until: share.valid_until,
        }
    }
}

/// Which shares a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareScope {
    /// Owned and accessible.
    #[default]
    All,
    /// Owned by the caller.
    Owned,
    /// Shared with the caller through the ACL.
    Accessible,
}

impl ShareScope {
    /// Every accepted value.
    pub const VALUES: [&'static str; 3] = ["all", "owned", "accessible"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShareScope::All => "all",
            ShareScope::Owned => "owned",
            ShareScope::Accessible => "accessible",
        }
    }

    pub fn includes_owned(&self) -> bool {
        matches!(self, ShareScope::All | ShareScope::Owned)
    }

    pub fn includes_accessible(&self) -> bool {
        matches!(self, ShareScope::All | ShareScope::Accessible)
    }
}

impl fmt::Display for ShareScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ShareScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ShareScope::All),
            "owned" => Ok(ShareScope::Owned),
            "accessible" => Ok(ShareScope::Accessible),
            _ => Err(format!("unknown scope: {s}")),
        }
    }
}
