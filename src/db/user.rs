//! User model for the credential store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account.
    #[default]
    User,
    /// Administrator.
    Admin,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    /// Opaque UUID string.
    pub id: String,
    /// Login name (unique, trimmed).
    pub username: String,
    /// Password hash (Argon2 PHC string).
    pub password: String,
    pub role: Role,
    /// Set by an administrator once the account is trusted.
    pub verified: bool,
    /// Base32 OTP shared secret.
    pub otp_secret: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Check if this user is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: e.into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password: row.try_get("password")?,
            role,
            verified: row.try_get("verified")?,
            otp_secret: row.try_get("otp_secret")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// New user for insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    /// Already hashed password.
    pub password: String,
    pub role: Role,
    pub verified: bool,
    pub otp_secret: String,
}

impl NewUser {
    /// Create a new unverified user with the default role.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        otp_secret: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role: Role::User,
            verified: false,
            otp_secret: otp_secret.into(),
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Mark the account verified on creation.
    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert_eq!(Role::Admin.to_string(), "admin");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_default() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_new_user_builder() {
        let user = NewUser::new("alice", "hash", "SECRET")
            .with_role(Role::Admin)
            .verified();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Admin);
        assert!(user.verified);
    }

    #[test]
    fn test_new_user_defaults_unverified() {
        let user = NewUser::new("bobby", "hash", "SECRET");
        assert_eq!(user.role, Role::User);
        assert!(!user.verified);
    }
}
