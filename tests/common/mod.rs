//! Test helpers for the HTTP integration tests.
//!
//! Builds an authority over an in-memory database and a temporary media
//! directory, and seeds accounts directly through the repositories.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum_test::TestServer;
use chrono::Utc;
use tempfile::TempDir;

use fileshare::auth::{hash_password, otp, SessionAuthority};
use fileshare::db::{NewUser, User, UserRepository};
use fileshare::file::{FileRecord, FileStorage};
use fileshare::share::Share;
use fileshare::web::create_router;
use fileshare::web::handlers::AppState;
use fileshare::Database;

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";
pub const PASSWORD: &str = "correct horse battery";

/// Hashing is slow; every seeded account shares one hash.
fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hash"))
}

pub fn sessions() -> SessionAuthority {
    SessionAuthority::new(JWT_SECRET, Duration::from_secs(3600))
}

/// An authority served in-process.
pub struct TestAuthority {
    pub server: TestServer,
    pub state: Arc<AppState>,
    _media: TempDir,
}

impl TestAuthority {
    pub async fn new() -> Self {
        let media = TempDir::new().expect("tempdir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let storage = FileStorage::new(media.path()).expect("storage");
        let state = Arc::new(AppState::new(db, storage, sessions()));
        let server = TestServer::new(create_router(state.clone())).expect("test server");

        Self {
            server,
            state,
            _media: media,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Create an account with [`PASSWORD`].
    pub async fn user(&self, username: &str, verified: bool) -> User {
        seed_user(self.db(), username, verified).await
    }

    pub fn bearer(&self, user: &User) -> String {
        bearer(user)
    }

    /// Store a file owned by `owner`.
    pub async fn file(&self, owner: &User, name: &str, data: &[u8]) -> FileRecord {
        self.state
            .files()
            .upload(owner, name, data)
            .await
            .expect("upload")
    }

    /// Create a share of `files` owned by `owner`.
    pub async fn share(&self, owner: &User, name: &str, files: &[&FileRecord]) -> Share {
        let ids: Vec<String> = files.iter().map(|f| f.id.clone()).collect();
        self.state
            .shares()
            .create(owner, name, &ids)
            .await
            .expect("create share")
    }
}

pub async fn seed_user(db: &Database, username: &str, verified: bool) -> User {
    let mut new_user = NewUser::new(username, password_hash(), otp::generate_secret());
    if verified {
        new_user = new_user.verified();
    }
    UserRepository::new(db.pool())
        .create(&new_user)
        .await
        .expect("create user")
}

/// `Authorization` header value for `user`.
pub fn bearer(user: &User) -> String {
    format!("Bearer {}", sessions().issue(user).expect("issue token"))
}

/// The current one-time code for `user`.
pub fn current_otp(user: &User) -> String {
    otp::code_at(&user.otp_secret, Utc::now()).expect("otp")
}

/// A code that is certainly not accepted right now.
pub fn wrong_otp(user: &User) -> String {
    let now = Utc::now();
    let accepted: Vec<String> = [-30i64, 0, 30]
        .iter()
        .map(|offset| {
            otp::code_at(&user.otp_secret, now + chrono::Duration::seconds(*offset))
                .expect("otp")
        })
        .collect();
    (0..1_000_000)
        .map(|n| format!("{n:06}"))
        .find(|code| !accepted.contains(code))
        .expect("a rejected code")
}
