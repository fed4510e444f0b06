//! Authority request handlers.

pub mod auth;
pub mod download;
pub mod file;
pub mod health;
pub mod query;
pub mod share;

pub use auth::*;
pub use download::*;
pub use file::*;
pub use health::*;
pub use query::*;
pub use share::*;

use std::sync::Arc;

use crate::auth::{RevocationCheck, SessionAuthority, StoreRevocation};
use crate::config::Config;
use crate::db::Database;
use crate::file::{FileService, FileStorage, DEFAULT_MAX_FILE_SIZE};
use crate::share::ShareService;
use crate::web::middleware::{SessionGuard, SessionState};

/// Shared state of the authority handlers.
pub struct AppState {
    pub db: Database,
    pub storage: FileStorage,
    pub guard: Arc<SessionGuard>,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
    /// Issuer shown in OTP provisioning URIs.
    pub otp_issuer: String,
}

impl AppState {
    /// Create state whose revocation hook reads the given database.
    pub fn new(db: Database, storage: FileStorage, sessions: SessionAuthority) -> Self {
        let revocation: Arc<dyn RevocationCheck> =
            Arc::new(StoreRevocation::new(db.pool().clone()));
        Self {
            db,
            storage,
            guard: Arc::new(SessionGuard::new(sessions, revocation)),
            max_upload_size: DEFAULT_MAX_FILE_SIZE,
            otp_issuer: "FileShare".to_string(),
        }
    }

    /// Create state from the loaded configuration.
    pub fn from_config(config: &Config, db: Database, storage: FileStorage) -> Self {
        let mut state = Self::new(db, storage, SessionAuthority::from_config(&config.session));
        state.max_upload_size = config.storage.max_upload_size_mb * 1024 * 1024;
        state.otp_issuer = config.session.otp_issuer.clone();
        state
    }

    /// Set the upload limit in bytes.
    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }

    pub fn sessions(&self) -> &SessionAuthority {
        self.guard.sessions()
    }

    pub fn files(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage).with_max_file_size(self.max_upload_size)
    }

    pub fn shares(&self) -> ShareService<'_> {
        ShareService::new(&self.db, &self.storage)
    }
}

impl SessionState for AppState {
    fn session_guard(&self) -> &SessionGuard {
        &self.guard
    }
}
