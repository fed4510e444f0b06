//! Stored bytes for uploaded files.
//!
//! Each upload is written under a random 32-character hex locator, sharded
//! by its first two characters:
//! ```text
//! {media_path}/
//! ├── 3f/
//! │   └── 3fa1c0de9b7e44c2a0d5e8f1b2c3d4e5
//! └── ...
//! ```
//! The locator is the only handle the rest of the system keeps; display
//! names never touch the filesystem.

use std::io;
use std::path::{Path, PathBuf};

use rand::RngCore;
use tokio::fs;

use crate::{FileShareError, Result};

/// Length of a storage locator in hex characters.
pub const LOCATOR_LENGTH: usize = 32;

/// Put/get/delete-by-locator storage rooted at a media directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage, creating the base directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write bytes under a fresh locator and return it.
    pub async fn put(&self, content: &[u8]) -> Result<String> {
        loop {
            let locator = generate_locator();
            let path = self.path_for(&locator)?;
            if fs::try_exists(&path).await? {
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, content).await?;
            return Ok(locator);
        }
    }

    /// Read the bytes stored under a locator.
    pub async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let path = self.path_for(locator)?;
        match fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileShareError::NotFound(format!("stored file {locator}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the bytes stored under a locator.
    ///
    /// Returns `false` if nothing was stored there.
    pub async fn delete(&self, locator: &str) -> Result<bool> {
        let path = self.path_for(locator)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete several locators, logging failures instead of stopping.
    ///
    /// Used after a row cascade has already committed.
    pub async fn delete_all(&self, locators: &[String]) -> usize {
        let mut deleted = 0;
        for locator in locators {
            match self.delete(locator).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(locator = %locator, "Failed to delete stored file: {}", e),
            }
        }
        deleted
    }

    /// Check if a locator has stored bytes.
    pub async fn exists(&self, locator: &str) -> bool {
        match self.path_for(locator) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    fn path_for(&self, locator: &str) -> Result<PathBuf> {
        if !is_valid_locator(locator) {
            return Err(FileShareError::Storage(format!(
                "malformed locator: {locator}"
            )));
        }
        Ok(self.base_path.join(&locator[..2]).join(locator))
    }
}

/// Generate a random locator of 16 bytes rendered as lowercase hex.
pub fn generate_locator() -> String {
    let mut bytes = [0u8; LOCATOR_LENGTH / 2];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A locator is exactly 32 lowercase hex characters.
pub fn is_valid_locator(locator: &str) -> bool {
    locator.len() == LOCATOR_LENGTH
        && locator
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
