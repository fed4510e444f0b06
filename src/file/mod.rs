//! File management module.
//!
//! This module provides:
//! - File rows (owner, display name, storage locator)
//! - Byte storage addressed by locator
//! - Zip assembly for share downloads
//! - Upload and deletion for the owning user

mod archive;
mod metadata;
mod service;
mod storage;

pub use archive::build_archive;
pub use metadata::{FileRecord, FileRepository, FileSummary, NewFile};
pub use service::FileService;
pub use storage::{generate_locator, is_valid_locator, FileStorage, LOCATOR_LENGTH};

/// Maximum length for a display filename (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Default maximum upload size (50MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
