//! Error types for the file sharing service.

use thiserror::Error;

use crate::auth::AccessError;

/// Common error type for the library layer.
#[derive(Error, Debug)]
pub enum FileShareError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant with their message
    /// preserved for logging. The message is never sent to clients.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Stored object error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Archive creation error.
    #[error("archive error: {0}")]
    Archive(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The authority could not be reached or answered unreadably.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<sqlx::Error> for FileShareError {
    fn from(e: sqlx::Error) -> Self {
        FileShareError::Database(e.to_string())
    }
}

impl From<zip::result::ZipError> for FileShareError {
    fn from(e: zip::result::ZipError) -> Self {
        FileShareError::Archive(e.to_string())
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, FileShareError>;

/// Outcome of a failed file or share operation.
///
/// Separates business-rule failures, which clients see verbatim, from
/// store failures, which surface as a generic internal error.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The resource does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// Input accepted by shape checks but rejected by a business rule.
    #[error("{0}")]
    Invalid(String),

    /// Authenticated but not permitted.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Some of the listed files belong to another user.
    #[error("The file does not belong to you.")]
    FilesNotOwned(Vec<String>),

    /// Store or storage failure.
    #[error(transparent)]
    Internal(#[from] FileShareError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Internal(e.into())
    }
}

/// Result type alias for service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_error_display() {
        let err = FileShareError::Permission("not the share owner".to_string());
        assert_eq!(err.to_string(), "permission denied: not the share owner");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = FileShareError::NotFound("share".to_string());
        assert_eq!(err.to_string(), "share not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FileShareError = io_err.into();
        assert!(matches!(err, FileShareError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_service_error_display() {
        assert_eq!(
            ServiceError::NotFound("Share not found.").to_string(),
            "Share not found."
        );
        assert_eq!(
            ServiceError::Access(AccessError::NotPublic).to_string(),
            "Share not public."
        );
        let err: ServiceError = FileShareError::Storage("disk".into()).into();
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: FileShareError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, FileShareError::Database(_)));
    }
}
