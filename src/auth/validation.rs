//! Structural input validation.
//!
//! These checks are cheap and stateless. The gateway runs them before
//! forwarding anything and the authority runs the same functions again on
//! its own surface.

use thiserror::Error;

/// Minimum username length (after trimming).
pub const MIN_USERNAME_LENGTH: usize = 5;

/// Maximum username length (after trimming).
pub const MAX_USERNAME_LENGTH: usize = 100;

/// Minimum share name length.
pub const MIN_SHARE_NAME_LENGTH: usize = 4;

/// Maximum share name length.
pub const MAX_SHARE_NAME_LENGTH: usize = 80;

/// Minimum public link length.
pub const MIN_LINK_LENGTH: usize = 40;

/// Maximum public link length.
pub const MAX_LINK_LENGTH: usize = 100;

/// Number of digits in an OTP code.
pub const OTP_CODE_LENGTH: usize = 6;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters")]
    UsernameLength,

    #[error("share name must be {MIN_SHARE_NAME_LENGTH} to {MAX_SHARE_NAME_LENGTH} letters")]
    ShareName,

    #[error("invalid identifier: {0}")]
    Uid(String),

    #[error("invalid share link")]
    Link,

    #[error("invalid filename")]
    Filename,

    #[error("invalid OTP code format")]
    OtpCode,

    #[error("{0} must be a list")]
    NotAList(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("unknown value for {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },
}

/// Trim a username and check its length. Returns the trimmed value.
pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();
    let len = trimmed.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ValidationError::UsernameLength);
    }
    Ok(trimmed.to_string())
}

/// Share names are 4 to 80 ASCII letters.
pub fn validate_share_name(name: &str) -> Result<(), ValidationError> {
    let len = name.len();
    if !(MIN_SHARE_NAME_LENGTH..=MAX_SHARE_NAME_LENGTH).contains(&len)
        || !name.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Err(ValidationError::ShareName);
    }
    Ok(())
}

/// Check the canonical 8-4-4-4-12 hex shape of a resource identifier.
///
/// # Examples
///
/// ```
/// use fileshare::auth::validation::is_valid_uid;
///
/// assert!(is_valid_uid("3f2504e0-4f89-41d3-9a0c-0305e82c3301"));
/// assert!(!is_valid_uid("../etc/passwd"));
/// ```
pub fn is_valid_uid(value: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    if value.len() != 36 {
        return false;
    }
    let mut groups = value.split('-');
    for expected in GROUPS {
        match groups.next() {
            Some(group) if group.len() == expected => {
                if !group.chars().all(|c| c.is_ascii_hexdigit()) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    groups.next().is_none()
}

/// Validate a resource identifier, naming the offending value on failure.
pub fn validate_uid(value: &str) -> Result<(), ValidationError> {
    if is_valid_uid(value) {
        Ok(())
    } else {
        Err(ValidationError::Uid(truncate(value, 64)))
    }
}

/// Public links are 40 to 100 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_link(value: &str) -> bool {
    (MIN_LINK_LENGTH..=MAX_LINK_LENGTH).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validate a public link token.
pub fn validate_link(value: &str) -> Result<(), ValidationError> {
    if is_valid_link(value) {
        Ok(())
    } else {
        Err(ValidationError::Link)
    }
}

/// OTP codes are exactly six ASCII digits.
pub fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == OTP_CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::OtpCode)
    }
}

/// Reduce a client-supplied filename to its final path component.
///
/// Both `/` and `\` count as separators. Control characters are dropped.
/// Names that end up empty or as `.`/`..` are rejected.
///
/// # Examples
///
/// ```
/// use fileshare::auth::validation::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
/// assert_eq!(sanitize_filename("C:\\Users\\me\\report.pdf").unwrap(), "report.pdf");
/// assert!(sanitize_filename("..").is_err());
/// ```
pub fn sanitize_filename(name: &str) -> Result<String, ValidationError> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(ValidationError::Filename);
    }
    if cleaned.chars().count() > crate::file::MAX_FILENAME_LENGTH {
        return Err(ValidationError::Filename);
    }
    Ok(cleaned.to_string())
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
