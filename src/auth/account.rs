//! Account lifecycle: registration, login, password change and deletion.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::otp;
use crate::auth::validation::{validate_username, ValidationError};
use crate::auth::{hash_password, validate_password, verify_password, PasswordError};
use crate::db::{Database, NewUser, Role, User, UserRepository};
use crate::file::FileStorage;
use crate::FileShareError;

/// Account errors. Display strings are what clients see.
#[derive(Error, Debug)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Username is already used.")]
    UsernameExists,

    /// Unknown user or wrong password; the two are not distinguished.
    #[error("Please check again your username or password")]
    InvalidCredentials,

    #[error("Please check again your password")]
    WrongPassword,

    #[error("The new passwords don't match.")]
    PasswordMismatch,

    #[error("User not found.")]
    UserNotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] FileShareError),
}

impl AccountError {
    /// Whether the error comes from user input rather than the server.
    pub fn is_client_error(&self) -> bool {
        match self {
            AccountError::Password(e) => {
                matches!(e, PasswordError::TooShort | PasswordError::TooLong)
            }
            AccountError::Store(_) => false,
            _ => true,
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
}

impl RegistrationRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// What an account holder sees about themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub verified: bool,
    /// `otpauth://` URI for the account's authenticator.
    pub otp_uri: String,
}

impl UserProfile {
    pub fn new(user: &User, issuer: &str) -> Result<Self, AccountError> {
        Ok(Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            verified: user.verified,
            otp_uri: otp::provisioning_uri(&user.otp_secret, issuer, &user.username)?,
        })
    }
}

/// Register a new, unverified user.
///
/// The username is trimmed before validation and storage. A fresh OTP
/// secret is issued here and never changes afterwards.
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> Result<User, AccountError> {
    let username = validate_username(&request.username)?;
    validate_password(&request.password)?;

    if repo.username_exists(&username).await? {
        return Err(AccountError::UsernameExists);
    }

    let password_hash = hash_password(&request.password)?;
    let new_user = NewUser::new(&username, password_hash, otp::generate_secret());

    // a concurrent registration may win between the check and the insert
    let user = repo.create(&new_user).await.map_err(|e| match e {
        FileShareError::Validation(_) => AccountError::UsernameExists,
        e => AccountError::Store(e),
    })?;

    info!(username = %user.username, user_id = %user.id, "New user registered");
    Ok(user)
}

/// Check a username and password.
pub async fn authenticate(
    repo: &UserRepository<'_>,
    username: &str,
    password: &str,
) -> Result<User, AccountError> {
    let user = repo
        .get_by_username(username.trim())
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    match verify_password(password, &user.password) {
        Ok(()) => Ok(user),
        Err(PasswordError::VerificationFailed) => Err(AccountError::InvalidCredentials),
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            Err(AccountError::InvalidCredentials)
        }
    }
}

/// Change a password after checking the current one.
pub async fn change_password(
    repo: &UserRepository<'_>,
    user_id: &str,
    current: &str,
    new_password: &str,
    confirmation: &str,
) -> Result<(), AccountError> {
    if new_password != confirmation {
        return Err(AccountError::PasswordMismatch);
    }
    validate_password(new_password)?;

    let user = repo
        .get_by_id(user_id)
        .await?
        .ok_or(AccountError::UserNotFound)?;

    verify_password(current, &user.password).map_err(|e| match e {
        PasswordError::VerificationFailed => AccountError::WrongPassword,
        other => AccountError::Password(other),
    })?;

    let hash = hash_password(new_password)?;
    if !repo.update_password(&user.id, &hash).await? {
        return Err(AccountError::UserNotFound);
    }

    info!(user_id = %user.id, "Password changed");
    Ok(())
}

/// Delete an account and everything it owns, then its stored bytes.
pub async fn delete_account(
    db: &Database,
    storage: &FileStorage,
    user_id: &str,
) -> Result<(), AccountError> {
    let locators = UserRepository::new(db.pool())
        .delete(user_id)
        .await?
        .ok_or(AccountError::UserNotFound)?;

    let removed = storage.delete_all(&locators).await;
    info!(user_id = %user_id, files = locators.len(), removed, "Account deleted");
    Ok(())
}

/// Delete every unverified account. Returns the number of accounts removed.
pub async fn purge_unverified_accounts(
    db: &Database,
    storage: &FileStorage,
) -> crate::Result<usize> {
    let (count, locators) = UserRepository::new(db.pool()).purge_unverified().await?;
    storage.delete_all(&locators).await;
    if count > 0 {
        info!(count, files = locators.len(), "Purged unverified accounts");
    }
    Ok(count)
}
