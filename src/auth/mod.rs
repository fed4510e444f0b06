//! Authentication and authorization.
//!
//! Password hashing, one-time passwords, session tokens, structural input
//! validation, account flows and the access-control rules for shares.

pub mod account;
pub mod otp;
mod password;
pub mod permission;
pub mod session;
pub mod validation;

pub use account::{
    authenticate, change_password, delete_account, purge_unverified_accounts, register,
    AccountError, RegistrationRequest, UserProfile,
};
pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use permission::AccessError;
pub use session::{
    bearer_token, Claims, RevocationCheck, SessionAuthority, SessionError, StoreRevocation,
};
pub use validation::ValidationError;
