//! Time-based one-time passwords.
//!
//! Standard TOTP parameters: SHA-1, six digits, 30 second steps and one
//! step of tolerance on either side. Secrets are 20 random bytes stored as
//! base32, which is also what authenticator apps expect.

use chrono::{DateTime, Utc};
use rand::RngCore;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::auth::validation::validate_otp_code;
use crate::{FileShareError, Result};

/// Secret size in bytes.
pub const SECRET_BYTES: usize = 20;

/// Step length in seconds.
pub const STEP_SECS: u64 = 30;

/// Accepted steps before and after the current one.
pub const SKEW_STEPS: u8 = 1;

const DIGITS: usize = 6;

/// Generate a fresh base32 OTP secret.
pub fn generate_secret() -> String {
    let mut bytes = vec![0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    Secret::Raw(bytes).to_encoded().to_string()
}

fn build(secret: &str, issuer: Option<&str>, account: &str) -> Result<TOTP> {
    let bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| FileShareError::Auth(format!("malformed OTP secret: {e:?}")))?;
    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW_STEPS,
        STEP_SECS,
        bytes,
        issuer.map(str::to_string),
        account.to_string(),
    )
    .map_err(|e| FileShareError::Auth(format!("invalid OTP parameters: {e}")))
}

fn unix_seconds(now: DateTime<Utc>) -> u64 {
    now.timestamp().max(0) as u64
}

/// Check `code` against `secret` at time `now`.
///
/// A code that is not six digits is simply a mismatch. An undecodable
/// secret is an error, since it means the stored account is broken.
pub fn verify_code(secret: &str, code: &str, now: DateTime<Utc>) -> Result<bool> {
    let totp = build(secret, None, "")?;
    if validate_otp_code(code).is_err() {
        return Ok(false);
    }
    Ok(totp.check(code, unix_seconds(now)))
}

/// The code valid for `secret` at time `now`.
pub fn code_at(secret: &str, now: DateTime<Utc>) -> Result<String> {
    Ok(build(secret, None, "")?.generate(unix_seconds(now)))
}

/// `otpauth://` URI for enrolling the secret in an authenticator app.
pub fn provisioning_uri(secret: &str, issuer: &str, account: &str) -> Result<String> {
    // otpauth labels use ':' as the issuer separator
    let issuer = issuer.replace(':', "");
    let account = account.replace(':', "");
    Ok(build(secret, Some(&issuer), &account)?.get_url())
}
