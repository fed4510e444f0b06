//! Session tokens.
//!
//! Tokens are HS256 JWTs signed with the secret shared by the authority and
//! the gateway. They are stateless bearer tokens. The only server-side check
//! beyond signature and expiry is the revocation hook, which resolves the
//! subject against the credential store on every verification.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::db::{User, UserRepository};
use crate::{FileShareError, Result};

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    pub username: String,
    pub role: String,
    /// Verification flag at issue time. Authorization uses the stored value.
    pub verified: bool,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// Token ID.
    pub jti: String,
}

/// Why a token was refused.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Bad signature, malformed token or past expiry. The client should log in again.
    #[error("token invalid or expired")]
    Invalid,

    /// Well-formed token whose account no longer exists.
    #[error("token revoked")]
    Revoked,

    /// The revocation lookup itself failed.
    #[error("revocation check failed: {0}")]
    Store(#[from] FileShareError),
}

impl SessionError {
    /// Reason string echoed to clients on 401 responses.
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Revoked => "token_revoked",
            _ => "token_invalid",
        }
    }
}

/// Resolves a token subject to a live account.
///
/// The store-backed implementation is [`StoreRevocation`]; tests can plug
/// in their own.
#[async_trait]
pub trait RevocationCheck: Send + Sync {
    /// Return the stored user, or `None` if the account is gone.
    async fn resolve(&self, user_id: &str) -> Result<Option<User>>;
}

/// Revocation check backed by the credential store.
#[derive(Clone)]
pub struct StoreRevocation {
    pool: SqlitePool,
}

impl StoreRevocation {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationCheck for StoreRevocation {
    async fn resolve(&self, user_id: &str) -> Result<Option<User>> {
        UserRepository::new(&self.pool).get_by_id(user_id).await
    }
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl SessionAuthority {
    /// Create an authority from a shared secret and token lifetime.
    pub fn new(secret: &str, expiry: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry,
        }
    }

    /// Create an authority from the `[session]` config section.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::from_secs(config.token_expiry_secs),
        )
    }

    /// Token lifetime.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Issue a token for a user.
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            verified: user.verified,
            iat: now,
            exp: now + self.expiry.as_secs(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        self.encode(&claims)
    }

    /// Sign arbitrary claims.
    pub fn encode(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode session token: {}", e);
            FileShareError::Auth("failed to issue token".to_string())
        })
    }

    /// Check signature and expiry only.
    ///
    /// A token stops being valid at `exp`, matching the public link rule
    /// that a share is expired at exactly `validUntil`.
    pub fn decode(&self, token: &str) -> std::result::Result<Claims, SessionError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Session token rejected: {}", e);
                SessionError::Invalid
            })?;

        let now = Utc::now().timestamp().max(0) as u64;
        if claims.exp <= now {
            tracing::debug!("Session token rejected: expired at {}", claims.exp);
            return Err(SessionError::Invalid);
        }
        Ok(claims)
    }

    /// Full verification: signature, expiry, then the revocation hook.
    ///
    /// Returns the claims together with the stored user, whose `verified`
    /// flag is the one authorization decisions use.
    pub async fn verify(
        &self,
        token: &str,
        revocation: &dyn RevocationCheck,
    ) -> std::result::Result<(Claims, User), SessionError> {
        let claims = self.decode(token)?;
        match revocation.resolve(&claims.sub).await? {
            Some(user) => Ok((claims, user)),
            None => {
                tracing::info!(user_id = %claims.sub, "Rejected token for deleted account");
                Err(SessionError::Revoked)
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
