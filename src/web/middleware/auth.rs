//! Session authentication for both HTTP surfaces.
//!
//! Every authenticated request pays one credential store lookup: the token's
//! subject must still exist, otherwise the token counts as revoked.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{bearer_token, Claims, RevocationCheck, SessionAuthority};
use crate::db::User;
use crate::web::error::ApiError;

/// Token verification plus the revocation hook.
#[derive(Clone)]
pub struct SessionGuard {
    sessions: SessionAuthority,
    revocation: Arc<dyn RevocationCheck>,
}

impl SessionGuard {
    pub fn new(sessions: SessionAuthority, revocation: Arc<dyn RevocationCheck>) -> Self {
        Self {
            sessions,
            revocation,
        }
    }

    pub fn sessions(&self) -> &SessionAuthority {
        &self.sessions
    }

    /// Authenticate the bearer token in `headers`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::unauthenticated("Missing authorization"))?;

        let (claims, user) = self
            .sessions
            .verify(token, self.revocation.as_ref())
            .await?;
        Ok(CurrentUser { user, claims })
    }
}

/// Router states that can authenticate a request.
pub trait SessionState {
    fn session_guard(&self) -> &SessionGuard;
}

impl<T: SessionState> SessionState for Arc<T> {
    fn session_guard(&self) -> &SessionGuard {
        (**self).session_guard()
    }
}

impl SessionState for SessionGuard {
    fn session_guard(&self) -> &SessionGuard {
        self
    }
}

/// The authenticated caller.
///
/// `user` is the stored account resolved during verification; its flags
/// are the ones authorization uses.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub claims: Claims,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: SessionState + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(current.clone());
        }
        state.session_guard().authenticate(&parts.headers).await
    }
}

/// Middleware rejecting requests without a valid session.
///
/// The authenticated caller is stored in the request extensions.
pub async fn require_session(
    State(guard): State<Arc<SessionGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    match guard.authenticate(request.headers()).await {
        Ok(current) => {
            request.extensions_mut().insert(current);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
