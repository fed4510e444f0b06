//! Middleware shared by the authority and the gateway.

pub mod auth;
pub mod cors;
pub mod security;

pub use auth::{require_session, CurrentUser, SessionGuard, SessionState};
pub use cors::create_cors_layer;
pub use security::security_headers;
