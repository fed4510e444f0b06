//! Per-client rate limiting.

use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter};

use crate::config::GatewayConfig;
use crate::web::error::ApiError;

/// Keyed limiter, one bucket per client address.
pub type ClientRateLimiter = governor::DefaultKeyedRateLimiter<String>;

/// Limits for credential endpoints and for the API as a whole.
pub struct RateLimits {
    login: ClientRateLimiter,
    api: ClientRateLimiter,
}

fn per_minute(requests: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN))
}

impl RateLimits {
    /// Create limits allowing the given number of requests per minute.
    pub fn new(login_per_minute: u32, api_per_minute: u32) -> Self {
        Self {
            login: RateLimiter::keyed(per_minute(login_per_minute)),
            api: RateLimiter::keyed(per_minute(api_per_minute)),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.login_rate_limit, config.api_rate_limit)
    }

    /// Check the login/registration bucket for `client`.
    pub fn check_login(&self, client: &str) -> bool {
        self.login.check_key(&client.to_string()).is_ok()
    }

    /// Check the general API bucket for `client`.
    pub fn check_api(&self, client: &str) -> bool {
        self.api.check_key(&client.to_string()).is_ok()
    }

    /// Drop buckets that are full again.
    pub fn cleanup(&self) {
        self.login.retain_recent();
        self.api.retain_recent();
    }

    /// Periodically drop idle buckets.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(300)).await;
                self.cleanup();
            }
        });
    }
}

/// Address of the client, preferring proxy headers.
fn client_key(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    if let Some(real_ip) = req
        .headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.trim().to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Middleware for the login and registration routes.
pub async fn login_rate_limit(
    State(limits): State<Arc<RateLimits>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);
    if !limits.check_login(&client) {
        tracing::warn!(client = %client, "Login rate limit exceeded");
        return ApiError::too_many_requests("Too many login attempts. Please try again later.")
            .into_response();
    }
    next.run(req).await
}

/// Middleware for every API route.
pub async fn api_rate_limit(
    State(limits): State<Arc<RateLimits>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);
    if !limits.check_api(&client) {
        tracing::warn!(client = %client, "API rate limit exceeded");
        return ApiError::too_many_requests("Too many requests. Please try again later.")
            .into_response();
    }
    next.run(req).await
}
