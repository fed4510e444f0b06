//! Router configuration for the gateway.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::rate_limit::{api_rate_limit, login_rate_limit, RateLimits};
use super::routes::{
    add_share_file, change_password, create_share, delete_account, delete_file, delete_share,
    download_public_file, download_public_share, get_share, get_share_file, give_access,
    health_check, list_files, list_shares, login, profile, register, remove_share_file,
    run_query, toggle_publish, upload_file, GatewayState,
};
use crate::web::middleware::{create_cors_layer, require_session, security_headers};

/// Upper bound for non-upload request bodies.
const JSON_BODY_LIMIT: usize = 256 * 1024;

/// Extra room for multipart framing on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Settings that shape the gateway router.
#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    pub cors_origins: Vec<String>,
    pub max_upload_size: usize,
}

/// Create the gateway router.
///
/// Every public path lives under `/api` and maps onto the authority path
/// with the prefix removed. Only login, registration, public downloads and
/// the health check skip the session check.
pub fn create_router(
    state: Arc<GatewayState>,
    limits: Arc<RateLimits>,
    options: &GatewayOptions,
) -> Router {
    let upload_limit = options.max_upload_size + MULTIPART_OVERHEAD;

    let credential_routes = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            limits.clone(),
            login_rate_limit,
        ));

    let public_routes = Router::new()
        .merge(credential_routes)
        .route("/shares/download/:link", get(download_public_share))
        .route(
            "/shares/download/:link/:file_id/raw",
            get(download_public_file),
        );

    let auth_routes = Router::new()
        .route("/profile", get(profile))
        .route("/change-password", post(change_password))
        .route("/account", delete(delete_account));

    let file_routes = Router::new()
        .route("/", get(list_files))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/:uid", delete(delete_file));

    let share_routes = Router::new()
        .route("/", get(list_shares).post(create_share))
        .route("/:uid", get(get_share).delete(delete_share))
        .route("/:uid/toggle-publish", get(toggle_publish))
        .route("/:uid/give-access", post(give_access))
        .route("/:uid/files", post(add_share_file))
        .route(
            "/:uid/files/:filename",
            get(get_share_file).delete(remove_share_file),
        );

    let protected_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/files", file_routes)
        .nest("/shares", share_routes)
        .route("/query", post(run_query))
        .route_layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_session,
        ));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(limits, api_rate_limit));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&options.cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(RequestBodyLimitLayer::new(upload_limit.max(JSON_BODY_LIMIT))),
        )
        .with_state(state)
}
