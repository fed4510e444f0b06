//! Router configuration for the authority.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use super::middleware::security_headers;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    add_share_file, change_password, create_share, delete_account, delete_file, delete_share,
    download_public_file, download_public_share, get_share, get_share_file, give_access,
    health_check, list_files, list_shares, login, profile, register, remove_share_file,
    run_query, toggle_publish, upload_file, AppState,
};

/// Extra room for multipart framing on top of the upload limit.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Create the authority router.
///
/// Paths carry no prefix; the gateway maps its public `/api` paths onto
/// these.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let body_limit = (app_state.max_upload_size + MULTIPART_OVERHEAD) as usize;

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile))
        .route("/change-password", post(change_password))
        .route("/account", delete(delete_account));

    let file_routes = Router::new()
        .route("/", get(list_files))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/:uid", delete(delete_file));

    let share_routes = Router::new()
        .route("/", get(list_shares).post(create_share))
        .route("/download/:link", get(download_public_share))
        .route("/download/:link/:file_id/raw", get(download_public_file))
        .route("/:uid", get(get_share).delete(delete_share))
        .route("/:uid/toggle-publish", get(toggle_publish))
        .route("/:uid/give-access", post(give_access))
        .route("/:uid/files", post(add_share_file))
        .route(
            "/:uid/files/:filename",
            get(get_share_file).delete(remove_share_file),
        );

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/files", file_routes)
        .nest("/shares", share_routes)
        .route("/query", post(run_query))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}
