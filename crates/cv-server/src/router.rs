//! Axum router construction.
//!
//! Builds the full application router with all route groups and middleware
//! layers.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::auth::auth_middleware;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Account routes -- always accessible.
    let account_routes = Router::new()
        .route("/users/register", post(routes::users::register))
        .route("/users/login", post(routes::users::login));

    // Recording routes -- require a valid bearer token.
    let recording_routes = Router::new()
        .route("/recordings/start", post(routes::recordings::start))
        .route("/recordings/stop", post(routes::recordings::stop))
        .route("/recordings", get(routes::recordings::list))
        .route("/recordings/{id}", get(routes::recordings::status))
        .route("/recordings/{id}/video", get(routes::recordings::video))
        .layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware));

    let api = account_routes.merge(recording_routes);

    let max_upload_bytes = (ctx.config.server.max_upload_mb as usize) * 1024 * 1024;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        // Uploads exceed axum's 2MB default body limit.
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
