//! cv-server: HTTP API server and capture/ingest pipeline.
//!
//! This crate ties together the other cv-* crates into a running server
//! application. It provides:
//!
//! - Axum-based HTTP API with token authentication
//! - Per-user capture session bookkeeping
//! - Background transcode tasks spawned per ingest
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod router;
pub mod routes;
pub mod token;

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;

use cv_core::config::Config;

use crate::context::AppContext;
use crate::token::TokenIssuer;

/// Start the clipvault server.
///
/// This is the main entry point. It initializes the database and uploads
/// directory, constructs the [`AppContext`], and serves the HTTP API until
/// a shutdown signal is received.
///
/// A missing or empty `auth.token_secret` is a fatal startup error, not a
/// per-request one.
pub async fn start(config: Config) -> cv_core::Result<()> {
    // Validate configuration.
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let secret = config
        .auth
        .token_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            cv_core::Error::Validation(
                "auth.token_secret must be set (try `clipvault generate-secret`)".into(),
            )
        })?
        .to_string();

    // Initialize database.
    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let db_str = db_path.to_string_lossy();
    let db = cv_db::pool::init_pool(&db_str)?;
    if existed {
        tracing::info!("Database opened (existing) at {db_str}");
    } else {
        tracing::info!("Database created (new) at {db_str}");
    }

    // Recordings stuck in `transcoding` belong to tasks from a previous
    // process; fail them so retrieval falls back to the raw artifact.
    {
        let conn = cv_db::pool::get_conn(&db)?;
        match cv_db::queries::recordings::reset_orphaned(&conn) {
            Ok(n) if n > 0 => {
                tracing::info!("Reset {n} orphaned transcodes from previous session");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to reset orphaned transcodes: {e}");
            }
        }
    }

    // Ensure the uploads directory exists before the first ingest.
    std::fs::create_dir_all(&config.server.uploads_dir)?;

    // Discover external tools.
    let tools = Arc::new(cv_av::ToolRegistry::discover(&config.tools));
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {} (transcodes will fail over to raw serving)", info.name);
        }
    }

    let tokens = Arc::new(TokenIssuer::new(&secret, config.auth.token_ttl_hours));

    let ctx = AppContext {
        db,
        config: Arc::new(config.clone()),
        tools,
        tokens,
        captures: Arc::new(DashMap::new()),
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| cv_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = router::build_router(ctx);

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| cv_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| cv_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
