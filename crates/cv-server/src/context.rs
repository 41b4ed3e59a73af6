//! Service-oriented application context.
//!
//! [`AppContext`] is the central struct shared across all route handlers
//! via Axum state. It wraps immutable infrastructure (DB pool, tools,
//! token issuer) in `Arc`s plus the per-user capture session map.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use cv_av::ToolRegistry;
use cv_core::config::Config;
use cv_core::UserId;
use cv_db::pool::DbPool;

use crate::token::TokenIssuer;

/// Bookkeeping for one user's open capture session.
///
/// One entry per authenticated user, keyed in [`AppContext::captures`].
/// Restarting a session replaces the entry; there is no "already
/// recording" lock at this layer.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    /// When the session was (re)started.
    pub started_at: DateTime<Utc>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s and the pool
/// handle.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool.
    pub db: DbPool,
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
    /// Stateless credential token issuer/verifier.
    pub tokens: Arc<TokenIssuer>,
    /// Open capture sessions, scoped per authenticated user.
    pub captures: Arc<DashMap<UserId, CaptureSession>>,
}
