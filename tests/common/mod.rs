//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temp uploads
//! directory, and a full [`AppContext`]. The [`with_server`] constructor
//! starts Axum on a random port for HTTP-level testing.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tempfile::TempDir;

use cv_av::ToolRegistry;
use cv_core::config::Config;
use cv_core::UserId;
use cv_db::pool::{init_memory_pool, DbPool};
use cv_server::context::AppContext;
use cv_server::router::build_router;
use cv_server::token::TokenIssuer;

/// Default config for tests: signing secret set, transcoding disabled so
/// ingest outcomes are deterministic regardless of whether ffmpeg exists
/// on the host.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.token_secret = Some("test-secret".into());
    config.transcode.enabled = false;
    config
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and a temporary uploads directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    // Held so the uploads directory outlives the test.
    _uploads: TempDir,
}

impl TestHarness {
    /// Create a new harness with default test configuration.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a new harness with a custom configuration.
    pub fn with_config(mut config: Config) -> Self {
        let uploads = tempfile::tempdir().expect("failed to create uploads tempdir");
        config.server.uploads_dir = uploads.path().to_path_buf();

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let tools = Arc::new(ToolRegistry::discover(&config.tools));
        let secret = config
            .auth
            .token_secret
            .clone()
            .expect("test config must set a token secret");
        let tokens = Arc::new(TokenIssuer::new(&secret, config.auth.token_ttl_hours));

        let ctx = AppContext {
            db: db.clone(),
            config: Arc::new(config),
            tools,
            tokens,
            captures: Arc::new(DashMap::new()),
        };

        Self {
            ctx,
            db,
            _uploads: uploads,
        }
    }

    /// Start an Axum server on a random port and return the harness
    /// together with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(test_config()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> cv_db::pool::PooledConnection {
        cv_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Insert a user directly, returning its id.
    pub fn create_user(&self, email: &str, password: &str) -> UserId {
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).unwrap();
        let conn = self.conn();
        cv_db::queries::users::create_user(&conn, email, &hash, "Test User")
            .expect("failed to create user")
            .id
    }
}

/// Register and log in over HTTP, returning the bearer token.
#[allow(dead_code)]
pub async fn signup(addr: SocketAddr, email: &str, password: &str) -> String {
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/users/register"))
        .json(&serde_json::json!({
            "email": email,
            "password": password,
            "name": "Test User",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("http://{addr}/api/users/login"))
        .json(&serde_json::json!({
            "email": email,
            "password": password,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    json["token"].as_str().unwrap().to_string()
}
