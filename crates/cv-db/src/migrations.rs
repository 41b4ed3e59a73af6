//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use cv_core::{Error, Result};

/// V1: initial schema -- user accounts and recording artifacts.
///
/// The UNIQUE constraint on `users.email` is the single arbiter of email
/// uniqueness; the service layer's pre-check is advisory only.
const V1_INITIAL: &str = r#"
CREATE TABLE users (
    id                    TEXT PRIMARY KEY,
    email                 TEXT UNIQUE NOT NULL,
    password_hash         TEXT NOT NULL,
    display_name          TEXT NOT NULL,
    camera_permission     INTEGER NOT NULL DEFAULT 0,
    microphone_permission INTEGER NOT NULL DEFAULT 0,
    created_at            TEXT NOT NULL
);

-- Recording artifacts. `status` is the pipeline state machine:
-- raw -> transcoding -> ready | failed
CREATE TABLE recordings (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES users(id),
    file_name       TEXT NOT NULL,
    raw_path        TEXT NOT NULL,
    transcoded_path TEXT,
    status          TEXT NOT NULL DEFAULT 'raw',
    size_bytes      INTEGER NOT NULL,
    error           TEXT,
    created_at      TEXT NOT NULL,
    completed_at    TEXT
);

CREATE INDEX idx_recordings_user ON recordings(user_id);
"#;

/// V2: index for the transcode worker's status lookups and startup sweep.
const V2_RECORDING_STATUS: &str = r#"
CREATE INDEX idx_recordings_status ON recordings(status);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, V1_INITIAL),
    (2, V2_RECORDING_STATUS),
];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(())
}
