//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use cv_core::{RecordingId, UserId};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub camera_permission: bool,
    pub microphone_permission: bool,
    pub created_at: String,
}

impl User {
    /// Build from a row selected as:
    /// id, email, password_hash, display_name, camera_permission,
    /// microphone_permission, created_at
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            display_name: row.get(3)?,
            camera_permission: row.get::<_, i32>(4).unwrap_or(0) != 0,
            microphone_permission: row.get::<_, i32>(5).unwrap_or(0) != 0,
            created_at: row.get(6)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// Pipeline states for a recording artifact.
pub mod recording_status {
    /// Raw upload persisted; no transcode attempted yet.
    pub const RAW: &str = "raw";
    /// Transcode task running.
    pub const TRANSCODING: &str = "transcoding";
    /// Transcoded artifact available.
    pub const READY: &str = "ready";
    /// Transcode failed; the raw artifact remains servable.
    pub const FAILED: &str = "failed";
}

#[derive(Debug, Clone)]
pub struct Recording {
    pub id: RecordingId,
    pub user_id: UserId,
    pub file_name: String,
    pub raw_path: String,
    pub transcoded_path: Option<String>,
    pub status: String,
    pub size_bytes: i64,
    pub error: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl Recording {
    /// Build from a row selected as:
    /// id, user_id, file_name, raw_path, transcoded_path, status,
    /// size_bytes, error, created_at, completed_at
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            file_name: row.get(2)?,
            raw_path: row.get(3)?,
            transcoded_path: row.get(4)?,
            status: row.get(5)?,
            size_bytes: row.get(6)?,
            error: row.get(7)?,
            created_at: row.get(8)?,
            completed_at: row.get(9)?,
        })
    }
}
