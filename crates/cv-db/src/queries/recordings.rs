//! Recording artifact operations and the transcode state machine.

use chrono::Utc;
use rusqlite::Connection;
use cv_core::{Error, RecordingId, Result, UserId};

use crate::models::{recording_status, Recording};

const COLS: &str = "id, user_id, file_name, raw_path, transcoded_path, status,
    size_bytes, error, created_at, completed_at";

/// Create a recording row in the `raw` state.
///
/// Called after the raw artifact has been durably written; the row never
/// references a file that does not exist yet.
pub fn create_recording(
    conn: &Connection,
    id: RecordingId,
    user_id: UserId,
    file_name: &str,
    raw_path: &str,
    size_bytes: i64,
) -> Result<Recording> {
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO recordings (id, user_id, file_name, raw_path, status, size_bytes, created_at)
         VALUES (?1, ?2, ?3, ?4, 'raw', ?5, ?6)",
        rusqlite::params![
            id.to_string(),
            user_id.to_string(),
            file_name,
            raw_path,
            size_bytes,
            created_at
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Recording {
        id,
        user_id,
        file_name: file_name.to_string(),
        raw_path: raw_path.to_string(),
        transcoded_path: None,
        status: recording_status::RAW.to_string(),
        size_bytes,
        error: None,
        created_at,
        completed_at: None,
    })
}

/// Get a recording by ID.
pub fn get_recording(conn: &Connection, id: RecordingId) -> Result<Option<Recording>> {
    let q = format!("SELECT {COLS} FROM recordings WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], Recording::from_row);
    match result {
        Ok(r) => Ok(Some(r)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List a user's recordings, newest first.
pub fn list_recordings_for_user(conn: &Connection, user_id: UserId) -> Result<Vec<Recording>> {
    let q = format!(
        "SELECT {COLS} FROM recordings WHERE user_id = ?1 ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], Recording::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Transition `raw` -> `transcoding`.
pub fn mark_transcoding(conn: &Connection, id: RecordingId) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE recordings SET status = 'transcoding' WHERE id = ?1",
            [id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Transition to `ready`, recording the transcoded artifact path.
pub fn complete_transcode(
    conn: &Connection,
    id: RecordingId,
    transcoded_path: &str,
) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "UPDATE recordings SET status = 'ready', transcoded_path = ?1, completed_at = ?2
             WHERE id = ?3",
            rusqlite::params![transcoded_path, now, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Transition to `failed`, storing the error text for diagnosis.
pub fn fail_transcode(conn: &Connection, id: RecordingId, error: &str) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "UPDATE recordings SET status = 'failed', error = ?1, completed_at = ?2
             WHERE id = ?3",
            rusqlite::params![error, now, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Sweep recordings stuck in `transcoding` from a previous process into
/// `failed`. Run once at startup; the spawned tasks that owned them are gone.
pub fn reset_orphaned(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "UPDATE recordings SET status = 'failed', error = 'interrupted by restart',
                completed_at = ?1
             WHERE status = 'transcoding'",
            [now],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n)
}
