//! User account operations.

use chrono::Utc;
use rusqlite::Connection;
use cv_core::{Error, Result, UserId};

use crate::models::User;

const COLS: &str = "id, email, password_hash, display_name, camera_permission,
    microphone_permission, created_at";

/// Create a new user and return it.
///
/// The UNIQUE constraint on `email` is enforced by SQLite at insert time;
/// a violation maps to [`Error::Conflict`]. Callers must not rely on a
/// prior existence check being race-free.
pub fn create_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    display_name: &str,
) -> Result<User> {
    let id = UserId::new();
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (id, email, password_hash, display_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id.to_string(), email, password_hash, display_name, created_at],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(format!("User '{email}' already exists"))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(User {
        id,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        display_name: display_name.to_string(),
        camera_permission: false,
        microphone_permission: false,
        created_at,
    })
}

/// Get a user by primary key.
pub fn get_user_by_id(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let q = format!("SELECT {COLS} FROM users WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], User::from_row);
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a user by email.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let q = format!("SELECT {COLS} FROM users WHERE email = ?1");
    let result = conn.query_row(&q, [email], User::from_row);
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Count users registered under an email. Used by tests to assert the
/// uniqueness invariant holds under duplicate registration.
pub fn count_by_email(conn: &Connection, email: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        [email],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
