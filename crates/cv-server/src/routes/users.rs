//! Account route handlers: registration and login.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;

/// Registration request payload.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// User DTO returned by the API. Deliberately excludes the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub camera_permission: bool,
    pub microphone_permission: bool,
    pub created_at: String,
}

impl From<cv_db::models::User> for UserResponse {
    fn from(u: cv_db::models::User) -> Self {
        Self {
            id: u.id.to_string(),
            email: u.email,
            name: u.display_name,
            camera_permission: u.camera_permission,
            microphone_permission: u.microphone_permission,
            created_at: u.created_at,
        }
    }
}

/// Registration response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub data: UserResponse,
}

/// Login request payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
}

/// POST /api/users/register
///
/// The pre-insert lookup gives a friendly error for the common case, but
/// the UNIQUE constraint in the store is what actually arbitrates
/// uniqueness under concurrent registration.
pub async fn register(
    State(ctx): State<AppContext>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if payload.email.trim().is_empty() {
        return Err(cv_core::Error::Validation("email is required".into()).into());
    }
    if payload.password.is_empty() {
        return Err(cv_core::Error::Validation("password is required".into()).into());
    }

    let conn = cv_db::pool::get_conn(&ctx.db)?;

    if cv_db::queries::users::get_user_by_email(&conn, &payload.email)?.is_some() {
        return Err(cv_core::Error::Conflict(format!(
            "User '{}' already exists",
            payload.email
        ))
        .into());
    }

    let hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| cv_core::Error::Internal(format!("bcrypt error: {e}")))?;

    let user =
        cv_db::queries::users::create_user(&conn, &payload.email, &hash, &payload.name)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            data: user.into(),
        }),
    ))
}

/// POST /api/users/login
///
/// Unknown email and wrong password both produce the same 401 so callers
/// cannot enumerate accounts.
pub async fn login(
    State(ctx): State<AppContext>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let conn = cv_db::pool::get_conn(&ctx.db)?;

    let user = cv_db::queries::users::get_user_by_email(&conn, &payload.email)?
        .ok_or_else(|| cv_core::Error::Unauthorized("Authentication failed".to_string()))?;

    let password_valid = bcrypt::verify(&payload.password, &user.password_hash).unwrap_or(false);
    if !password_valid {
        return Err(cv_core::Error::Unauthorized("Authentication failed".into()).into());
    }

    let token = ctx.tokens.issue(user.id, &user.email)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id.to_string(),
    }))
}
