//! Recording route handlers: capture session control, upload ingest,
//! status polling, and artifact retrieval.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Serialize;

use cv_core::{RecordingId, UserId};
use cv_db::models::{recording_status, Recording};

use crate::context::{AppContext, CaptureSession};
use crate::error::AppError;
use crate::pipeline;
use crate::routes::streaming;

/// Recording DTO. Artifact paths are server-internal and not exposed.
#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub id: String,
    pub file_name: String,
    pub status: String,
    pub size_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<Recording> for RecordingResponse {
    fn from(r: Recording) -> Self {
        Self {
            id: r.id.to_string(),
            file_name: r.file_name,
            status: r.status,
            size_bytes: r.size_bytes,
            error: r.error,
            created_at: r.created_at,
            completed_at: r.completed_at,
        }
    }
}

/// Response for session control and ingest.
#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording: Option<RecordingResponse>,
}

/// POST /api/recordings/start
///
/// (Re)opens the caller's capture session. Idempotent: starting while a
/// session is already open simply restarts the bookkeeping.
pub async fn start(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Json<CaptureResponse> {
    ctx.captures.insert(user_id, CaptureSession::new());
    tracing::debug!(user_id = %user_id, "Capture session started");

    Json(CaptureResponse {
        message: "Recording started".into(),
        recording: None,
    })
}

/// POST /api/recordings/stop
///
/// Accepts the completed capture as a multipart upload (field "video"),
/// persists it, and queues the transcode. Succeeds once the raw artifact
/// is durable; transcode progress is visible via the status endpoints.
///
/// A prior `/start` is not required; the session entry, if any, is closed.
pub async fn stop(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    mut multipart: Multipart,
) -> Result<Json<CaptureResponse>, AppError> {
    let mut data: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| cv_core::Error::Validation(format!("multipart error: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "video" => {
                let declared_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| cv_core::Error::Validation(format!("multipart error: {e}")))?;
                data = Some((bytes.to_vec(), declared_name));
            }
            other => {
                tracing::debug!("Ignoring unknown multipart field: {other:?}");
            }
        }
    }

    let (bytes, declared_name) = data
        .ok_or_else(|| cv_core::Error::Validation("No video data received".to_string()))?;

    ctx.captures.remove(&user_id);

    let recording = pipeline::ingest(&ctx, user_id, bytes, declared_name.as_deref()).await?;

    Ok(Json(CaptureResponse {
        message: "Recording stopped and saved".into(),
        recording: Some(recording.into()),
    }))
}

/// GET /api/recordings — list the caller's recordings, newest first.
pub async fn list(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<RecordingResponse>>, AppError> {
    let conn = cv_db::pool::get_conn(&ctx.db)?;
    let recordings = cv_db::queries::recordings::list_recordings_for_user(&conn, user_id)?;
    Ok(Json(recordings.into_iter().map(Into::into).collect()))
}

/// GET /api/recordings/{id} — pipeline status for one recording.
pub async fn status(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<RecordingResponse>, AppError> {
    let recording = lookup_owned(&ctx, user_id, &id)?;
    Ok(Json(recording.into()))
}

/// GET /api/recordings/{id}/video
///
/// Streams the transcoded artifact when ready, else falls back to the raw
/// artifact. An unfinished or failed transcode is never an error here;
/// only a recording with no artifact on disk yields 404.
pub async fn video(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let recording = lookup_owned(&ctx, user_id, &id)?;

    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_owned());

    // Prefer the transcoded artifact once the pipeline reports it ready.
    if recording.status == recording_status::READY {
        if let Some(ref transcoded) = recording.transcoded_path {
            let path = std::path::Path::new(transcoded);
            if path.exists() {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("video.mp4");
                return Ok(streaming::serve_file_streaming(
                    path,
                    name,
                    range_header.as_deref(),
                )
                .await?);
            }
            tracing::warn!(
                recording_id = %recording.id,
                "Transcoded artifact missing on disk; serving raw"
            );
        }
    }

    let raw = std::path::Path::new(&recording.raw_path);
    Ok(streaming::serve_file_streaming(raw, &recording.file_name, range_header.as_deref())
        .await?)
}

/// Look up a recording and enforce ownership.
///
/// Another user's recording is reported as not-found rather than
/// forbidden so IDs cannot be probed.
fn lookup_owned(
    ctx: &AppContext,
    user_id: UserId,
    id: &str,
) -> Result<Recording, cv_core::Error> {
    let rec_id: RecordingId = id
        .parse()
        .map_err(|_| cv_core::Error::Validation("Invalid recording id".into()))?;

    let conn = cv_db::pool::get_conn(&ctx.db)?;
    let recording = cv_db::queries::recordings::get_recording(&conn, rec_id)?
        .filter(|r| r.user_id == user_id)
        .ok_or_else(|| cv_core::Error::not_found("recording", rec_id))?;

    Ok(recording)
}
