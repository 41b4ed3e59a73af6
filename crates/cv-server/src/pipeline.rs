//! Upload ingest and the background transcode pipeline.
//!
//! `ingest` persists the raw artifact and its recording row, then spawns a
//! detached transcode task. The task drives the recording state machine
//! (`raw` -> `transcoding` -> `ready` | `failed`); its outcome is never
//! surfaced to the ingest caller, only through the status field and logs.

use std::path::PathBuf;

use cv_core::{RecordingId, Result, UserId};
use cv_db::models::Recording;

use crate::context::AppContext;

/// Fallback extension when the client declares no usable filename.
/// Browser MediaRecorder uploads are WebM unless configured otherwise.
const DEFAULT_EXTENSION: &str = "webm";

/// Derive a safe file extension from the client's declared filename.
///
/// Only the extension of the declared name is honored; the artifact path
/// itself is keyed by the generated recording ID so concurrent uploads can
/// never collide on a shared name.
fn sanitize_extension(declared_name: Option<&str>) -> String {
    declared_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| {
            ext.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Persist an uploaded recording and queue its transcode.
///
/// Returns once the raw artifact and its row are durable; the transcode
/// runs on a detached task. An empty payload is rejected before anything
/// touches disk, so no partial artifact is ever created.
pub async fn ingest(
    ctx: &AppContext,
    user_id: UserId,
    data: Vec<u8>,
    declared_name: Option<&str>,
) -> Result<Recording> {
    if data.is_empty() {
        return Err(cv_core::Error::Validation("No video data received".into()));
    }

    let id = RecordingId::new();
    let ext = sanitize_extension(declared_name);
    let file_name = format!("{id}.{ext}");

    let uploads_dir = &ctx.config.server.uploads_dir;
    tokio::fs::create_dir_all(uploads_dir).await?;

    let raw_path = uploads_dir.join(&file_name);
    let size_bytes = data.len() as i64;
    tokio::fs::write(&raw_path, &data).await?;

    let recording = {
        let conn = cv_db::pool::get_conn(&ctx.db)?;
        cv_db::queries::recordings::create_recording(
            &conn,
            id,
            user_id,
            &file_name,
            &raw_path.to_string_lossy(),
            size_bytes,
        )?
    };

    tracing::info!(
        recording_id = %id,
        user_id = %user_id,
        size_bytes,
        "Raw artifact persisted"
    );

    if ctx.config.transcode.enabled {
        let ctx = ctx.clone();
        let output_path = uploads_dir.join(format!("{id}-final.mp4"));
        tokio::spawn(async move {
            run_transcode(ctx, id, raw_path, output_path).await;
        });
    }

    Ok(recording)
}

/// Drive one recording through the transcode state machine.
///
/// Failure marks the row `failed` and is logged; the raw artifact stays
/// servable either way.
async fn run_transcode(ctx: AppContext, id: RecordingId, input: PathBuf, output: PathBuf) {
    if let Err(e) = set_transcoding(&ctx, id) {
        tracing::error!(recording_id = %id, error = %e, "Failed to mark transcoding");
        return;
    }

    let result =
        cv_av::transcode_to_mp4(&ctx.tools, &input, &output, &ctx.config.transcode).await;

    let outcome = match result {
        Ok(()) => {
            let conn = match cv_db::pool::get_conn(&ctx.db) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(recording_id = %id, error = %e, "Failed to record transcode completion");
                    return;
                }
            };
            cv_db::queries::recordings::complete_transcode(
                &conn,
                id,
                &output.to_string_lossy(),
            )
            .map(|_| "ready")
        }
        Err(e) => {
            tracing::error!(recording_id = %id, error = %e, "Transcode failed");
            let conn = match cv_db::pool::get_conn(&ctx.db) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(recording_id = %id, error = %e, "Failed to record transcode failure");
                    return;
                }
            };
            cv_db::queries::recordings::fail_transcode(&conn, id, &e.to_string())
                .map(|_| "failed")
        }
    };

    match outcome {
        Ok(status) => {
            tracing::info!(recording_id = %id, status, "Transcode finished");
        }
        Err(e) => {
            tracing::error!(recording_id = %id, error = %e, "Failed to update recording status");
        }
    }
}

fn set_transcoding(ctx: &AppContext, id: RecordingId) -> Result<()> {
    let conn = cv_db::pool::get_conn(&ctx.db)?;
    cv_db::queries::recordings::mark_transcoding(&conn, id)?;
    Ok(())
}
