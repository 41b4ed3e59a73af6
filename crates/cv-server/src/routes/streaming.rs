//! File-serving helpers: range parsing, content-type guessing, and chunked
//! artifact serving via `ReaderStream`.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Parse a `Range: bytes=START-END` header value.
///
/// Returns `(start, Option<end>)` where `end` is `None` for open-ended
/// ranges like `bytes=500-`.
pub fn parse_range_header(value: &str) -> Option<(u64, Option<u64>)> {
    let bytes_prefix = value.strip_prefix("bytes=")?;
    let mut parts = bytes_prefix.splitn(2, '-');
    let start_str = parts.next()?.trim();
    let end_str = parts.next()?.trim();

    let start: u64 = start_str.parse().ok()?;
    let end: Option<u64> = if end_str.is_empty() {
        None
    } else {
        Some(end_str.parse().ok()?)
    };

    Some((start, end))
}

/// Guess the MIME type from a file extension.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or("");

    match ext {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Serve a file using chunked streaming via `ReaderStream`.
///
/// Reads are done in 64KB chunks so memory stays bounded regardless of
/// artifact size. Supports Range requests.
pub async fn serve_file_streaming(
    file_path: &std::path::Path,
    file_name: &str,
    range_header: Option<&str>,
) -> Result<Response, cv_core::Error> {
    let metadata = tokio::fs::metadata(file_path)
        .await
        .map_err(|_| cv_core::Error::not_found("artifact", file_path.display()))?;

    let file_size = metadata.len();
    let content_type = guess_content_type(file_name);

    let range = range_header.and_then(parse_range_header);

    match range {
        Some((start, end_opt)) => {
            let end = end_opt.unwrap_or(file_size - 1).min(file_size - 1);
            if start > end || start >= file_size {
                return Ok((
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(
                        header::CONTENT_RANGE.as_str(),
                        format!("bytes */{file_size}"),
                    )],
                    Body::empty(),
                )
                    .into_response());
            }

            let length = end - start + 1;

            let mut file = tokio::fs::File::open(file_path)
                .await
                .map_err(|_| cv_core::Error::not_found("artifact", file_path.display()))?;
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|e| cv_core::Error::Internal(format!("Seek failed: {e}")))?;

            // Wrap in a Take to limit reads to exactly `length` bytes.
            let limited = file.take(length);
            let stream = ReaderStream::with_capacity(limited, 64 * 1024);
            let body = Body::from_stream(stream);

            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE.as_str(), content_type.to_string()),
                    (
                        header::CONTENT_RANGE.as_str(),
                        format!("bytes {start}-{end}/{file_size}"),
                    ),
                    (header::CONTENT_LENGTH.as_str(), length.to_string()),
                    (header::ACCEPT_RANGES.as_str(), "bytes".to_string()),
                ],
                body,
            )
                .into_response())
        }
        None => {
            let file = tokio::fs::File::open(file_path)
                .await
                .map_err(|_| cv_core::Error::not_found("artifact", file_path.display()))?;

            let stream = ReaderStream::with_capacity(file, 64 * 1024);
            let body = Body::from_stream(stream);

            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE.as_str(), content_type.to_string()),
                    (header::CONTENT_LENGTH.as_str(), file_size.to_string()),
                    (header::ACCEPT_RANGES.as_str(), "bytes".to_string()),
                ],
                body,
            )
                .into_response())
        }
    }
}
