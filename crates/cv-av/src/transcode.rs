//! Post-upload normalization encode using ffmpeg.

use std::path::Path;
use std::time::Duration;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Transcode an uploaded recording to the normalized MP4 container.
///
/// Re-encodes video and audio with the configured codecs (H.264/AAC by
/// default) and writes an MP4 with `+faststart` so the moov atom sits at
/// the front for progressive playback.
///
/// The timeout comes from config; uploads are bounded in size so the
/// default of one hour is generous.
pub async fn transcode_to_mp4(
    tools: &ToolRegistry,
    input: &Path,
    output: &Path,
    config: &cv_core::config::TranscodeConfig,
) -> cv_core::Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    tracing::info!(
        "Transcode: {:?} -> {:?} (video={}, audio={})",
        input,
        output,
        config.video_codec,
        config.audio_codec,
    );

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.timeout(Duration::from_secs(config.timeout_secs));
    cmd.args(["-y", "-i"]);
    cmd.arg(input.to_string_lossy().as_ref());
    cmd.args(["-c:v", &config.video_codec]);
    cmd.args(["-c:a", &config.audio_codec]);
    cmd.args(["-movflags", "+faststart"]);
    cmd.arg(output.to_string_lossy().as_ref());

    cmd.execute().await?;

    // ffmpeg can exit zero without producing output in edge cases
    // (e.g. zero-stream input); treat that as a tool failure.
    if !output.exists() {
        return Err(cv_core::Error::tool(
            "ffmpeg",
            format!("no output produced at {}", output.display()),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::config::{ToolsConfig, TranscodeConfig};

    #[tokio::test]
    async fn missing_ffmpeg_is_tool_error() {
        let tools_cfg = ToolsConfig {
            ffmpeg_path: Some(std::path::PathBuf::from("/nonexistent/ffmpeg")),
            ffprobe_path: None,
        };
        let registry = ToolRegistry::discover(&tools_cfg);
        if registry.require("ffmpeg").is_ok() {
            // A real ffmpeg is on PATH; nothing to assert here.
            return;
        }

        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.webm");
        let output = tmp.path().join("out.mp4");
        std::fs::write(&input, b"not a video").unwrap();

        let err = transcode_to_mp4(&registry, &input, &output, &TranscodeConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, cv_core::Error::Tool { .. }));
        assert!(!output.exists());
    }
}
