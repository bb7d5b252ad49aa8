//! FFprobe media inspection.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{MediaError, MediaResult};
use crate::runner::ProcessRunner;

/// Probed media file information.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Duration in seconds
    pub duration: f64,
    /// Video codec name
    pub codec: String,
}

impl MediaInfo {
    /// Safe defaults used when probing fails.
    ///
    /// A best-effort pipeline prefers encoding against assumed 1080p over
    /// failing the whole job on a probe error.
    pub fn fallback() -> Self {
        Self {
            width: 1920,
            height: 1080,
            duration: 0.0,
            codec: String::new(),
        }
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a media file for resolution, duration and codec.
pub async fn probe_media(path: impl AsRef<Path>, timeout: Duration) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    crate::command::check_ffprobe()?;

    let args: Vec<String> = [
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(std::iter::once(path.to_string_lossy().to_string()))
    .collect();

    let output = ProcessRunner::new(timeout).run("ffprobe", &args).await?;
    let probe: FfprobeOutput = serde_json::from_str(&output.stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidMedia("No video stream found".to_string()))?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(MediaInfo {
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        duration,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}
