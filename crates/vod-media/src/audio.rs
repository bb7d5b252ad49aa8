//! Audio extraction for the subtitle pipeline.
//!
//! Extraction mirrors the encode ladder: standard, error-tolerant with
//! channel normalization, resampling-focused, and finally silent-track
//! synthesis so the pipeline never hard-fails purely on unreadable audio.

use std::path::{Path, PathBuf};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::runner::ProcessRunner;
use crate::strategy::{try_strategies, Strategy};

/// Transcriber sample rate in Hz.
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Minimum size for an extracted audio file to count as real output.
/// A WAV header alone is 44 bytes; anything under this is an empty or
/// truncated track.
pub const MIN_AUDIO_BYTES: u64 = 1024;

/// Context for an audio extraction attempt.
#[derive(Debug, Clone)]
pub struct AudioExtractContext {
    /// Source file in the scratch area
    pub input: PathBuf,
    /// Output WAV path
    pub output: PathBuf,
    /// Cap on extracted duration in seconds (bounds transcription cost)
    pub max_seconds: u32,
}

impl AudioExtractContext {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>, max_seconds: u32) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            max_seconds,
        }
    }
}

fn pcm_args(ctx: &AudioExtractContext, cmd: FfmpegCommand) -> FfmpegCommand {
    cmd.no_video()
        .output_args(["-ar", &AUDIO_SAMPLE_RATE.to_string()])
        .audio_codec("pcm_s16le")
        .duration(ctx.max_seconds as f64)
}

/// Standard extraction: downmix to mono at the transcriber sample rate.
fn standard(ctx: &AudioExtractContext) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(&ctx.input, &ctx.output).output_args(["-ac", "1"]);
    pcm_args(ctx, cmd)
}

/// Error-tolerant extraction with explicit channel-layout normalization.
fn aggressive(ctx: &AudioExtractContext) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(&ctx.input, &ctx.output)
        .input_args(["-err_detect", "ignore_err"])
        .input_args(["-fflags", "+discardcorrupt+genpts"])
        .audio_filter("pan=mono|c0=0.5*c0+0.5*c1");
    pcm_args(ctx, cmd)
}

/// Resampling-focused normalization for streams with broken timestamps
/// or odd native rates.
fn resample(ctx: &AudioExtractContext) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(&ctx.input, &ctx.output)
        .input_args(["-fflags", "+genpts"])
        .audio_filter(format!("aresample={}:async=1:first_pts=0", AUDIO_SAMPLE_RATE))
        .output_args(["-ac", "1"]);
    pcm_args(ctx, cmd)
}

/// Last resort: synthesize a silent track of the capped duration.
///
/// The transcriber will produce no speech from it, but the pipeline keeps
/// a well-formed input instead of dying on an unreadable stream.
fn silent(ctx: &AudioExtractContext) -> FfmpegCommand {
    let graph = format!("anullsrc=r={}:cl=mono", AUDIO_SAMPLE_RATE);
    let cmd = FfmpegCommand::new(graph, &ctx.output).input_args(["-f", "lavfi"]);
    pcm_args(ctx, cmd)
}

/// The ordered extraction ladder.
pub fn extract_strategies() -> Vec<Strategy<AudioExtractContext>> {
    vec![
        Strategy { name: "standard", build: standard },
        Strategy { name: "error_tolerant", build: aggressive },
        Strategy { name: "resample", build: resample },
        Strategy { name: "silent", build: silent },
    ]
}

/// Validate an extraction attempt by minimum file size.
pub fn verify_audio_output(path: &Path) -> MediaResult<()> {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if size < MIN_AUDIO_BYTES {
        return Err(MediaError::verification(format!(
            "extracted audio too small: {} bytes (minimum {})",
            size, MIN_AUDIO_BYTES
        )));
    }
    Ok(())
}

/// Extract a transcription-ready audio track, trying the ladder in order.
///
/// Returns the name of the strategy that produced the track.
pub async fn extract_audio(
    runner: &ProcessRunner,
    ctx: &AudioExtractContext,
) -> MediaResult<&'static str> {
    let strategies = extract_strategies();
    let output = ctx.output.clone();
    let reset_path = ctx.output.clone();

    try_strategies(
        runner,
        "audio_extract",
        &strategies,
        ctx,
        move || verify_audio_output(&output),
        move || {
            if reset_path.exists() {
                std::fs::remove_file(&reset_path)?;
            }
            Ok(())
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AudioExtractContext {
        AudioExtractContext::new("/scratch/source.mp4", "/scratch/audio.wav", 600)
    }

    #[test]
    fn test_standard_is_mono_16k_pcm() {
        let args = standard(&ctx()).build_args();
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"16000".to_string()));
        assert!(args.contains(&"pcm_s16le".to_string()));
        assert!(args.contains(&"-ac".to_string()));
    }

    #[test]
    fn test_duration_cap_applied_everywhere() {
        for strategy in extract_strategies() {
            let args = (strategy.build)(&ctx()).build_args();
            assert!(
                args.contains(&"600.000".to_string()),
                "{} missing duration cap",
                strategy.name
            );
        }
    }

    #[test]
    fn test_aggressive_normalizes_channels() {
        let args = aggressive(&ctx()).build_args();
        assert!(args.contains(&"-err_detect".to_string()));
        assert!(args.iter().any(|a| a.starts_with("pan=mono")));
    }

    #[test]
    fn test_silent_uses_lavfi_source() {
        let args = silent(&ctx()).build_args();
        assert!(args.contains(&"lavfi".to_string()));
        assert!(args.iter().any(|a| a.starts_with("anullsrc=")));
    }

    #[test]
    fn test_ladder_order_ends_with_silent() {
        let names: Vec<_> = extract_strategies().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["standard", "error_tolerant", "resample", "silent"]);
    }

    #[test]
    fn test_verify_rejects_small_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");

        std::fs::write(&path, [0u8; 44]).unwrap();
        assert!(verify_audio_output(&path).is_err());

        std::fs::write(&path, vec![0u8; MIN_AUDIO_BYTES as usize]).unwrap();
        assert!(verify_audio_output(&path).is_ok());
    }

    #[test]
    fn test_verify_rejects_missing_file() {
        assert!(verify_audio_output(Path::new("/nonexistent/audio.wav")).is_err());
    }
}
