//! HLS rung encoding and master-playlist synthesis.
//!
//! Each quality rung is encoded with a progressive fallback ladder:
//! standard, error-tolerant, audio-reconstruction, and finally video-only.
//! The video-only pass is the correctness backstop and always runs last,
//! even for sources with intact audio.

use std::path::{Path, PathBuf};

use vod_models::QualityRung;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::runner::ProcessRunner;
use crate::strategy::{try_strategies, Strategy};

/// Fixed HLS segment duration in seconds.
pub const HLS_SEGMENT_SECONDS: u32 = 6;

/// Rung playlist file name.
pub const RUNG_PLAYLIST: &str = "index.m3u8";

/// Master playlist file name.
pub const MASTER_PLAYLIST: &str = "master.m3u8";

/// Everything a rung encode attempt needs.
#[derive(Debug, Clone)]
pub struct EncodeContext {
    /// Source file in the scratch area
    pub input: PathBuf,
    /// Output directory for this rung (playlist + segments)
    pub out_dir: PathBuf,
    /// Target rung
    pub rung: &'static QualityRung,
}

impl EncodeContext {
    pub fn new(input: impl AsRef<Path>, out_dir: impl AsRef<Path>, rung: &'static QualityRung) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            out_dir: out_dir.as_ref().to_path_buf(),
            rung,
        }
    }

    fn playlist_path(&self) -> PathBuf {
        self.out_dir.join(RUNG_PLAYLIST)
    }

    fn segment_pattern(&self) -> String {
        self.out_dir.join("seg_%04d.ts").to_string_lossy().to_string()
    }

    /// Scale to the target box, padding to preserve aspect ratio.
    fn scale_filter(&self) -> String {
        let (w, h) = (self.rung.target_width, self.rung.target_height);
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
        )
    }

    fn video_args(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        let v = self.rung.video_bitrate_kbps;
        cmd.video_codec("libx264")
            .output_args(["-preset", "veryfast"])
            .output_args(["-b:v", &format!("{}k", v)])
            .output_args(["-maxrate", &format!("{}k", v)])
            .output_args(["-bufsize", &format!("{}k", v * 2)])
    }

    fn audio_args(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        cmd.audio_codec("aac")
            .output_args(["-b:a", &format!("{}k", self.rung.audio_bitrate_kbps)])
            .output_args(["-ac", "2"])
            .output_args(["-ar", "48000"])
    }

    fn hls_args(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        cmd.output_args(["-f", "hls"])
            .output_args(["-hls_time", &HLS_SEGMENT_SECONDS.to_string()])
            .output_args(["-hls_playlist_type", "vod"])
            .output_args(["-hls_segment_filename", &self.segment_pattern()])
    }
}

/// Standard encode: scale/pad, re-encode video, normalized stereo audio.
///
/// Video is always re-encoded; there is no stream-copy fast path even for
/// already-compatible sources (disabled for stability against malformed
/// containers).
fn standard(ctx: &EncodeContext) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(&ctx.input, ctx.playlist_path()).video_filter(ctx.scale_filter());
    let cmd = ctx.video_args(cmd);
    let cmd = ctx.audio_args(cmd);
    ctx.hls_args(cmd)
}

/// Error-tolerant encode: decoder told to swallow corrupt packets and
/// regenerate timestamps. Recovers many "valid video, glitchy audio"
/// sources.
fn aggressive(ctx: &EncodeContext) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(&ctx.input, ctx.playlist_path())
        .input_args(["-err_detect", "ignore_err"])
        .input_args(["-fflags", "+discardcorrupt+genpts"])
        .input_args(["-max_error_rate", "1.0"])
        .video_filter(ctx.scale_filter());
    let cmd = ctx.video_args(cmd);
    let cmd = ctx.audio_args(cmd);
    ctx.hls_args(cmd)
}

/// Audio-reconstruction encode: map video and audio as separate streams
/// and renormalize audio timestamps. Recovers sources whose muxed A/V
/// timestamps have diverged.
fn remap_audio(ctx: &EncodeContext) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(&ctx.input, ctx.playlist_path())
        .input_args(["-fflags", "+genpts"])
        .output_args(["-map", "0:v:0"])
        .output_args(["-map", "0:a:0?"])
        .video_filter(ctx.scale_filter())
        .audio_filter("aresample=async=1:first_pts=0");
    let cmd = ctx.video_args(cmd);
    let cmd = ctx.audio_args(cmd);
    ctx.hls_args(cmd)
}

/// Video-only encode: drop audio entirely. Guaranteed-success backstop;
/// must be last and must always be present in the ladder.
fn video_only(ctx: &EncodeContext) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(&ctx.input, ctx.playlist_path())
        .input_args(["-err_detect", "ignore_err"])
        .input_args(["-fflags", "+discardcorrupt+genpts"])
        .video_filter(ctx.scale_filter())
        .no_audio();
    let cmd = ctx.video_args(cmd);
    ctx.hls_args(cmd)
}

/// The ordered encode ladder.
pub fn encode_strategies() -> Vec<Strategy<EncodeContext>> {
    vec![
        Strategy { name: "standard", build: standard },
        Strategy { name: "error_tolerant", build: aggressive },
        Strategy { name: "audio_reconstruction", build: remap_audio },
        Strategy { name: "video_only", build: video_only },
    ]
}

/// Verify a rung encode produced a playable output.
///
/// The playlist must exist and the directory must hold at least two files
/// (playlist plus one segment); an attempt producing fewer is a failure
/// even when the encoder exited zero.
pub fn verify_rung_output(out_dir: &Path) -> MediaResult<()> {
    let playlist = out_dir.join(RUNG_PLAYLIST);
    if !playlist.is_file() {
        return Err(MediaError::verification(format!(
            "playlist missing: {}",
            playlist.display()
        )));
    }

    let files = std::fs::read_dir(out_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .count();

    if files < 2 {
        return Err(MediaError::verification(format!(
            "expected playlist plus at least one segment in {}, found {} files",
            out_dir.display(),
            files
        )));
    }

    Ok(())
}

/// Remove and recreate a rung output directory between attempts.
pub fn reset_rung_dir(out_dir: &Path) -> MediaResult<()> {
    if out_dir.exists() {
        std::fs::remove_dir_all(out_dir)?;
    }
    std::fs::create_dir_all(out_dir)?;
    Ok(())
}

/// Encode one rung, trying the fallback ladder in order.
///
/// Returns the name of the strategy that produced the output.
pub async fn encode_rung(runner: &ProcessRunner, ctx: &EncodeContext) -> MediaResult<&'static str> {
    let strategies = encode_strategies();
    let out_dir = ctx.out_dir.clone();
    let validate_dir = out_dir.clone();

    try_strategies(
        runner,
        ctx.rung.name,
        &strategies,
        ctx,
        move || verify_rung_output(&validate_dir),
        move || reset_rung_dir(&out_dir),
    )
    .await
}

/// Synthesize the master playlist for the encoded rungs.
///
/// Entries are ordered by ascending bandwidth; player-side adaptive
/// selection starts from the first variant.
pub fn write_master_playlist(rungs: &[&'static QualityRung]) -> String {
    let mut sorted: Vec<&QualityRung> = rungs.to_vec();
    sorted.sort_by_key(|r| r.bandwidth_bps);

    let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for rung in sorted {
        playlist.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}/{}\n",
            rung.bandwidth_bps, rung.target_width, rung.target_height, rung.name, RUNG_PLAYLIST
        ));
    }
    playlist
}

#[cfg(test)]
mod tests {
    use super::*;
    use vod_models::QUALITY_LADDER;

    fn ctx() -> EncodeContext {
        EncodeContext::new("/scratch/source.mp4", "/scratch/out/540p", &QUALITY_LADDER[0])
    }

    #[test]
    fn test_standard_has_audio_and_hls_packaging() {
        let args = standard(&ctx()).build_args();
        assert!(args.contains(&"-c:a".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"hls".to_string()));
        assert!(args.contains(&"-hls_playlist_type".to_string()));
        assert!(!args.contains(&"-an".to_string()));
    }

    #[test]
    fn test_aggressive_carries_error_tolerance_flags() {
        let args = aggressive(&ctx()).build_args();
        assert!(args.contains(&"-err_detect".to_string()));
        assert!(args.contains(&"ignore_err".to_string()));
        assert!(args.contains(&"+discardcorrupt+genpts".to_string()));
        assert!(args.contains(&"-max_error_rate".to_string()));
    }

    #[test]
    fn test_remap_maps_streams_and_renormalizes() {
        let args = remap_audio(&ctx()).build_args();
        assert!(args.contains(&"0:v:0".to_string()));
        assert!(args.contains(&"0:a:0?".to_string()));
        assert!(args.contains(&"aresample=async=1:first_pts=0".to_string()));
    }

    #[test]
    fn test_video_only_drops_audio() {
        let args = video_only(&ctx()).build_args();
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"-c:a".to_string()));
    }

    #[test]
    fn test_ladder_order_ends_with_video_only() {
        let names: Vec<_> = encode_strategies().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["standard", "error_tolerant", "audio_reconstruction", "video_only"]
        );
    }

    #[test]
    fn test_no_stream_copy_anywhere_in_ladder() {
        for strategy in encode_strategies() {
            let args = (strategy.build)(&ctx()).build_args();
            assert!(
                !args.contains(&"copy".to_string()),
                "{} must re-encode, not stream-copy",
                strategy.name
            );
        }
    }

    #[test]
    fn test_verify_rejects_playlist_without_segments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RUNG_PLAYLIST), "#EXTM3U\n").unwrap();
        assert!(verify_rung_output(dir.path()).is_err());

        std::fs::write(dir.path().join("seg_0000.ts"), [0u8; 16]).unwrap();
        assert!(verify_rung_output(dir.path()).is_ok());
    }

    #[test]
    fn test_verify_rejects_missing_playlist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seg_0000.ts"), [0u8; 16]).unwrap();
        assert!(verify_rung_output(dir.path()).is_err());
    }

    #[test]
    fn test_master_playlist_ascending_bandwidth() {
        // Pass rungs out of order; output must sort ascending
        let rungs: Vec<&'static QualityRung> =
            vec![&QUALITY_LADDER[2], &QUALITY_LADDER[0], &QUALITY_LADDER[1]];
        let playlist = write_master_playlist(&rungs);

        let pos_540 = playlist.find("540p/index.m3u8").unwrap();
        let pos_720 = playlist.find("720p/index.m3u8").unwrap();
        let pos_1080 = playlist.find("1080p/index.m3u8").unwrap();
        assert!(pos_540 < pos_720 && pos_720 < pos_1080);

        assert!(playlist.starts_with("#EXTM3U\n"));
        assert!(playlist.contains("BANDWIDTH=1600000,RESOLUTION=960x540"));
    }

    #[test]
    fn test_master_playlist_single_rung() {
        let playlist = write_master_playlist(&[&QUALITY_LADDER[0]]);
        assert_eq!(playlist.matches("#EXT-X-STREAM-INF").count(), 1);
    }
}
