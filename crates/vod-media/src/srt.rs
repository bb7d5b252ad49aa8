//! SRT timed-text parsing and serialization.

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};

/// One timed-text segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    /// 1-based cue index
    pub index: u32,
    /// Start time in milliseconds
    pub start_ms: u64,
    /// End time in milliseconds
    pub end_ms: u64,
    /// Cue text (may span multiple lines)
    pub text: String,
}

/// Parse SRT text into segments.
///
/// Tolerates \r\n line endings, BOM, and blank-line runs between cues.
/// Cues without a parseable timestamp line are skipped rather than
/// aborting the whole track.
pub fn parse_srt(content: &str) -> Vec<SubtitleSegment> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut segments = Vec::new();

    for block in content.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let mut lines = block.lines();

        let Some(index_line) = lines.next() else { continue };
        let Ok(index) = index_line.trim().parse::<u32>() else {
            continue;
        };

        let Some(timing_line) = lines.next() else { continue };
        let Some((start_ms, end_ms)) = parse_timing_line(timing_line) else {
            continue;
        };

        let text = lines.collect::<Vec<_>>().join("\n");
        if text.trim().is_empty() {
            continue;
        }

        segments.push(SubtitleSegment {
            index,
            start_ms,
            end_ms,
            text,
        });
    }

    segments
}

/// Serialize segments back to SRT.
pub fn to_srt(segments: &[SubtitleSegment]) -> String {
    let mut out = String::new();
    for seg in segments {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            seg.index,
            format_timestamp(seg.start_ms),
            format_timestamp(seg.end_ms),
            seg.text
        ));
    }
    out
}

/// Validate a freshly transcribed track.
///
/// Zero parseable segments means the transcriber produced garbage; a
/// single segment covering essentially the whole capped window is the
/// signature of a line-ending mis-parse collapsing the track into one
/// cue. Both are hard failures, never passed through.
pub fn validate_transcript(segments: &[SubtitleSegment], capped_seconds: u32) -> MediaResult<()> {
    if segments.is_empty() {
        return Err(MediaError::subtitle_parse(
            "transcription produced zero parseable segments",
        ));
    }

    if segments.len() == 1 {
        let span_ms = segments[0].end_ms.saturating_sub(segments[0].start_ms);
        let window_ms = u64::from(capped_seconds) * 1000;
        if window_ms > 0 && span_ms * 10 >= window_ms * 9 {
            return Err(MediaError::subtitle_parse(format!(
                "transcription collapsed into a single {}ms segment, likely a format mis-parse",
                span_ms
            )));
        }
    }

    Ok(())
}

/// Parse "HH:MM:SS,mmm --> HH:MM:SS,mmm".
fn parse_timing_line(line: &str) -> Option<(u64, u64)> {
    let (start, end) = line.split_once("-->")?;
    Some((parse_timestamp(start.trim())?, parse_timestamp(end.trim())?))
}

/// Parse "HH:MM:SS,mmm" (or the "." variant some tools emit) to ms.
fn parse_timestamp(s: &str) -> Option<u64> {
    let s = s.replace('.', ",");
    let (hms, millis) = s.split_once(',')?;
    let mut parts = hms.split(':');

    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    let millis: u64 = millis.trim().parse().ok()?;

    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Format milliseconds as "HH:MM:SS,mmm".
fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
