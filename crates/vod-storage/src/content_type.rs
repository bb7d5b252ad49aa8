//! Content-type inference for uploaded artifacts.

use std::path::Path;

/// Infer the content type for an artifact path by extension.
pub fn content_type_for(path: impl AsRef<Path>) -> &'static str {
    match path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("mp4") => "video/mp4",
        Some("srt") => "text/plain; charset=utf-8",
        Some("vtt") => "text/vtt",
        Some("wav") => "audio/wav",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_and_segment_types() {
        assert_eq!(content_type_for("a/master.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(content_type_for("a/540p/seg_0001.ts"), "video/mp2t");
        assert_eq!(content_type_for("a/2/es.srt"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_unknown_falls_back_to_octet_stream() {
        assert_eq!(content_type_for("noextension"), "application/octet-stream");
        assert_eq!(content_type_for("weird.xyz"), "application/octet-stream");
    }
}
