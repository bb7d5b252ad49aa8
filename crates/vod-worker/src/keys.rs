//! Deterministic artifact key scheme.
//!
//! Other systems address these keys directly (players fetch the master
//! playlist, the CRUD layer links subtitle tracks), so the layout is a
//! contract: `{media_id}/{sequence_number}/...`. Determinism also makes
//! job retries idempotent: a re-run overwrites the same keys.

use vod_models::MediaId;

/// Prefix for all artifacts of one media unit.
pub fn asset_prefix(media_id: &MediaId, sequence_number: u32) -> String {
    format!("{}/{}", media_id, sequence_number)
}

/// Key of the top-level adaptive manifest.
pub fn master_key(media_id: &MediaId, sequence_number: u32) -> String {
    format!("{}/master.m3u8", asset_prefix(media_id, sequence_number))
}

/// Key prefix for one rung's playlist and segments.
pub fn rung_prefix(media_id: &MediaId, sequence_number: u32, rung_name: &str) -> String {
    format!("{}/{}", asset_prefix(media_id, sequence_number), rung_name)
}

/// Key of a subtitle track.
pub fn subtitle_key(media_id: &MediaId, sequence_number: u32, target_language: &str) -> String {
    format!(
        "{}/{}.srt",
        asset_prefix(media_id, sequence_number),
        target_language
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = MediaId::from_string("m-42");
        assert_eq!(master_key(&id, 3), "m-42/3/master.m3u8");
        assert_eq!(rung_prefix(&id, 3, "720p"), "m-42/3/720p");
        assert_eq!(subtitle_key(&id, 3, "es"), "m-42/3/es.srt");
    }

    #[test]
    fn test_keys_deterministic_across_runs() {
        // Same media unit, different job instances: identical keys, so a
        // retried job overwrites rather than duplicates.
        let id = MediaId::from_string("m-42");
        assert_eq!(master_key(&id, 1), master_key(&id, 1));
        assert_eq!(subtitle_key(&id, 1, "fr"), subtitle_key(&id, 1, "fr"));
    }
}
