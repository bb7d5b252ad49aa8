//! Quality-ladder catalog and rung selection.

use serde::Serialize;

/// One fixed target resolution/bitrate combination in the adaptive ladder.
///
/// The catalog is fixed at compile time and never persisted, so the type
/// is serialize-only (for event payloads and logs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityRung {
    /// Rung name, used as the artifact subdirectory ("540p")
    pub name: &'static str,
    /// Target width in pixels
    pub target_width: u32,
    /// Target height in pixels
    pub target_height: u32,
    /// Video bitrate in kbit/s
    pub video_bitrate_kbps: u32,
    /// Audio bitrate in kbit/s
    pub audio_bitrate_kbps: u32,
    /// Bandwidth estimate advertised in the master playlist, in bit/s
    pub bandwidth_bps: u64,
}

/// The fixed, ordered rung catalog (ascending bitrate).
pub const QUALITY_LADDER: &[QualityRung] = &[
    QualityRung {
        name: "540p",
        target_width: 960,
        target_height: 540,
        video_bitrate_kbps: 1400,
        audio_bitrate_kbps: 96,
        bandwidth_bps: 1_600_000,
    },
    QualityRung {
        name: "720p",
        target_width: 1280,
        target_height: 720,
        video_bitrate_kbps: 2800,
        audio_bitrate_kbps: 128,
        bandwidth_bps: 3_200_000,
    },
    QualityRung {
        name: "1080p",
        target_width: 1920,
        target_height: 1080,
        video_bitrate_kbps: 5000,
        audio_bitrate_kbps: 160,
        bandwidth_bps: 5_800_000,
    },
];

/// Select the rungs to encode for a source of the given height.
///
/// Every catalog rung whose target height fits within the source is
/// included. A source smaller than the smallest rung still gets that rung,
/// so the result is never empty and a playable output always exists.
pub fn select_rungs(source_height: u32) -> Vec<&'static QualityRung> {
    let selected: Vec<&QualityRung> = QUALITY_LADDER
        .iter()
        .filter(|r| r.target_height <= source_height)
        .collect();

    if selected.is_empty() {
        vec![&QUALITY_LADDER[0]]
    } else {
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_ladder_for_1080p_source() {
        let rungs = select_rungs(1080);
        let names: Vec<_> = rungs.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["540p", "720p", "1080p"]);
    }

    #[test]
    fn test_partial_ladder_for_720p_source() {
        let rungs = select_rungs(720);
        let names: Vec<_> = rungs.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["540p", "720p"]);
    }

    #[test]
    fn test_tiny_source_forces_smallest_rung() {
        // 640x360 source: below every rung, smallest is force-included
        let rungs = select_rungs(360);
        assert_eq!(rungs.len(), 1);
        assert_eq!(rungs[0].name, "540p");
    }

    #[test]
    fn test_ladder_never_empty_and_rungs_fit() {
        for h in [1u32, 144, 360, 480, 540, 719, 720, 1080, 2160, 4320] {
            let rungs = select_rungs(h);
            assert!(!rungs.is_empty(), "height {} produced empty ladder", h);
            if h >= QUALITY_LADDER[0].target_height {
                for r in &rungs {
                    assert!(r.target_height <= h);
                }
            }
        }
    }

    #[test]
    fn test_catalog_is_ordered_ascending() {
        for pair in QUALITY_LADDER.windows(2) {
            assert!(pair[0].bandwidth_bps < pair[1].bandwidth_bps);
            assert!(pair[0].target_height < pair[1].target_height);
        }
    }
}
