//! Amplitude metering normalisation
//!
//! Capture devices report loudness in dBFS, roughly [-60, 0] for speech.
//! Waveforms want a [0, 1] height.

/// Level treated as silence
pub const METER_FLOOR_DB: f32 = -60.0;

/// Lowest level a capture device reports
pub const SILENCE_DB: f32 = -160.0;

/// Map a dBFS reading onto [0, 1].
///
/// `normalized = (raw + 60) / 60`, clamped. Non-finite readings are
/// unavailable and yield `None`.
pub fn normalize_level(raw_db: f32) -> Option<f32> {
    if !raw_db.is_finite() {
        return None;
    }
    let span = -METER_FLOOR_DB;
    Some(((raw_db - METER_FLOOR_DB) / span).clamp(0.0, 1.0))
}

/// Root-mean-square level of a PCM block in dBFS.
///
/// Returns `None` for an empty block. Digital silence reports
/// `SILENCE_DB` rather than negative infinity.
pub fn rms_dbfs(block: &[f32]) -> Option<f32> {
    if block.is_empty() {
        return None;
    }
    let mean_square = block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32;
    Some((20.0 * mean_square.sqrt().log10()).max(SILENCE_DB))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_maps_to_zero() {
        assert_eq!(normalize_level(-60.0), Some(0.0));
        assert_eq!(normalize_level(-120.0), Some(0.0));
    }

    #[test]
    fn full_scale_maps_to_one() {
        assert_eq!(normalize_level(0.0), Some(1.0));
        assert_eq!(normalize_level(6.0), Some(1.0));
    }

    #[test]
    fn midpoint() {
        assert_eq!(normalize_level(-30.0), Some(0.5));
    }

    #[test]
    fn non_finite_is_unavailable() {
        assert_eq!(normalize_level(f32::NAN), None);
        assert_eq!(normalize_level(f32::NEG_INFINITY), None);
    }

    #[test]
    fn rms_of_full_scale_square_is_zero_db() {
        let block = [1.0f32, -1.0, 1.0, -1.0];
        let db = rms_dbfs(&block).unwrap();
        assert!(db.abs() < 1e-4);
    }

    #[test]
    fn rms_of_silence_is_floor() {
        let db = rms_dbfs(&[0.0; 64]).unwrap();
        assert_eq!(db, SILENCE_DB);
        assert_eq!(normalize_level(db), Some(0.0));
        assert_eq!(rms_dbfs(&[]), None);
    }
}
