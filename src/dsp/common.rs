/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels, flooring silence at -200 dB.
#[inline]
pub fn lin_to_db(lin: f32) -> f32 {
    20.0 * lin.max(1e-10).log10()
}

/// One-pole smoothing coefficient for a time constant in milliseconds.
///
/// Returns `exp(-1 / (sample_rate * time_ms * 0.001))`.
#[inline]
pub fn calculate_coefficient(time_ms: f32, sample_rate: f32) -> f32 {
    if time_ms <= 0.0 {
        return 0.0;
    }
    (-1.0 / (sample_rate * 0.001 * time_ms)).exp()
}

/// Milliseconds to a whole number of frames
#[inline]
pub fn ms_to_frames(ms: f32, sample_rate: u32) -> usize {
    (ms.max(0.0) * 0.001 * sample_rate as f32).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_conversions_invert() {
        for db in [-60.0, -6.0, 0.0, 3.5] {
            assert!((lin_to_db(db_to_lin(db)) - db).abs() < 1e-4);
        }
        assert_eq!(lin_to_db(0.0), -200.0);
    }

    #[test]
    fn coefficient_is_bounded() {
        let c = calculate_coefficient(10.0, 48000.0);
        assert!(c > 0.99 && c < 1.0);
        assert_eq!(calculate_coefficient(0.0, 48000.0), 0.0);
    }
}
