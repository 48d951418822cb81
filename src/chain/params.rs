//! Numeric knobs supplied once per batch run

use crate::error::{MasterError, Result};
use crate::types::OutputFormat;
use serde::{Deserialize, Serialize};

/// Longest echo tap the interpreter supports
pub const MAX_ECHO_DELAY_MS: f32 = 2000.0;

/// Nyquist at the highest supported sample rate
const MAX_CROSSOVER_HZ: f32 = 96_000.0;

/// Per-run mastering parameters
///
/// Every field has a default, so partial JSON preset files deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageParams {
    /// Append the vocal-focused sub-chain
    pub vocal_mode: bool,
    /// Encoded output format
    pub output_format: OutputFormat,
    /// PCM bit depth for WAV and FLAC output (16 or 24)
    pub bit_depth: u16,
    /// Constant bitrate for MP3 output
    pub mp3_bitrate_kbps: u32,
    /// Sample rate every chain normalises to
    pub sample_rate: u32,
    /// Manual output level offset, folded into the loudness target
    pub volume_adjust_db: f32,
    pub reverb: ReverbParams,
    pub bass_boost_enabled: bool,
    pub wet_dry_mix: WetDryMixParams,
    /// Side-channel level multiplier (1.0 = unchanged, 0.0 = mono, 2.0 = widest).
    /// `None` keeps the profile's own stereo setting.
    pub stereo_width: Option<f32>,
    pub multiband: MultibandParams,
}

impl Default for StageParams {
    fn default() -> Self {
        Self {
            vocal_mode: false,
            output_format: OutputFormat::Wav,
            bit_depth: 24,
            mp3_bitrate_kbps: 320,
            sample_rate: 48000,
            volume_adjust_db: 0.0,
            reverb: ReverbParams::default(),
            bass_boost_enabled: false,
            wet_dry_mix: WetDryMixParams::default(),
            stereo_width: None,
            multiband: MultibandParams::default(),
        }
    }
}

/// Discrete-echo room approximation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParams {
    pub enabled: bool,
    /// First tap delay; later taps sit at 1.5x and 2x
    pub delay_ms: f32,
    /// First tap gain; later taps decay to 0.8x and 0.6x
    pub decay: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: 60.0,
            decay: 0.5,
        }
    }
}

/// Parallel "room" blend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WetDryMixParams {
    pub enabled: bool,
    /// Share of the wet branch in the output (dry gets the remainder)
    pub wet_ratio: f32,
}

impl Default for WetDryMixParams {
    fn default() -> Self {
        Self {
            enabled: false,
            wet_ratio: 0.3,
        }
    }
}

/// Three-band compression knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultibandParams {
    pub enabled: bool,
    pub low_threshold_db: f32,
    pub low_ratio: f32,
    pub mid_threshold_db: f32,
    pub mid_ratio: f32,
    pub high_threshold_db: f32,
    pub high_ratio: f32,
    pub crossover_low_hz: f32,
    pub crossover_high_hz: f32,
}

impl Default for MultibandParams {
    fn default() -> Self {
        Self {
            enabled: false,
            low_threshold_db: -12.0,
            low_ratio: 4.0,
            mid_threshold_db: -12.0,
            mid_ratio: 4.0,
            high_threshold_db: -12.0,
            high_ratio: 4.0,
            crossover_low_hz: 200.0,
            crossover_high_hz: 5000.0,
        }
    }
}

impl StageParams {
    /// Reject knobs outside their physically sane domain
    ///
    /// Every knob is checked whether or not its stage is enabled, so a
    /// parameter set is either valid for all profiles or for none.
    pub fn validate(&self) -> Result<()> {
        if !(8000..=192_000).contains(&self.sample_rate) {
            return Err(MasterError::invalid(format!(
                "sample rate {} Hz is outside 8000..=192000",
                self.sample_rate
            )));
        }
        if !matches!(self.bit_depth, 16 | 24) {
            return Err(MasterError::invalid(format!(
                "bit depth {} is not supported (use 16 or 24)",
                self.bit_depth
            )));
        }
        if !(32..=320).contains(&self.mp3_bitrate_kbps) {
            return Err(MasterError::invalid(format!(
                "MP3 bitrate {} kbps is outside 32..=320",
                self.mp3_bitrate_kbps
            )));
        }
        check_range("volume adjustment (dB)", self.volume_adjust_db, -60.0, 24.0)?;

        check_range("reverb delay (ms)", self.reverb.delay_ms, 1.0, MAX_ECHO_DELAY_MS / 2.0)?;
        check_range("reverb decay", self.reverb.decay, 0.0, 1.0)?;
        check_range("wet ratio", self.wet_dry_mix.wet_ratio, 0.0, 1.0)?;

        if let Some(width) = self.stereo_width {
            check_range("stereo width", width, 0.0, 2.0)?;
        }

        self.multiband.validate()
    }
}

impl MultibandParams {
    /// Nyquist at the run's sample rate is checked by the builder, and only
    /// when the multiband stage is part of the chain
    fn validate(&self) -> Result<()> {
        let bands = [
            ("low", self.low_threshold_db, self.low_ratio),
            ("mid", self.mid_threshold_db, self.mid_ratio),
            ("high", self.high_threshold_db, self.high_ratio),
        ];
        for (name, threshold, ratio) in bands {
            check_range(&format!("{name} band threshold (dB)"), threshold, -96.0, 0.0)?;
            check_range(&format!("{name} band ratio"), ratio, 1.0, 100.0)?;
        }

        check_range("low crossover (Hz)", self.crossover_low_hz, 1.0, MAX_CROSSOVER_HZ)?;
        check_range("high crossover (Hz)", self.crossover_high_hz, 1.0, MAX_CROSSOVER_HZ)?;
        if self.crossover_low_hz >= self.crossover_high_hz {
            return Err(MasterError::invalid(format!(
                "low crossover ({} Hz) must be below high crossover ({} Hz)",
                self.crossover_low_hz, self.crossover_high_hz
            )));
        }
        Ok(())
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(MasterError::invalid(format!(
            "{name} = {value} is outside {min}..={max}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(StageParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_ratio_below_one() {
        let mut params = StageParams::default();
        params.multiband.mid_ratio = 0.5;
        assert!(matches!(params.validate(), Err(MasterError::InvalidParameters(_))));
    }

    #[test]
    fn test_rejects_positive_threshold() {
        let mut params = StageParams::default();
        params.multiband.high_threshold_db = 3.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_crossover_inversion_even_when_disabled() {
        let mut params = StageParams::default();
        params.multiband.enabled = false;
        params.multiband.crossover_low_hz = 5000.0;
        params.multiband.crossover_high_hz = 200.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_low_sample_rate_with_disabled_multiband_is_valid() {
        let params = StageParams {
            sample_rate: 8000,
            ..StageParams::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_rejects_nan() {
        let mut params = StageParams::default();
        params.volume_adjust_db = f32::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: StageParams =
            serde_json::from_str(r#"{"vocal_mode": true, "reverb": {"enabled": true}}"#).unwrap();
        assert!(params.vocal_mode);
        assert!(params.reverb.enabled);
        assert_eq!(params.reverb.delay_ms, 60.0);
        assert_eq!(params.sample_rate, 48000);
    }
}
