//! Typed stage descriptors
//!
//! A descriptor is pure data. The DSP interpreter in `crate::dsp` turns each
//! one into a processing pass over an `AudioBuffer`.

use serde::{Deserialize, Serialize};

/// One processing step in a signal chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageDescriptor {
    /// Normalise channel layout and sample rate
    Resample(ResampleParams),
    HighPass(FilterParams),
    LowPass(FilterParams),
    /// Spectral noise gate
    DenoiseFft(DenoiseParams),
    BandEq(BandEqParams),
    DynamicsCompressor(CompressorParams),
    MultibandCompressor(MultibandCompressorParams),
    /// Mid/side level and balance
    StereoTools(StereoToolsParams),
    LoudnessNormalize(LoudnessParams),
    Limiter(LimiterParams),
    GainTrim(GainParams),
    Echo(EchoParams),
    /// Blend the input with an echoed copy of itself
    WetDryMixer(WetDryParams),
}

impl StageDescriptor {
    /// Short stage name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            StageDescriptor::Resample(_) => "resample",
            StageDescriptor::HighPass(_) => "high_pass",
            StageDescriptor::LowPass(_) => "low_pass",
            StageDescriptor::DenoiseFft(_) => "denoise_fft",
            StageDescriptor::BandEq(_) => "band_eq",
            StageDescriptor::DynamicsCompressor(_) => "dynamics_compressor",
            StageDescriptor::MultibandCompressor(_) => "multiband_compressor",
            StageDescriptor::StereoTools(_) => "stereo_tools",
            StageDescriptor::LoudnessNormalize(_) => "loudness_normalize",
            StageDescriptor::Limiter(_) => "limiter",
            StageDescriptor::GainTrim(_) => "gain_trim",
            StageDescriptor::Echo(_) => "echo",
            StageDescriptor::WetDryMixer(_) => "wet_dry_mixer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleParams {
    pub sample_rate: u32,
    pub channels: usize,
}

/// Second-order high/low pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub cutoff_hz: f32,
    pub q: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DenoiseParams {
    /// Attenuation applied to bins under the floor
    pub reduction_db: f32,
    /// Estimated noise floor
    pub noise_floor_db: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqShape {
    Peaking,
    LowShelf,
    HighShelf,
}

/// Bandwidth of a peaking or shelving band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandWidth {
    Q(f32),
    Octaves(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandEqParams {
    pub shape: EqShape,
    pub frequency_hz: f32,
    pub width: BandWidth,
    pub gain_db: f32,
}

/// Static input/output level mapping of a compressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferCurve {
    /// Threshold and ratio with a quadratic soft knee
    Knee {
        threshold_db: f32,
        ratio: f32,
        knee_db: f32,
    },
    /// Piecewise-linear breakpoints, sorted by input level
    Points(Vec<CurvePoint>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub input_db: f32,
    pub output_db: f32,
}

impl CurvePoint {
    pub const fn new(input_db: f32, output_db: f32) -> Self {
        Self {
            input_db,
            output_db,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorParams {
    pub curve: TransferCurve,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub makeup_db: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandCompressorParams {
    pub threshold_db: f32,
    pub ratio: f32,
}

/// Three-way Linkwitz-Riley split, per-band compression, weighted sum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultibandCompressorParams {
    pub crossover_low_hz: f32,
    pub crossover_high_hz: f32,
    /// Low, mid, high
    pub bands: [BandCompressorParams; 3],
    pub knee_db: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub band_weights: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StereoToolsParams {
    pub mid_level: f32,
    pub side_level: f32,
    /// -1.0 (all side energy left) to 1.0 (all right)
    pub side_balance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessParams {
    /// Integrated loudness target in LUFS
    pub target_lufs: f32,
    /// True-peak ceiling in dBTP
    pub true_peak_db: f32,
    /// Loudness range bound in LU, reported against the measurement
    pub loudness_range_lu: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterParams {
    /// Linear sample ceiling applied before the output gain
    pub ceiling: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub input_gain: f32,
    /// Must not exceed 1.0
    pub output_gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainParams {
    pub gain_db: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EchoTap {
    pub delay_ms: f32,
    pub decay: f32,
}

/// Feed-forward multi-tap echo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoParams {
    pub in_gain: f32,
    pub out_gain: f32,
    pub taps: Vec<EchoTap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WetDryParams {
    pub dry_weight: f32,
    pub wet_weight: f32,
    /// Processing applied to the wet branch
    pub wet: EchoParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_serializes_with_stage_tag() {
        let stage = StageDescriptor::GainTrim(GainParams { gain_db: -1.5 });
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["stage"], "gain_trim");
        assert_eq!(json["gain_db"], -1.5);
    }

    #[test]
    fn test_names_are_unique() {
        let names = [
            StageDescriptor::HighPass(FilterParams { cutoff_hz: 20.0, q: 0.7 }).name(),
            StageDescriptor::LowPass(FilterParams { cutoff_hz: 20.0, q: 0.7 }).name(),
            StageDescriptor::GainTrim(GainParams { gain_db: 0.0 }).name(),
        ];
        assert_ne!(names[0], names[1]);
        assert_ne!(names[1], names[2]);
    }
}
