//! Profile + parameters -> ordered stage list

use super::params::StageParams;
use super::profile::MasteringProfile;
use super::stage::*;
use super::SignalChain;
use crate::dsp::common::db_to_lin;
use crate::error::{MasterError, Result};
use std::f32::consts::FRAC_1_SQRT_2;
use tracing::debug;

/// Sub-audible rumble cut
const HIGH_PASS_HZ: f32 = 20.0;
/// Ultrasonic cut
const LOW_PASS_HZ: f32 = 20000.0;
/// Band-limit and EQ frequencies are kept under this share of the sample rate
const MAX_FREQUENCY_RATIO: f32 = 0.45;

const DENOISE: DenoiseParams = DenoiseParams {
    reduction_db: 10.0,
    noise_floor_db: -25.0,
};

/// Fixed +5 dB shelf around 100 Hz
const BASS_BOOST: BandEqParams = BandEqParams {
    shape: EqShape::LowShelf,
    frequency_hz: 100.0,
    width: BandWidth::Q(FRAC_1_SQRT_2),
    gain_db: 5.0,
};

const MULTIBAND_KNEE_DB: f32 = 6.0;
const MULTIBAND_ATTACK_MS: f32 = 10.0;
const MULTIBAND_RELEASE_MS: f32 = 100.0;

/// Vocal level-riding curve, applied ahead of the vocal compressor
const VOCAL_COMPAND_CURVE: &[CurvePoint] = &[
    CurvePoint::new(-80.0, -80.0),
    CurvePoint::new(-45.0, -25.0),
    CurvePoint::new(-20.0, -12.0),
    CurvePoint::new(-10.0, -8.0),
    CurvePoint::new(-5.0, -5.0),
    CurvePoint::new(0.0, -4.0),
];

/// Build the signal chain for one profile and parameter set
///
/// Pure and deterministic. Parameters are validated first, so an invalid set
/// is rejected for every profile, including knobs whose stage is disabled.
pub fn build_chain(profile: MasteringProfile, params: &StageParams) -> Result<SignalChain> {
    params.validate()?;

    let template = profile.template();
    let max_frequency = params.sample_rate as f32 * MAX_FREQUENCY_RATIO;
    let mut stages = Vec::with_capacity(24);

    // Format and band limiting come first so later stages see a known rate
    stages.push(StageDescriptor::Resample(ResampleParams {
        sample_rate: params.sample_rate,
        channels: 2,
    }));
    stages.push(StageDescriptor::HighPass(FilterParams {
        cutoff_hz: HIGH_PASS_HZ,
        q: FRAC_1_SQRT_2,
    }));
    stages.push(StageDescriptor::LowPass(FilterParams {
        cutoff_hz: LOW_PASS_HZ.min(max_frequency),
        q: FRAC_1_SQRT_2,
    }));
    stages.push(StageDescriptor::DenoiseFft(DENOISE));

    push_eq(&mut stages, template.eq, max_frequency);

    stages.push(StageDescriptor::DynamicsCompressor(
        template.compressor.to_params(),
    ));

    let mut stereo = template.stereo;
    if let Some(width) = params.stereo_width {
        stereo.side_level = width;
    }
    stages.push(StageDescriptor::StereoTools(stereo));

    if params.multiband.enabled || template.forces_multiband {
        stages.push(StageDescriptor::MultibandCompressor(multiband(params)?));
    }

    if params.reverb.enabled {
        stages.push(StageDescriptor::Echo(reverb(params)));
    }

    if params.bass_boost_enabled {
        stages.push(StageDescriptor::BandEq(BASS_BOOST));
    }

    if params.wet_dry_mix.enabled {
        stages.push(StageDescriptor::WetDryMixer(WetDryParams {
            dry_weight: 1.0 - params.wet_dry_mix.wet_ratio,
            wet_weight: params.wet_dry_mix.wet_ratio,
            wet: EchoParams {
                in_gain: 0.8,
                out_gain: 0.88,
                taps: vec![EchoTap {
                    delay_ms: 60.0,
                    decay: 0.4,
                }],
            },
        }));
    }

    if params.vocal_mode {
        push_vocal(&mut stages, max_frequency);
    }

    // Manual and legacy output trims move the loudness target; the limiter
    // then holds peaks under both its own ceiling and the true-peak bound
    let mut loudness = template.loudness;
    loudness.target_lufs += template.output_trim_db + params.volume_adjust_db;
    let mut limiter = template.limiter;
    limiter.ceiling = limiter.ceiling.min(db_to_lin(loudness.true_peak_db));
    stages.push(StageDescriptor::LoudnessNormalize(loudness));
    stages.push(StageDescriptor::Limiter(limiter));

    debug!(
        "Built {} chain with {} stages (vocal: {})",
        profile,
        stages.len(),
        params.vocal_mode
    );

    Ok(SignalChain::new(profile, stages))
}

fn push_eq(stages: &mut Vec<StageDescriptor>, bands: &[BandEqParams], max_frequency: f32) {
    stages.extend(
        bands
            .iter()
            .filter(|band| band.frequency_hz < max_frequency)
            .map(|band| StageDescriptor::BandEq(*band)),
    );
}

/// Crossovers are only checked against Nyquist here, where the stage is
/// actually built
fn multiband(params: &StageParams) -> Result<MultibandCompressorParams> {
    let mb = &params.multiband;
    let nyquist = params.sample_rate as f32 / 2.0;
    if mb.crossover_high_hz >= nyquist {
        return Err(MasterError::invalid(format!(
            "high crossover ({} Hz) must be below Nyquist ({} Hz) at {} Hz",
            mb.crossover_high_hz, nyquist, params.sample_rate
        )));
    }
    Ok(MultibandCompressorParams {
        crossover_low_hz: mb.crossover_low_hz,
        crossover_high_hz: mb.crossover_high_hz,
        bands: [
            BandCompressorParams {
                threshold_db: mb.low_threshold_db,
                ratio: mb.low_ratio,
            },
            BandCompressorParams {
                threshold_db: mb.mid_threshold_db,
                ratio: mb.mid_ratio,
            },
            BandCompressorParams {
                threshold_db: mb.high_threshold_db,
                ratio: mb.high_ratio,
            },
        ],
        knee_db: MULTIBAND_KNEE_DB,
        attack_ms: MULTIBAND_ATTACK_MS,
        release_ms: MULTIBAND_RELEASE_MS,
        band_weights: [1.0, 1.0, 1.0],
    })
}

/// Three geometrically spaced taps
fn reverb(params: &StageParams) -> EchoParams {
    let delay = params.reverb.delay_ms;
    let decay = params.reverb.decay;
    EchoParams {
        in_gain: 0.8,
        out_gain: 0.5,
        taps: vec![
            EchoTap {
                delay_ms: delay,
                decay,
            },
            EchoTap {
                delay_ms: delay * 1.5,
                decay: decay * 0.8,
            },
            EchoTap {
                delay_ms: delay * 2.0,
                decay: decay * 0.6,
            },
        ],
    }
}

fn push_vocal(stages: &mut Vec<StageDescriptor>, max_frequency: f32) {
    stages.push(StageDescriptor::HighPass(FilterParams {
        cutoff_hz: 80.0,
        q: FRAC_1_SQRT_2,
    }));
    stages.push(StageDescriptor::LowPass(FilterParams {
        cutoff_hz: 12000.0f32.min(max_frequency),
        q: FRAC_1_SQRT_2,
    }));

    let presence = [(200.0, -3.0), (1800.0, 2.0), (4000.0, 3.0), (8000.0, 1.5)];
    let bands: Vec<BandEqParams> = presence
        .iter()
        .map(|&(frequency_hz, gain_db)| BandEqParams {
            shape: EqShape::Peaking,
            frequency_hz,
            width: BandWidth::Octaves(1.0),
            gain_db,
        })
        .collect();
    push_eq(stages, &bands, max_frequency);

    stages.push(StageDescriptor::DynamicsCompressor(CompressorParams {
        curve: TransferCurve::Points(VOCAL_COMPAND_CURVE.to_vec()),
        attack_ms: 20.0,
        release_ms: 100.0,
        makeup_db: 2.0,
    }));
    stages.push(StageDescriptor::DynamicsCompressor(CompressorParams {
        curve: TransferCurve::Knee {
            threshold_db: -12.0,
            ratio: 3.0,
            knee_db: 5.0,
        },
        attack_ms: 10.0,
        release_ms: 100.0,
        makeup_db: 2.0,
    }));

    // 1.5x
    stages.push(StageDescriptor::GainTrim(GainParams {
        gain_db: 20.0 * 1.5f32.log10(),
    }));
}
