//! Mastering profiles as data records
//!
//! Each profile is a table of EQ bands plus compressor, stereo, loudness and
//! limiter settings. The builder reads these tables; there is no
//! profile-specific code path.

use super::stage::{
    BandEqParams, BandWidth, CompressorParams, CurvePoint, EqShape, LimiterParams,
    LoudnessParams, StereoToolsParams, TransferCurve,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Base stage template selector
#[derive(
    ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum MasteringProfile {
    #[default]
    Default,
    Synth,
    SynthVocals,
    BassBoost,
    Rock,
    Piano,
    /// Generic three-band multiband template
    Custom,
}

impl MasteringProfile {
    pub fn name(self) -> &'static str {
        match self {
            MasteringProfile::Default => "default",
            MasteringProfile::Synth => "synth",
            MasteringProfile::SynthVocals => "synth-vocals",
            MasteringProfile::BassBoost => "bass-boost",
            MasteringProfile::Rock => "rock",
            MasteringProfile::Piano => "piano",
            MasteringProfile::Custom => "custom",
        }
    }

    /// All profiles, in declaration order
    pub fn all() -> [MasteringProfile; 7] {
        [
            MasteringProfile::Default,
            MasteringProfile::Synth,
            MasteringProfile::SynthVocals,
            MasteringProfile::BassBoost,
            MasteringProfile::Rock,
            MasteringProfile::Piano,
            MasteringProfile::Custom,
        ]
    }

    /// The data record behind this profile
    pub fn template(self) -> &'static ProfileTemplate {
        match self {
            MasteringProfile::Default => &DEFAULT,
            MasteringProfile::Synth => &SYNTH,
            MasteringProfile::SynthVocals => &SYNTH_VOCALS,
            MasteringProfile::BassBoost => &BASS_BOOST,
            MasteringProfile::Rock => &ROCK,
            MasteringProfile::Piano => &PIANO,
            MasteringProfile::Custom => &CUSTOM,
        }
    }
}

impl std::fmt::Display for MasteringProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static transfer curve, stored without allocation
#[derive(Debug, Clone, Copy)]
pub enum CurveSpec {
    Knee {
        threshold_db: f32,
        ratio: f32,
        knee_db: f32,
    },
    Points(&'static [CurvePoint]),
}

#[derive(Debug, Clone, Copy)]
pub struct CompressorSpec {
    pub curve: CurveSpec,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub makeup_db: f32,
}

impl CompressorSpec {
    pub fn to_params(&self) -> CompressorParams {
        let curve = match self.curve {
            CurveSpec::Knee {
                threshold_db,
                ratio,
                knee_db,
            } => TransferCurve::Knee {
                threshold_db,
                ratio,
                knee_db,
            },
            CurveSpec::Points(points) => TransferCurve::Points(points.to_vec()),
        };
        CompressorParams {
            curve,
            attack_ms: self.attack_ms,
            release_ms: self.release_ms,
            makeup_db: self.makeup_db,
        }
    }
}

/// Everything a profile contributes to a chain
#[derive(Debug, Clone, Copy)]
pub struct ProfileTemplate {
    pub eq: &'static [BandEqParams],
    pub compressor: CompressorSpec,
    pub stereo: StereoToolsParams,
    pub loudness: LoudnessParams,
    pub limiter: LimiterParams,
    /// Level offset historically applied after the limiter, now folded into
    /// the loudness target
    pub output_trim_db: f32,
    /// Always include the multiband compressor
    pub forces_multiband: bool,
}

const fn peak(frequency_hz: f32, q: f32, gain_db: f32) -> BandEqParams {
    BandEqParams {
        shape: EqShape::Peaking,
        frequency_hz,
        width: BandWidth::Q(q),
        gain_db,
    }
}

const fn low_shelf(frequency_hz: f32, gain_db: f32) -> BandEqParams {
    BandEqParams {
        shape: EqShape::LowShelf,
        frequency_hz,
        width: BandWidth::Q(std::f32::consts::FRAC_1_SQRT_2),
        gain_db,
    }
}

const fn high_shelf(frequency_hz: f32, gain_db: f32) -> BandEqParams {
    BandEqParams {
        shape: EqShape::HighShelf,
        frequency_hz,
        width: BandWidth::Q(std::f32::consts::FRAC_1_SQRT_2),
        gain_db,
    }
}

const fn loudness(target_lufs: f32, loudness_range_lu: f32) -> LoudnessParams {
    LoudnessParams {
        target_lufs,
        true_peak_db: -1.0,
        loudness_range_lu,
    }
}

const fn limiter(release_ms: f32) -> LimiterParams {
    LimiterParams {
        ceiling: 0.95,
        attack_ms: 5.0,
        release_ms,
        input_gain: 1.0,
        output_gain: 1.0,
    }
}

const fn stereo(side_level: f32, side_balance: f32) -> StereoToolsParams {
    StereoToolsParams {
        mid_level: 1.0,
        side_level,
        side_balance,
    }
}

/// Default compand curve: gates the floor, lifts quiet passages and tops out
/// 1 dB under full scale
const DEFAULT_CURVE: &[CurvePoint] = &[
    CurvePoint::new(-80.0, -900.0),
    CurvePoint::new(-45.0, -15.0),
    CurvePoint::new(-27.0, -9.0),
    CurvePoint::new(-15.0, -5.0),
    CurvePoint::new(-5.0, -2.0),
    CurvePoint::new(0.0, -1.0),
    CurvePoint::new(20.0, 0.0),
];

/// Gentle upward/downward compand curve for the custom multiband template
const BROADBAND_CURVE: &[CurvePoint] = &[
    CurvePoint::new(-80.0, -80.0),
    CurvePoint::new(-60.0, -40.0),
    CurvePoint::new(-40.0, -20.0),
    CurvePoint::new(-20.0, -10.0),
    CurvePoint::new(-10.0, -5.0),
    CurvePoint::new(0.0, 0.0),
];

const BROADBAND_EQ: &[BandEqParams] = &[
    peak(60.0, 1.5, 1.0),
    peak(120.0, 1.0, -1.0),
    peak(1000.0, 1.5, -1.0),
    peak(4000.0, 1.0, 2.0),
    peak(6000.0, 1.0, 1.5),
    peak(8000.0, 1.0, 1.0),
    peak(12000.0, 1.5, 1.0),
];

static DEFAULT: ProfileTemplate = ProfileTemplate {
    eq: BROADBAND_EQ,
    compressor: CompressorSpec {
        curve: CurveSpec::Points(DEFAULT_CURVE),
        attack_ms: 0.0,
        release_ms: 800.0,
        makeup_db: 0.0,
    },
    stereo: stereo(1.2, 0.2),
    loudness: loudness(-14.0, 9.0),
    limiter: limiter(30.0),
    // 1.1x
    output_trim_db: 0.83,
    forces_multiband: false,
};

static SYNTH: ProfileTemplate = ProfileTemplate {
    eq: &[
        peak(60.0, 1.0, 1.5),
        peak(250.0, 1.0, -1.5),
        peak(800.0, 1.4, -1.0),
        peak(3000.0, 1.0, 1.5),
        high_shelf(10000.0, 2.5),
    ],
    compressor: CompressorSpec {
        curve: CurveSpec::Knee {
            threshold_db: -18.0,
            ratio: 3.0,
            knee_db: 6.0,
        },
        attack_ms: 10.0,
        release_ms: 120.0,
        makeup_db: 2.0,
    },
    stereo: stereo(1.3, 0.0),
    loudness: loudness(-12.0, 8.0),
    limiter: limiter(30.0),
    output_trim_db: 0.0,
    forces_multiband: false,
};

static SYNTH_VOCALS: ProfileTemplate = ProfileTemplate {
    eq: &[
        peak(60.0, 1.0, 1.0),
        peak(250.0, 1.0, -2.0),
        peak(2500.0, 1.0, 2.0),
        peak(5000.0, 1.2, 1.5),
        high_shelf(11000.0, 1.5),
    ],
    compressor: CompressorSpec {
        curve: CurveSpec::Knee {
            threshold_db: -16.0,
            ratio: 2.5,
            knee_db: 6.0,
        },
        attack_ms: 8.0,
        release_ms: 100.0,
        makeup_db: 1.5,
    },
    stereo: stereo(1.15, 0.0),
    loudness: loudness(-13.0, 8.0),
    limiter: limiter(40.0),
    output_trim_db: 0.0,
    forces_multiband: false,
};

static BASS_BOOST: ProfileTemplate = ProfileTemplate {
    eq: &[
        low_shelf(40.0, 2.0),
        peak(80.0, 1.0, 3.0),
        peak(300.0, 1.0, -2.0),
        peak(3000.0, 1.0, 1.0),
    ],
    compressor: CompressorSpec {
        curve: CurveSpec::Knee {
            threshold_db: -20.0,
            ratio: 3.5,
            knee_db: 6.0,
        },
        attack_ms: 15.0,
        release_ms: 150.0,
        makeup_db: 2.0,
    },
    stereo: stereo(1.0, 0.0),
    loudness: loudness(-12.0, 7.0),
    limiter: limiter(50.0),
    output_trim_db: 0.0,
    forces_multiband: false,
};

static ROCK: ProfileTemplate = ProfileTemplate {
    eq: &[
        peak(80.0, 1.0, 1.5),
        peak(400.0, 1.2, -2.0),
        peak(2500.0, 1.0, 2.0),
        peak(5000.0, 1.0, 1.5),
        high_shelf(12000.0, 1.0),
    ],
    compressor: CompressorSpec {
        curve: CurveSpec::Knee {
            threshold_db: -16.0,
            ratio: 4.0,
            knee_db: 4.0,
        },
        attack_ms: 5.0,
        release_ms: 80.0,
        makeup_db: 2.5,
    },
    stereo: stereo(1.1, 0.0),
    loudness: loudness(-11.0, 7.0),
    limiter: limiter(30.0),
    output_trim_db: 0.0,
    forces_multiband: false,
};

static PIANO: ProfileTemplate = ProfileTemplate {
    eq: &[
        low_shelf(40.0, -3.0),
        peak(100.0, 1.0, -1.0),
        peak(250.0, 0.8, 1.0),
        peak(3000.0, 1.0, 1.0),
        high_shelf(8000.0, 1.5),
    ],
    compressor: CompressorSpec {
        curve: CurveSpec::Knee {
            threshold_db: -24.0,
            ratio: 1.8,
            knee_db: 10.0,
        },
        attack_ms: 20.0,
        release_ms: 250.0,
        makeup_db: 1.0,
    },
    stereo: stereo(1.0, 0.0),
    loudness: loudness(-16.0, 12.0),
    limiter: limiter(80.0),
    output_trim_db: 0.0,
    forces_multiband: false,
};

static CUSTOM: ProfileTemplate = ProfileTemplate {
    eq: BROADBAND_EQ,
    compressor: CompressorSpec {
        curve: CurveSpec::Points(BROADBAND_CURVE),
        attack_ms: 5.0,
        release_ms: 100.0,
        makeup_db: 0.0,
    },
    stereo: stereo(1.0, 0.0),
    loudness: loudness(-14.0, 11.0),
    limiter: LimiterParams {
        ceiling: 0.95,
        attack_ms: 5.0,
        release_ms: 50.0,
        input_gain: 0.9,
        output_gain: 0.9,
    },
    // 0.9x
    output_trim_db: -0.92,
    forces_multiband: true,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_profile_has_a_template() {
        for profile in MasteringProfile::all() {
            let template = profile.template();
            assert!(!template.eq.is_empty(), "{profile} has no EQ bands");
            assert!(template.limiter.output_gain <= 1.0);
            assert!(template.loudness.true_peak_db <= 0.0);
        }
    }

    #[test]
    fn test_only_custom_forces_multiband() {
        for profile in MasteringProfile::all() {
            assert_eq!(
                profile.template().forces_multiband,
                profile == MasteringProfile::Custom
            );
        }
    }

    #[test]
    fn test_curve_points_are_sorted() {
        for curve in [DEFAULT_CURVE, BROADBAND_CURVE] {
            for pair in curve.windows(2) {
                assert!(pair[0].input_db < pair[1].input_db);
            }
        }
    }

    #[test]
    fn test_default_curve_gates_floor_and_lifts_quiet_levels() {
        let params = MasteringProfile::Default.template().compressor.to_params();
        assert_eq!(params.attack_ms, 0.0);
        assert!(params.curve.output_db(-80.0) <= -900.0);
        assert!((params.curve.output_db(-45.0) - -15.0).abs() < 1e-5);
        assert!((params.curve.output_db(0.0) - -1.0).abs() < 1e-5);
        assert!((params.curve.output_db(20.0) - 0.0).abs() < 1e-5);

        let custom = MasteringProfile::Custom.template().compressor.to_params();
        assert!((custom.curve.output_db(-80.0) - -80.0).abs() < 1e-5);
    }

    #[test]
    fn test_profile_names_match_cli_values() {
        for profile in MasteringProfile::all() {
            let parsed = MasteringProfile::from_str(profile.name(), false).unwrap();
            assert_eq!(parsed, profile);
        }
    }
}
