//! Feed-forward, stereo-linked compressor
//!
//! The detector takes the largest absolute sample across channels and follows
//! it with an envelope that rises at the attack rate and falls at the release
//! rate. The envelope level is mapped through the static transfer curve, so a
//! zero crossing never reads as silence.

use super::common::{calculate_coefficient, db_to_lin, lin_to_db};
use crate::chain::stage::{CompressorParams, CurvePoint, TransferCurve};

impl TransferCurve {
    /// Output level for an input level, both in dB
    pub fn output_db(&self, input_db: f32) -> f32 {
        match self {
            TransferCurve::Knee {
                threshold_db,
                ratio,
                knee_db,
            } => knee_output(input_db, *threshold_db, *ratio, *knee_db),
            TransferCurve::Points(points) => points_output(input_db, points),
        }
    }
}

fn knee_output(x: f32, threshold: f32, ratio: f32, knee: f32) -> f32 {
    let over = x - threshold;
    if knee > 0.0 && 2.0 * over.abs() <= knee {
        let t = over + knee / 2.0;
        x + (1.0 / ratio - 1.0) * t * t / (2.0 * knee)
    } else if over > 0.0 {
        threshold + over / ratio
    } else {
        x
    }
}

/// Piecewise-linear interpolation; outside the table the nearest point's
/// offset is held
fn points_output(x: f32, points: &[CurvePoint]) -> f32 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return x,
    };
    if x <= first.input_db {
        return x + (first.output_db - first.input_db);
    }
    if x >= last.input_db {
        return x + (last.output_db - last.input_db);
    }
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if x <= b.input_db {
            let span = b.input_db - a.input_db;
            if span <= 0.0 {
                return b.output_db;
            }
            let t = (x - a.input_db) / span;
            return a.output_db + t * (b.output_db - a.output_db);
        }
    }
    x
}

/// Gain computer with smoothing, shared by the broadband and multiband stages
#[derive(Debug, Clone)]
pub struct Compressor {
    curve: TransferCurve,
    attack_coeff: f32,
    release_coeff: f32,
    makeup: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(params: &CompressorParams, sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        Self {
            curve: params.curve.clone(),
            attack_coeff: calculate_coefficient(params.attack_ms, sr),
            release_coeff: calculate_coefficient(params.release_ms, sr),
            makeup: db_to_lin(params.makeup_db),
            envelope: 0.0,
        }
    }

    /// Linear gain for the next frame, given its detector level
    #[inline]
    pub fn next_gain(&mut self, level: f32) -> f32 {
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff.mul_add(self.envelope, (1.0 - coeff) * level);

        let level_db = lin_to_db(self.envelope);
        db_to_lin(self.curve.output_db(level_db) - level_db) * self.makeup
    }

    /// Compress all channels with one linked gain
    pub fn process_channels(&mut self, channels: &mut [Vec<f32>]) {
        let frames = channels.first().map_or(0, Vec::len);
        for i in 0..frames {
            let level = channels.iter().fold(0.0f32, |acc, c| acc.max(c[i].abs()));
            let gain = self.next_gain(level);
            for channel in channels.iter_mut() {
                channel[i] *= gain;
            }
        }
    }
}
