//! Three-band compressor over Linkwitz-Riley crossovers

use super::biquad::{Biquad, Coefficients};
use super::dynamics::Compressor;
use crate::chain::stage::{CompressorParams, MultibandCompressorParams, TransferCurve};
use crate::types::AudioBuffer;
use std::f32::consts::FRAC_1_SQRT_2;

/// Linkwitz-Riley 4th order section (two cascaded Butterworth biquads)
/// whose low and high outputs sum to a flat magnitude at the crossover
#[derive(Debug, Clone)]
pub struct Lr4 {
    first: Biquad,
    second: Biquad,
}

impl Lr4 {
    pub fn low_pass(cutoff_hz: f32, sample_rate: u32) -> Self {
        let c = Coefficients::low_pass(cutoff_hz, FRAC_1_SQRT_2, sample_rate);
        Self {
            first: Biquad::new(c),
            second: Biquad::new(c),
        }
    }

    pub fn high_pass(cutoff_hz: f32, sample_rate: u32) -> Self {
        let c = Coefficients::high_pass(cutoff_hz, FRAC_1_SQRT_2, sample_rate);
        Self {
            first: Biquad::new(c),
            second: Biquad::new(c),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.second.process(self.first.process(input))
    }
}

/// Split one channel into low, mid and high bands
pub fn split_bands(samples: &[f32], low_hz: f32, high_hz: f32, sample_rate: u32) -> [Vec<f32>; 3] {
    let mut low_lp = Lr4::low_pass(low_hz, sample_rate);
    let mut low_hp = Lr4::high_pass(low_hz, sample_rate);
    let mut high_lp = Lr4::low_pass(high_hz, sample_rate);
    let mut high_hp = Lr4::high_pass(high_hz, sample_rate);

    // The low band also runs through the high crossover's all-pass
    // (LP + HP at the same cutoff) so the three bands stay phase aligned.
    let mut low_ap_lp = Lr4::low_pass(high_hz, sample_rate);
    let mut low_ap_hp = Lr4::high_pass(high_hz, sample_rate);

    let mut low = Vec::with_capacity(samples.len());
    let mut mid = Vec::with_capacity(samples.len());
    let mut high = Vec::with_capacity(samples.len());

    for &x in samples {
        let lower = low_lp.process(x);
        low.push(low_ap_lp.process(lower) + low_ap_hp.process(lower));

        let upper = low_hp.process(x);
        mid.push(high_lp.process(upper));
        high.push(high_hp.process(upper));
    }

    [low, mid, high]
}

/// Apply the multiband stage to a buffer
pub fn process(buffer: &mut AudioBuffer, params: &MultibandCompressorParams) {
    let sample_rate = buffer.sample_rate;
    let split: Vec<[Vec<f32>; 3]> = buffer
        .channels
        .iter()
        .map(|c| {
            split_bands(
                c,
                params.crossover_low_hz,
                params.crossover_high_hz,
                sample_rate,
            )
        })
        .collect();

    // Regroup as band -> channels so each band is compressed stereo-linked
    let mut bands: [Vec<Vec<f32>>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for [low, mid, high] in split {
        bands[0].push(low);
        bands[1].push(mid);
        bands[2].push(high);
    }

    for (band, setting) in bands.iter_mut().zip(params.bands.iter()) {
        let compressor = CompressorParams {
            curve: TransferCurve::Knee {
                threshold_db: setting.threshold_db,
                ratio: setting.ratio,
                knee_db: params.knee_db,
            },
            attack_ms: params.attack_ms,
            release_ms: params.release_ms,
            makeup_db: 0.0,
        };
        Compressor::new(&compressor, sample_rate).process_channels(band);
    }

    for (ch, channel) in buffer.channels.iter_mut().enumerate() {
        for (i, sample) in channel.iter_mut().enumerate() {
            *sample = params.band_weights[0] * bands[0][ch][i]
                + params.band_weights[1] * bands[1][ch][i]
                + params.band_weights[2] * bands[2][ch][i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::stage::BandCompressorParams;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn bands_land_where_expected() {
        let signal = sine(60.0, 48000);
        let [low, mid, high] = split_bands(&signal, 200.0, 5000.0, 48000);
        let tail = 24000..48000;
        assert!(rms(&low[tail.clone()]) > 10.0 * rms(&mid[tail.clone()]));
        assert!(rms(&low[tail.clone()]) > 100.0 * rms(&high[tail]));
    }

    #[test]
    fn uncompressed_bands_sum_to_input_level() {
        let mut buffer = AudioBuffer::new(vec![sine(1000.0, 48000)], 48000);
        let before = rms(&buffer.channels[0][24000..]);
        let params = MultibandCompressorParams {
            crossover_low_hz: 200.0,
            crossover_high_hz: 5000.0,
            bands: [BandCompressorParams {
                threshold_db: 0.0,
                ratio: 1.0,
            }; 3],
            knee_db: 6.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            band_weights: [1.0, 1.0, 1.0],
        };
        process(&mut buffer, &params);
        let after = rms(&buffer.channels[0][24000..]);
        assert!((after / before - 1.0).abs() < 0.05, "{before} -> {after}");
    }
}
