//! RBJ cookbook biquads
//!
//! Coefficients are computed in f64 and the filter state is kept in f64, so
//! low cutoffs at high sample rates stay stable.

use crate::chain::stage::{BandEqParams, BandWidth, EqShape};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    pub fn low_pass(cutoff_hz: f32, q: f32, sample_rate: u32) -> Self {
        let (cos_w, alpha) = omega(cutoff_hz, q, sample_rate);
        Self::normalize(
            (1.0 - cos_w) / 2.0,
            1.0 - cos_w,
            (1.0 - cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    pub fn high_pass(cutoff_hz: f32, q: f32, sample_rate: u32) -> Self {
        let (cos_w, alpha) = omega(cutoff_hz, q, sample_rate);
        Self::normalize(
            (1.0 + cos_w) / 2.0,
            -(1.0 + cos_w),
            (1.0 + cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    pub fn peaking(frequency_hz: f32, q: f32, gain_db: f32, sample_rate: u32) -> Self {
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let (cos_w, alpha) = omega(frequency_hz, q, sample_rate);
        Self::normalize(
            1.0 + alpha * a,
            -2.0 * cos_w,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w,
            1.0 - alpha / a,
        )
    }

    pub fn low_shelf(frequency_hz: f32, q: f32, gain_db: f32, sample_rate: u32) -> Self {
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let (cos_w, alpha) = omega(frequency_hz, q, sample_rate);
        let k = 2.0 * a.sqrt() * alpha;
        Self::normalize(
            a * ((a + 1.0) - (a - 1.0) * cos_w + k),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
            a * ((a + 1.0) - (a - 1.0) * cos_w - k),
            (a + 1.0) + (a - 1.0) * cos_w + k,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
            (a + 1.0) + (a - 1.0) * cos_w - k,
        )
    }

    pub fn high_shelf(frequency_hz: f32, q: f32, gain_db: f32, sample_rate: u32) -> Self {
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let (cos_w, alpha) = omega(frequency_hz, q, sample_rate);
        let k = 2.0 * a.sqrt() * alpha;
        Self::normalize(
            a * ((a + 1.0) + (a - 1.0) * cos_w + k),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
            a * ((a + 1.0) + (a - 1.0) * cos_w - k),
            (a + 1.0) - (a - 1.0) * cos_w + k,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
            (a + 1.0) - (a - 1.0) * cos_w - k,
        )
    }

    /// Coefficients for one EQ band
    pub fn band(band: &BandEqParams, sample_rate: u32) -> Self {
        let q = match band.width {
            BandWidth::Q(q) => q,
            BandWidth::Octaves(octaves) => octaves_to_q(octaves, band.frequency_hz, sample_rate),
        };
        match band.shape {
            EqShape::Peaking => Self::peaking(band.frequency_hz, q, band.gain_db, sample_rate),
            EqShape::LowShelf => Self::low_shelf(band.frequency_hz, q, band.gain_db, sample_rate),
            EqShape::HighShelf => {
                Self::high_shelf(band.frequency_hz, q, band.gain_db, sample_rate)
            }
        }
    }

    /// Raw coefficients, already normalised by a0
    pub fn from_raw(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self { b0, b1, b2, a1, a2 }
    }

    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

fn omega(frequency_hz: f32, q: f32, sample_rate: u32) -> (f64, f64) {
    let w0 = 2.0 * PI * frequency_hz as f64 / sample_rate as f64;
    let q = (q as f64).max(1e-3);
    (w0.cos(), w0.sin() / (2.0 * q))
}

/// Digital bandwidth in octaves to Q (RBJ's bilinear-warped relation)
fn octaves_to_q(octaves: f32, frequency_hz: f32, sample_rate: u32) -> f32 {
    let w0 = 2.0 * PI * frequency_hz as f64 / sample_rate as f64;
    let bw = octaves.max(0.01) as f64;
    let inv_q = 2.0 * ((2f64.ln() / 2.0) * bw * w0 / w0.sin()).sinh();
    (1.0 / inv_q) as f32
}

/// Direct form I section
#[derive(Debug, Clone)]
pub struct Biquad {
    c: Coefficients,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(c: Coefficients) -> Self {
        Self {
            c,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let y = self.c.b0 * x + self.c.b1 * self.x1 + self.c.b2 * self.x2
            - self.c.a1 * self.y1
            - self.c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y as f32
    }

    pub fn process_block(&mut self, samples: &mut [f32]) {
        for s in samples.iter_mut() {
            *s = self.process(*s);
        }
    }
}

/// Run a fresh filter over every channel
pub fn filter_channels(channels: &mut [Vec<f32>], c: Coefficients) {
    for channel in channels.iter_mut() {
        Biquad::new(c).process_block(channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn steady_peak(samples: &[f32]) -> f32 {
        samples[samples.len() / 2..]
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn high_pass_blocks_dc() {
        let mut hp = Biquad::new(Coefficients::high_pass(20.0, 0.707, 48000));
        let mut out = 0.0;
        for _ in 0..48000 {
            out = hp.process(1.0);
        }
        assert!(out.abs() < 1e-3, "DC leaked: {out}");
    }

    #[test]
    fn low_pass_attenuates_above_cutoff() {
        let mut signal = sine(10000.0, 48000, 9600);
        Biquad::new(Coefficients::low_pass(1000.0, 0.707, 48000)).process_block(&mut signal);
        assert!(steady_peak(&signal) < 0.05);
    }

    #[test]
    fn peaking_gain_at_center() {
        let mut signal = sine(1000.0, 48000, 9600);
        Biquad::new(Coefficients::peaking(1000.0, 1.0, 6.0, 48000)).process_block(&mut signal);
        let gain_db = 20.0 * steady_peak(&signal).log10();
        assert!((gain_db - 6.0).abs() < 0.2, "gain {gain_db}");
    }

    #[test]
    fn low_shelf_boosts_lows_not_highs() {
        let c = Coefficients::low_shelf(100.0, 0.707, 5.0, 48000);
        let mut low = sine(15.0, 48000, 96000);
        let mut high = sine(5000.0, 48000, 9600);
        Biquad::new(c).process_block(&mut low);
        Biquad::new(c).process_block(&mut high);
        assert!((20.0 * steady_peak(&low).log10() - 5.0).abs() < 0.5);
        assert!((20.0 * steady_peak(&high).log10()).abs() < 0.2);
    }

    #[test]
    fn one_octave_is_about_q_1_4() {
        let q = octaves_to_q(1.0, 1000.0, 48000);
        assert!((q - 1.414).abs() < 0.02, "q {q}");
    }
}
