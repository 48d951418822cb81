//! STFT spectral gate
//!
//! Periodic Hann frames at 50% overlap (which sums to unity, so unmodified
//! frames reconstruct the input exactly). Bins whose magnitude falls under
//! the noise floor are attenuated by the reduction amount.

use super::common::db_to_lin;
use crate::chain::stage::DenoiseParams;
use crate::types::AudioBuffer;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

const FRAME_SIZE: usize = 2048;
const HOP: usize = FRAME_SIZE / 2;

pub fn denoise(buffer: &mut AudioBuffer, params: &DenoiseParams) {
    if buffer.is_empty() {
        return;
    }

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(FRAME_SIZE);
    let inverse = planner.plan_fft_inverse(FRAME_SIZE);

    let window: Vec<f32> = (0..FRAME_SIZE)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / FRAME_SIZE as f32).cos())
        .collect();

    // Expected bin magnitude of white noise at `noise_floor_db` RMS:
    // rms * sqrt(sum(w^2)), and sum(w^2) = 3N/8 for a Hann window
    let floor = db_to_lin(params.noise_floor_db) * (3.0 * FRAME_SIZE as f32 / 8.0).sqrt();
    let reduction = db_to_lin(-params.reduction_db.abs());
    let scale = 1.0 / FRAME_SIZE as f32;

    let mut frame = vec![Complex::new(0.0f32, 0.0); FRAME_SIZE];

    for channel in buffer.channels.iter_mut() {
        let len = channel.len();
        let mut padded = vec![0.0f32; HOP + len + FRAME_SIZE];
        padded[HOP..HOP + len].copy_from_slice(channel);
        let mut output = vec![0.0f32; padded.len()];

        let mut start = 0;
        while start + FRAME_SIZE <= padded.len() {
            for (i, bin) in frame.iter_mut().enumerate() {
                *bin = Complex::new(padded[start + i] * window[i], 0.0);
            }
            forward.process(&mut frame);

            for bin in frame.iter_mut() {
                if bin.norm() < floor {
                    *bin *= reduction;
                }
            }

            inverse.process(&mut frame);
            for (i, bin) in frame.iter().enumerate() {
                output[start + i] += bin.re * scale;
            }
            start += HOP;
        }

        channel.copy_from_slice(&output[HOP..HOP + len]);
    }
}
