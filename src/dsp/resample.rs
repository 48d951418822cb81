//! Channel layout and sample-rate normalisation
//!
//! Uses rubato's FFT resampler with a proper anti-aliasing filter, one
//! resampler per channel so every channel sees identical processing.

use super::stereo::to_channel_count;
use crate::chain::stage::ResampleParams;
use crate::types::AudioBuffer;
use rubato::{FftFixedInOut, Resampler};
use tracing::debug;

/// Fixed chunk size handed to rubato
const CHUNK_SIZE: usize = 1024;

pub fn normalize_format(buffer: &mut AudioBuffer, params: &ResampleParams) {
    to_channel_count(buffer, params.channels);

    if buffer.sample_rate != params.sample_rate && buffer.sample_rate > 0 {
        debug!(
            "Resampling {} Hz -> {} Hz",
            buffer.sample_rate, params.sample_rate
        );
        let from = buffer.sample_rate;
        for channel in buffer.channels.iter_mut() {
            *channel = resample(channel, from, params.sample_rate);
        }
    }
    buffer.sample_rate = params.sample_rate;
}

/// Resample one channel
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let mut resampler =
        match FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 1) {
            Ok(r) => r,
            Err(e) => {
                debug!("Rubato initialization failed ({}), using fallback", e);
                return resample_linear_fallback(samples, from_rate, to_rate);
            }
        };

    let input_frames_per_chunk = resampler.input_frames_next();
    let output_frames_per_chunk = resampler.output_frames_next();
    let ratio = to_rate as f64 / from_rate as f64;
    let expected_len = (samples.len() as f64 * ratio).round() as usize;

    // The resampler delays its output; feed zeros past the end so the
    // delayed tail comes out, then drop the leading delay
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected_len + delay + output_frames_per_chunk);

    let mut pos = 0;
    while output.len() < expected_len + delay {
        let mut chunk: Vec<f32> = if pos < samples.len() {
            let end = (pos + input_frames_per_chunk).min(samples.len());
            samples[pos..end].to_vec()
        } else {
            Vec::new()
        };
        chunk.resize(input_frames_per_chunk, 0.0);

        let input = vec![chunk];
        match resampler.process(&input, None) {
            Ok(resampled) => {
                if let Some(channel) = resampled.first() {
                    output.extend_from_slice(channel);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), using fallback", e);
                return resample_linear_fallback(samples, from_rate, to_rate);
            }
        }
        pos += input_frames_per_chunk;
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected_len);
    output
}

/// Linear interpolation, used only when rubato cannot be set up
fn resample_linear_fallback(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < samples.len() {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else {
            samples[src_idx.min(samples.len() - 1)]
        };
        output.push(sample);
    }

    output
}
