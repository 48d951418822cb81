//! Offline look-ahead peak limiter
//!
//! The whole buffer is available, so the gain envelope is computed in two
//! passes: a backward pass that starts pulling gain down `attack` before each
//! peak, then a forward pass that lets it recover over `release`. Both passes
//! only ever lower the gain below what each frame requires, so no output
//! sample exceeds `ceiling * output_gain`.

use super::common::ms_to_frames;
use crate::chain::stage::LimiterParams;
use crate::types::AudioBuffer;

pub fn limit(buffer: &mut AudioBuffer, params: &LimiterParams) {
    let frames = buffer.frames();
    if frames == 0 {
        return;
    }
    let ceiling = params.ceiling.max(1e-6);

    for channel in buffer.channels.iter_mut() {
        for s in channel.iter_mut() {
            *s *= params.input_gain;
        }
    }

    // Gain each frame needs on its own
    let mut gain: Vec<f32> = (0..frames)
        .map(|i| {
            let peak = buffer
                .channels
                .iter()
                .fold(0.0f32, |acc, c| acc.max(c[i].abs()));
            if peak > ceiling {
                ceiling / peak
            } else {
                1.0
            }
        })
        .collect();

    let attack = recovery_step(ms_to_frames(params.attack_ms, buffer.sample_rate));
    for i in (0..frames.saturating_sub(1)).rev() {
        let next = gain[i + 1];
        gain[i] = gain[i].min(next + (1.0 - next) * attack);
    }

    let release = recovery_step(ms_to_frames(params.release_ms, buffer.sample_rate));
    for i in 1..frames {
        let prev = gain[i - 1];
        gain[i] = gain[i].min(prev + (1.0 - prev) * release);
    }

    let hard = ceiling * params.output_gain;
    for channel in buffer.channels.iter_mut() {
        for (s, g) in channel.iter_mut().zip(gain.iter()) {
            // Clamp absorbs float rounding in s * g
            *s = (*s * g * params.output_gain).clamp(-hard, hard);
        }
    }
}

/// Fraction of the remaining distance to unity gain recovered per frame
fn recovery_step(time_frames: usize) -> f32 {
    if time_frames == 0 {
        1.0
    } else {
        1.0 - (-1.0 / time_frames as f32).exp()
    }
}
