//! Multi-tap echo and the parallel wet/dry blend

use super::common::ms_to_frames;
use crate::chain::stage::{EchoParams, WetDryParams};
use crate::types::AudioBuffer;

/// Feed-forward echo: `out = (in * in_gain + sum(tap.decay * in[n - tap.delay])) * out_gain`
///
/// The buffer keeps its length; echoes past the end are cut.
pub fn echo(buffer: &mut AudioBuffer, params: &EchoParams) {
    let taps: Vec<(usize, f32)> = params
        .taps
        .iter()
        .map(|t| (ms_to_frames(t.delay_ms, buffer.sample_rate), t.decay))
        .collect();

    for channel in buffer.channels.iter_mut() {
        let dry = channel.clone();
        for (n, sample) in channel.iter_mut().enumerate() {
            let mut acc = dry[n] * params.in_gain;
            for &(delay, decay) in &taps {
                if n >= delay {
                    acc += dry[n - delay] * decay;
                }
            }
            *sample = acc * params.out_gain;
        }
    }
}

/// Blend the buffer with an echoed copy of itself
pub fn wet_dry(buffer: &mut AudioBuffer, params: &WetDryParams) {
    let mut wet = buffer.clone();
    echo(&mut wet, &params.wet);
    for (channel, wet_channel) in buffer.channels.iter_mut().zip(wet.channels.iter()) {
        for (d, w) in channel.iter_mut().zip(wet_channel.iter()) {
            *d = *d * params.dry_weight + *w * params.wet_weight;
        }
    }
}
