//! In-process stage interpreter
//!
//! Every `StageDescriptor` variant maps to one processor here. Processors
//! own all their state, so a descriptor can be applied to any number of
//! buffers concurrently.

pub mod biquad;
pub mod common;
pub mod denoise;
pub mod dynamics;
pub mod echo;
pub mod limiter;
pub mod loudness;
pub mod multiband;
pub mod resample;
pub mod stereo;

use crate::chain::stage::StageDescriptor;
use crate::error::{MasterError, Result};
use crate::types::AudioBuffer;
use biquad::{filter_channels, Coefficients};
use common::db_to_lin;

impl StageDescriptor {
    /// Run this stage over the buffer in place
    pub fn apply(&self, buffer: &mut AudioBuffer) -> Result<()> {
        if buffer.sample_rate == 0 {
            return Err(MasterError::stage(self.name(), "buffer has no sample rate"));
        }
        let sample_rate = buffer.sample_rate;

        match self {
            StageDescriptor::Resample(p) => resample::normalize_format(buffer, p),
            StageDescriptor::HighPass(p) => {
                check_frequency(self, p.cutoff_hz, sample_rate)?;
                filter_channels(
                    &mut buffer.channels,
                    Coefficients::high_pass(p.cutoff_hz, p.q, sample_rate),
                );
            }
            StageDescriptor::LowPass(p) => {
                check_frequency(self, p.cutoff_hz, sample_rate)?;
                filter_channels(
                    &mut buffer.channels,
                    Coefficients::low_pass(p.cutoff_hz, p.q, sample_rate),
                );
            }
            StageDescriptor::DenoiseFft(p) => denoise::denoise(buffer, p),
            StageDescriptor::BandEq(p) => {
                check_frequency(self, p.frequency_hz, sample_rate)?;
                filter_channels(&mut buffer.channels, Coefficients::band(p, sample_rate));
            }
            StageDescriptor::DynamicsCompressor(p) => {
                dynamics::Compressor::new(p, sample_rate).process_channels(&mut buffer.channels);
            }
            StageDescriptor::MultibandCompressor(p) => {
                check_frequency(self, p.crossover_high_hz, sample_rate)?;
                multiband::process(buffer, p);
            }
            StageDescriptor::StereoTools(p) => stereo::stereo_tools(buffer, p),
            StageDescriptor::LoudnessNormalize(p) => {
                loudness::normalize(buffer, p);
            }
            StageDescriptor::Limiter(p) => {
                if p.output_gain > 1.0 {
                    return Err(MasterError::stage(
                        self.name(),
                        format!("output gain {} would exceed the ceiling", p.output_gain),
                    ));
                }
                limiter::limit(buffer, p);
            }
            StageDescriptor::GainTrim(p) => {
                let gain = db_to_lin(p.gain_db);
                for s in buffer.channels.iter_mut().flatten() {
                    *s *= gain;
                }
            }
            StageDescriptor::Echo(p) => echo::echo(buffer, p),
            StageDescriptor::WetDryMixer(p) => echo::wet_dry(buffer, p),
        }
        Ok(())
    }
}

/// Filters are only defined below Nyquist
fn check_frequency(stage: &StageDescriptor, frequency_hz: f32, sample_rate: u32) -> Result<()> {
    let nyquist = sample_rate as f32 / 2.0;
    if !(frequency_hz > 0.0 && frequency_hz < nyquist) {
        return Err(MasterError::stage(
            stage.name(),
            format!("{frequency_hz} Hz is outside (0, {nyquist}) at {sample_rate} Hz"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::stage::{FilterParams, GainParams};

    #[test]
    fn gain_trim_scales_samples() {
        let mut buffer = AudioBuffer::new(vec![vec![0.5, -0.5]], 48000);
        StageDescriptor::GainTrim(GainParams { gain_db: -6.0206 })
            .apply(&mut buffer)
            .unwrap();
        assert!((buffer.channels[0][0] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn filter_above_nyquist_is_a_stage_error() {
        let mut buffer = AudioBuffer::new(vec![vec![0.0; 10]], 16000);
        let err = StageDescriptor::LowPass(FilterParams {
            cutoff_hz: 20000.0,
            q: 0.7,
        })
        .apply(&mut buffer)
        .unwrap_err();
        assert!(matches!(err, MasterError::StageExecutionError { ref stage, .. } if stage == "low_pass"));
    }
}
