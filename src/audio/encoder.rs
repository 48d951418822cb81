//! Output encoders
//!
//! - WAV via hound (PCM 16/24-bit), always available
//! - FLAC via flac-bound (libFLAC), behind the `flac` feature
//! - MP3 via mp3lame-encoder (LAME), behind the `mp3` feature
//!
//! Encoders produce bytes in memory; `write_output` then writes them with
//! `fs::write`, replacing any existing file. No dither is applied, so equal
//! inputs always produce equal bytes.

use crate::chain::StageParams;
use crate::error::{MasterError, Result};
use crate::types::{AudioBuffer, OutputFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Settings that reach the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub format: OutputFormat,
    /// PCM bit depth for WAV and FLAC
    pub bit_depth: u16,
    pub mp3_bitrate_kbps: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Wav,
            bit_depth: 24,
            mp3_bitrate_kbps: 320,
        }
    }
}

impl From<&StageParams> for EncodeOptions {
    fn from(params: &StageParams) -> Self {
        Self {
            format: params.output_format,
            bit_depth: params.bit_depth,
            mp3_bitrate_kbps: params.mp3_bitrate_kbps,
        }
    }
}

/// Audio encoder trait
pub trait AudioEncoder {
    /// Encode a buffer to the target format
    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>>;

    /// File extension for this format
    fn extension(&self) -> &'static str;
}

/// Pick the encoder for the requested format
///
/// A format whose cargo feature is disabled yields an `EncodeError` naming
/// the feature.
pub fn encoder_for(options: &EncodeOptions) -> Result<Box<dyn AudioEncoder>> {
    match options.format {
        OutputFormat::Wav => Ok(Box::new(WavEncoder::new(options.bit_depth))),
        #[cfg(feature = "flac")]
        OutputFormat::Flac => Ok(Box::new(FlacEncoder::new(options.bit_depth))),
        #[cfg(not(feature = "flac"))]
        OutputFormat::Flac => Err(MasterError::encoder_feature_disabled("", "flac")),
        #[cfg(feature = "mp3")]
        OutputFormat::Mp3 => Ok(Box::new(Mp3Encoder::new(options.mp3_bitrate_kbps))),
        #[cfg(not(feature = "mp3"))]
        OutputFormat::Mp3 => Err(MasterError::encoder_feature_disabled("", "mp3")),
    }
}

/// Encode and write one output file, overwriting any existing file
pub fn write_output(buffer: &AudioBuffer, path: &Path, options: &EncodeOptions) -> Result<()> {
    let encoder = encoder_for(options)?;
    let bytes = encoder.encode(buffer)?;
    std::fs::write(path, &bytes).map_err(|e| {
        MasterError::encode_error(path, format!("Failed to write output: {}", e))
    })?;
    debug!(
        "Wrote {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        encoder.extension()
    );
    Ok(())
}

/// Float sample to signed integer PCM at the given bit depth
#[inline]
fn to_pcm(sample: f32, bit_depth: u16) -> i32 {
    let max = ((1i64 << (bit_depth - 1)) - 1) as f32;
    (sample.clamp(-1.0, 1.0) * max).round() as i32
}

// =============================================================================
// WAV
// =============================================================================

/// WAV encoder using hound
pub struct WavEncoder {
    bit_depth: u16,
}

impl WavEncoder {
    pub fn new(bit_depth: u16) -> Self {
        Self { bit_depth }
    }
}

impl AudioEncoder for WavEncoder {
    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>> {
        if !matches!(self.bit_depth, 16 | 24) {
            return Err(MasterError::encode_error(
                "",
                format!("Unsupported WAV bit depth: {}", self.bit_depth),
            ));
        }

        let mut output = Vec::new();
        let spec = hound::WavSpec {
            channels: buffer.num_channels() as u16,
            sample_rate: buffer.sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::new(Cursor::new(&mut output), spec)
            .map_err(|e| MasterError::encode_error("", e.to_string()))?;

        for sample in buffer.interleaved() {
            let pcm = to_pcm(sample, self.bit_depth);
            let written = if self.bit_depth == 16 {
                writer.write_sample(pcm as i16)
            } else {
                writer.write_sample(pcm)
            };
            written.map_err(|e| MasterError::encode_error("", e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| MasterError::encode_error("", e.to_string()))?;

        Ok(output)
    }

    fn extension(&self) -> &'static str {
        "wav"
    }
}

// =============================================================================
// FLAC
// =============================================================================

/// FLAC encoder using flac-bound
#[cfg(feature = "flac")]
pub struct FlacEncoder {
    bit_depth: u16,
}

#[cfg(feature = "flac")]
impl FlacEncoder {
    pub fn new(bit_depth: u16) -> Self {
        Self { bit_depth }
    }
}

#[cfg(feature = "flac")]
impl AudioEncoder for FlacEncoder {
    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>> {
        use flac_bound::{FlacEncoder as FlacEnc, WriteWrapper};

        const BLOCK_FRAMES: usize = 4096;
        let channels = buffer.num_channels();
        let mut output = Vec::new();

        let config = FlacEnc::new()
            .ok_or_else(|| MasterError::encode_error("", "FLAC encoder init failed"))?
            .channels(channels as u32)
            .sample_rate(buffer.sample_rate)
            .bits_per_sample(self.bit_depth as u32)
            .compression_level(5);

        let mut wrapper = WriteWrapper(&mut output);
        let mut encoder = config
            .init_write(&mut wrapper)
            .map_err(|e| MasterError::encode_error("", format!("FLAC init failed: {:?}", e)))?;

        let samples: Vec<i32> = buffer
            .interleaved()
            .into_iter()
            .map(|s| to_pcm(s, self.bit_depth))
            .collect();

        for block in samples.chunks(BLOCK_FRAMES * channels) {
            encoder
                .process_interleaved(block, (block.len() / channels) as u32)
                .map_err(|_| MasterError::encode_error("", "FLAC block encode failed"))?;
        }

        encoder
            .finish()
            .map_err(|_| MasterError::encode_error("", "FLAC finish failed"))?;

        Ok(output)
    }

    fn extension(&self) -> &'static str {
        "flac"
    }
}

// =============================================================================
// MP3
// =============================================================================

/// MP3 encoder using LAME via mp3lame-encoder
#[cfg(feature = "mp3")]
pub struct Mp3Encoder {
    bitrate_kbps: u32,
}

#[cfg(feature = "mp3")]
impl Mp3Encoder {
    pub fn new(bitrate_kbps: u32) -> Self {
        Self { bitrate_kbps }
    }

    fn lame_bitrate(&self) -> mp3lame_encoder::Bitrate {
        use mp3lame_encoder::Bitrate;
        match self.bitrate_kbps {
            0..=111 => Bitrate::Kbps96,
            112..=127 => Bitrate::Kbps112,
            128..=159 => Bitrate::Kbps128,
            160..=191 => Bitrate::Kbps160,
            192..=223 => Bitrate::Kbps192,
            224..=255 => Bitrate::Kbps224,
            256..=319 => Bitrate::Kbps256,
            _ => Bitrate::Kbps320,
        }
    }
}

#[cfg(feature = "mp3")]
impl AudioEncoder for Mp3Encoder {
    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>> {
        use mp3lame_encoder::{Builder, DualPcm, FlushNoGap};

        let lame_err = |what: &str, e: &dyn std::fmt::Debug| {
            MasterError::encode_error("", format!("LAME {} failed: {:?}", what, e))
        };

        let mut builder =
            Builder::new().ok_or_else(|| MasterError::encode_error("", "LAME init failed"))?;
        builder
            .set_num_channels(2)
            .map_err(|e| lame_err("set channels", &e))?;
        builder
            .set_sample_rate(buffer.sample_rate)
            .map_err(|e| lame_err("set sample rate", &e))?;
        builder
            .set_brate(self.lame_bitrate())
            .map_err(|e| lame_err("set bitrate", &e))?;
        builder
            .set_quality(mp3lame_encoder::Quality::Best)
            .map_err(|e| lame_err("set quality", &e))?;
        let mut encoder = builder.build().map_err(|e| lame_err("build", &e))?;

        // LAME takes 16-bit PCM; mono is sent as two identical channels
        let to_i16 = |s: f32| to_pcm(s, 16) as i16;
        let left: Vec<i16> = buffer
            .channels
            .first()
            .map(|c| c.iter().copied().map(to_i16).collect())
            .unwrap_or_default();
        let right: Vec<i16> = match buffer.channels.get(1) {
            Some(c) => c.iter().copied().map(to_i16).collect(),
            None => left.clone(),
        };

        let mut mp3_output: Vec<u8> =
            Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(left.len()));
        let input = DualPcm {
            left: &left,
            right: &right,
        };
        let encoded_size = encoder
            .encode(input, mp3_output.spare_capacity_mut())
            .map_err(|e| lame_err("encode", &e))?;
        // SAFETY: encoder wrote encoded_size bytes into spare capacity
        unsafe {
            mp3_output.set_len(encoded_size);
        }

        mp3_output.reserve(7200);
        let flush_size = encoder
            .flush::<FlushNoGap>(mp3_output.spare_capacity_mut())
            .map_err(|e| lame_err("flush", &e))?;
        // SAFETY: encoder wrote flush_size bytes into spare capacity
        unsafe {
            mp3_output.set_len(mp3_output.len() + flush_size);
        }

        Ok(mp3_output)
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }
}
