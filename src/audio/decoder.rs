//! Audio decoding using symphonia
//!
//! Decodes audio files to planar f32 at the source sample rate and channel
//! count. Layout and rate normalisation happen later in the chain's
//! `Resample` stage.

use crate::error::{MasterError, Result};
use crate::types::AudioBuffer;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Maximum file size we'll attempt to decode (2GB)
/// Prevents OOM on extremely large files
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Packets decoded between calls to the caller's check hook
const CHECK_INTERVAL_PACKETS: usize = 64;

/// Decode an audio file
pub fn decode(path: &Path) -> Result<AudioBuffer> {
    decode_with(path, &mut || Ok(()))
}

/// Decode an audio file, calling `check` periodically between packets
///
/// An error from `check` (a timeout, for instance) aborts the decode and is
/// returned unchanged.
pub fn decode_with(path: &Path, check: &mut dyn FnMut() -> Result<()>) -> Result<AudioBuffer> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| MasterError::decode_error(path, format!("Failed to read file metadata: {}", e)))?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(MasterError::decode_error(
            path,
            format!(
                "File too large ({:.1} GB). Maximum supported size is 2 GB.",
                metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| MasterError::decode_error(path, format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Provide a hint based on file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| match e {
            SymphoniaError::Unsupported(what) => MasterError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: format!(
                    "{} ({})",
                    path.extension().and_then(|e| e.to_str()).unwrap_or("unknown"),
                    what
                ),
            },
            other => MasterError::decode_error(path, format!("Failed to probe format: {}", other)),
        })?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MasterError::decode_error(path, "No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

    debug!(
        "Decoding: {} @ {}Hz, {} channels",
        path.display(),
        sample_rate,
        channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| MasterError::decode_error(path, format!("Failed to create decoder: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break; // End of stream
            }
            Err(e) => {
                return Err(MasterError::decode_error(
                    path,
                    format!("Failed to read packet: {}", e),
                ));
            }
        };

        packets += 1;
        if packets % CHECK_INTERVAL_PACKETS == 0 {
            check()?;
        }

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(MasterError::decode_error(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        if channels == 0 {
            channels = spec.channels.count();
        }
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    if channels == 0 || sample_rate == 0 || interleaved.len() < channels {
        return Err(MasterError::decode_error(path, "No audio frames decoded"));
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, channels, sample_rate);

    debug!(
        "Decoded {} frames ({:.2}s) from {}",
        buffer.frames(),
        buffer.duration(),
        path.display()
    );

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = decode(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, MasterError::DecodeError { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"this is not a riff file at all").unwrap();

        let err = decode(&path).unwrap_err();
        assert!(matches!(
            err,
            MasterError::DecodeError { .. } | MasterError::UnsupportedFormat { .. }
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_decodes_stereo_wav_planar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..4410 {
            writer.write_sample((i % 100) as i16 * 100).unwrap();
            writer.write_sample(-1000i16).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = decode(&path).unwrap();
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.sample_rate, 44100);
        assert_eq!(buffer.frames(), 4410);
        assert!((buffer.channels[1][10] - (-1000.0 / 32768.0)).abs() < 1e-4);
    }
}
