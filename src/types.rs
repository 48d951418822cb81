//! Core data types for audiomaster
//!
//! These types represent the domain model and flow through the pipeline.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// =============================================================================
// Audio buffer
// =============================================================================

/// Decoded audio in planar floating-point form
///
/// Every channel holds the same number of frames. Samples are nominally in
/// [-1.0, 1.0] but stages may exceed that range until the limiter runs.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// One sample vector per channel
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    /// Build from interleaved samples [c0, c1, ..., c0, c1, ...]
    pub fn from_interleaved(samples: &[f32], num_channels: usize, sample_rate: u32) -> Self {
        let num_channels = num_channels.max(1);
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }

        Self::new(channels, sample_rate)
    }

    /// Get interleaved samples [c0, c1, ..., c0, c1, ...]
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let mut result = Vec::with_capacity(frames * self.num_channels());
        for i in 0..frames {
            for channel in &self.channels {
                result.push(channel[i]);
            }
        }
        result
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        // Guard against division by zero - use 0 duration for invalid sample rate
        if self.sample_rate > 0 {
            self.frames() as f64 / self.sample_rate as f64
        } else {
            0.0
        }
    }

    /// Check if buffer holds no audio
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }
}

// =============================================================================
// Formats
// =============================================================================

/// Input formats picked up by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Wav,
    Mp3,
    Aac,
    Ogg,
    Flac,
}

impl InputFormat {
    /// Detect format from a file extension
    ///
    /// Matching is exact (`wav` but not `WAV`) unless `ignore_case` is set.
    pub fn from_extension(ext: &str, ignore_case: bool) -> Option<Self> {
        let ext = if ignore_case {
            ext.to_ascii_lowercase()
        } else {
            ext.to_string()
        };
        match ext.as_str() {
            "wav" => Some(InputFormat::Wav),
            "mp3" => Some(InputFormat::Mp3),
            "aac" => Some(InputFormat::Aac),
            "ogg" => Some(InputFormat::Ogg),
            "flac" => Some(InputFormat::Flac),
            _ => None,
        }
    }
}

/// Encoded output formats
#[derive(
    ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
    Flac,
    Mp3,
}

impl OutputFormat {
    /// File extension written for this format
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Flac => "flac",
            OutputFormat::Mp3 => "mp3",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

// =============================================================================
// Job lifecycle
// =============================================================================

/// Status of one file in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Legal transitions: Pending -> Running -> {Succeeded | Failed}
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    /// Succeeded or Failed
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_roundtrip_shape() {
        let buffer = AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 2, 48000);
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.channels[0], vec![0.1, 0.3, 0.5]);
        assert_eq!(buffer.channels[1], vec![0.2, 0.4, 0.6]);
        assert_eq!(buffer.interleaved(), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_duration_guards_zero_rate() {
        let buffer = AudioBuffer::new(vec![vec![0.0; 100]], 0);
        assert_eq!(buffer.duration(), 0.0);
    }

    #[test]
    fn test_extension_case_sensitivity() {
        assert_eq!(InputFormat::from_extension("wav", false), Some(InputFormat::Wav));
        assert_eq!(InputFormat::from_extension("WAV", false), None);
        assert_eq!(InputFormat::from_extension("WAV", true), Some(InputFormat::Wav));
        assert_eq!(InputFormat::from_extension("txt", true), None);
    }

    #[test]
    fn test_job_status_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Succeeded));
        assert!(!JobStatus::Succeeded.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Failed.is_terminal());
    }
}
