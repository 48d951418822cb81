//! CLI argument parsing and configuration

use crate::chain::MasteringProfile;
use crate::types::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// audiomaster - batch audio mastering
///
/// Masters every WAV, MP3, AAC, OGG and FLAC file in a directory through a
/// profile-driven signal chain (EQ, compression, loudness normalisation and
/// limiting) and writes `<name>Mastered.<format>` files to the output directory.
#[derive(Parser, Debug)]
#[command(name = "audiomaster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input directory (not searched recursively)
    #[arg(short, long, value_name = "DIR")]
    pub input: PathBuf,

    /// Output directory (created if missing)
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Mastering profile
    #[arg(short, long, value_enum, default_value_t = MasteringProfile::Default)]
    pub profile: MasteringProfile,

    /// Append the vocal-focused sub-chain
    #[arg(long)]
    pub vocal: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Wav)]
    pub format: OutputFormat,

    /// PCM bit depth for WAV/FLAC output
    #[arg(long, value_name = "BITS", default_value_t = 24, value_parser = parse_bit_depth)]
    pub bit_depth: u16,

    /// MP3 bitrate in kbps
    #[arg(long, value_name = "KBPS", default_value_t = 320)]
    pub mp3_bitrate: u32,

    /// Output sample rate
    #[arg(long, value_name = "HZ", default_value_t = 48000)]
    pub sample_rate: u32,

    /// Manual output level offset in dB
    #[arg(long, value_name = "DB", default_value_t = 0.0, allow_hyphen_values = true)]
    pub volume_db: f32,

    /// Add the discrete-echo reverb
    #[arg(long)]
    pub reverb: bool,

    /// First reverb tap delay
    #[arg(long, value_name = "MS", default_value_t = 60.0)]
    pub reverb_delay: f32,

    /// First reverb tap gain (0-1)
    #[arg(long, value_name = "GAIN", default_value_t = 0.5)]
    pub reverb_decay: f32,

    /// Add a +5 dB low shelf at 100 Hz
    #[arg(long)]
    pub bass_boost: bool,

    /// Blend in a parallel wet "room" branch
    #[arg(long)]
    pub wet: bool,

    /// Share of the wet branch (0-1)
    #[arg(long, value_name = "RATIO", default_value_t = 0.3)]
    pub wet_ratio: f32,

    /// Stereo width in percent (100 = unchanged, 0 = mono); omit to keep the profile's width
    #[arg(long, value_name = "PERCENT")]
    pub stereo_width: Option<f32>,

    /// Enable three-band compression
    #[arg(long)]
    pub multiband: bool,

    /// Low band threshold
    #[arg(long, value_name = "DB", default_value_t = -12.0, allow_hyphen_values = true)]
    pub low_threshold: f32,

    /// Low band ratio
    #[arg(long, value_name = "RATIO", default_value_t = 4.0)]
    pub low_ratio: f32,

    /// Mid band threshold
    #[arg(long, value_name = "DB", default_value_t = -12.0, allow_hyphen_values = true)]
    pub mid_threshold: f32,

    /// Mid band ratio
    #[arg(long, value_name = "RATIO", default_value_t = 4.0)]
    pub mid_ratio: f32,

    /// High band threshold
    #[arg(long, value_name = "DB", default_value_t = -12.0, allow_hyphen_values = true)]
    pub high_threshold: f32,

    /// High band ratio
    #[arg(long, value_name = "RATIO", default_value_t = 4.0)]
    pub high_ratio: f32,

    /// Low/mid crossover
    #[arg(long, value_name = "HZ", default_value_t = 200.0)]
    pub crossover_low: f32,

    /// Mid/high crossover
    #[arg(long, value_name = "HZ", default_value_t = 5000.0)]
    pub crossover_high: f32,

    /// JSON parameter preset; knobs present in the file win over flags
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Number of concurrent workers (0 = one per CPU)
    #[arg(short = 'j', long, value_name = "N", default_value_t = 4)]
    pub threads: usize,

    /// Per-file time limit
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Match extensions case-insensitively (.WAV as well as .wav)
    #[arg(long)]
    pub ignore_case: bool,

    /// File name whose vocal mode is flipped relative to --vocal (repeatable)
    #[arg(long, value_name = "NAME")]
    pub vocal_file: Vec<String>,

    /// Write a JSON run report
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Dry run - list files and the chain without processing
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl Cli {
    /// Default log filter from the verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn parse_bit_depth(s: &str) -> Result<u16, String> {
    match s {
        "16" => Ok(16),
        "24" => Ok(24),
        _ => Err(format!("bit depth must be 16 or 24, got {}", s)),
    }
}
