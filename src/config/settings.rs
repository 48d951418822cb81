//! Runtime configuration settings

use super::cli::Cli;
use crate::chain::{MasteringProfile, MultibandParams, ReverbParams, StageParams, WetDryMixParams};
use crate::error::{MasterError, Result};
use crate::pipeline::BatchOptions;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Runtime settings for the mastering pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input directory
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,
    pub profile: MasteringProfile,
    pub params: StageParams,
    /// Scheduling, selection and cancellation
    pub batch: BatchOptions,
    /// Where to write the JSON run report, if anywhere
    pub report: Option<PathBuf>,
    /// Show progress bars
    pub show_progress: bool,
    /// Dry run mode - list files without processing
    pub dry_run: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    ///
    /// Fails only when a `--params` preset cannot be read or parsed; numeric
    /// ranges are checked later when the chain is built.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let flag_params = params_from_flags(cli);
        let params = match cli.params {
            Some(ref path) => load_params_preset(path, &flag_params)?,
            None => flag_params,
        };

        let batch = BatchOptions {
            concurrency: cli.threads,
            file_timeout: cli.timeout.map(Duration::from_secs),
            ignore_case: cli.ignore_case,
            vocal_overrides: cli.vocal_file.iter().cloned().collect(),
            ..BatchOptions::default()
        };

        Ok(Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            profile: cli.profile,
            params,
            batch,
            report: cli.report.clone(),
            show_progress: !cli.quiet,
            dry_run: cli.dry_run,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            output: PathBuf::from("./mastered"),
            profile: MasteringProfile::Default,
            params: StageParams::default(),
            batch: BatchOptions::default(),
            report: None,
            show_progress: true,
            dry_run: false,
        }
    }
}

fn params_from_flags(cli: &Cli) -> StageParams {
    StageParams {
        vocal_mode: cli.vocal,
        output_format: cli.format,
        bit_depth: cli.bit_depth,
        mp3_bitrate_kbps: cli.mp3_bitrate,
        sample_rate: cli.sample_rate,
        volume_adjust_db: cli.volume_db,
        reverb: ReverbParams {
            enabled: cli.reverb,
            delay_ms: cli.reverb_delay,
            decay: cli.reverb_decay,
        },
        bass_boost_enabled: cli.bass_boost,
        wet_dry_mix: WetDryMixParams {
            enabled: cli.wet,
            wet_ratio: cli.wet_ratio,
        },
        stereo_width: cli.stereo_width.map(|percent| percent / 100.0),
        multiband: MultibandParams {
            enabled: cli.multiband,
            low_threshold_db: cli.low_threshold,
            low_ratio: cli.low_ratio,
            mid_threshold_db: cli.mid_threshold,
            mid_ratio: cli.mid_ratio,
            high_threshold_db: cli.high_threshold,
            high_ratio: cli.high_ratio,
            crossover_low_hz: cli.crossover_low,
            crossover_high_hz: cli.crossover_high,
        },
    }
}

/// Read a JSON preset and lay it over `base`
///
/// Keys present in the file replace the matching knobs, at any nesting
/// depth; everything else keeps its value from `base`.
pub fn load_params_preset(path: &Path, base: &StageParams) -> Result<StageParams> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        MasterError::ConfigError(format!("Cannot read preset {}: {}", path.display(), e))
    })?;
    let overlay: Value = serde_json::from_str(&text).map_err(|e| {
        MasterError::ConfigError(format!("Invalid JSON in preset {}: {}", path.display(), e))
    })?;
    if !overlay.is_object() {
        return Err(MasterError::ConfigError(format!(
            "Preset {} must contain a JSON object",
            path.display()
        )));
    }

    let mut merged = serde_json::to_value(base)
        .map_err(|e| MasterError::ConfigError(format!("Cannot serialise parameters: {}", e)))?;
    merge_json(&mut merged, overlay);

    let params = serde_json::from_value(merged).map_err(|e| {
        MasterError::ConfigError(format!("Invalid parameters in {}: {}", path.display(), e))
    })?;
    debug!("Loaded parameter preset from {}", path.display());
    Ok(params)
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
