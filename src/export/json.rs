//! JSON run report

use crate::chain::{MasteringProfile, StageParams};
use crate::error::{MasterError, Result};
use crate::pipeline::BatchResult;
use crate::types::JobStatus;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Report schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level report structure
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward compatibility
    pub version: String,
    pub metadata: ReportMetadata,
    pub totals: ReportTotals,
    /// One entry per discovered file, in scan order
    pub jobs: Vec<JobJson>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// audiomaster version that generated this file
    pub generator_version: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub profile: MasteringProfile,
    pub params: StageParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobJson {
    pub input: String,
    pub output: String,
    pub status: JobStatus,
    pub vocal_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Write a batch report
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
pub fn write_report(
    result: &BatchResult,
    profile: MasteringProfile,
    params: &StageParams,
    output_path: &Path,
) -> Result<()> {
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| MasterError::ResourceError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let report = RunReport {
        version: SCHEMA_VERSION.to_string(),
        metadata: ReportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            profile,
            params: params.clone(),
        },
        totals: ReportTotals {
            total: result.total_count,
            succeeded: result.succeeded_count,
            failed: result.failed_count,
            skipped: result.skipped_count,
        },
        jobs: result
            .jobs
            .iter()
            .map(|job| JobJson {
                input: job.input_path.to_string_lossy().to_string(),
                output: job.output_path.to_string_lossy().to_string(),
                status: job.status,
                vocal_mode: job.vocal_mode,
                error: job.error_detail.clone(),
            })
            .collect(),
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &report).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        MasterError::ResourceError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        MasterError::ResourceError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!(
        "Wrote report for {} files to {}",
        report.jobs.len(),
        output_path.display()
    );

    Ok(())
}

/// Read a report back
pub fn read_report(path: &Path) -> Result<RunReport> {
    let file = File::open(path).map_err(|e| MasterError::resource_error(path, e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| MasterError::ConfigError(format!("Invalid report {}: {}", path.display(), e)))
}
