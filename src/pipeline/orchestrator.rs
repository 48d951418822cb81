//! CLI-facing pipeline run
//!
//! Wraps `run_batch` with discovery reporting, dry-run output, the progress
//! bar and the optional JSON report.

use super::batch::{run_batch, BatchResult};
use super::observer::{BatchObserver, NoopObserver, ProgressBarObserver};
use crate::chain::build_chain;
use crate::config::Settings;
use crate::discovery::{self, DiscoveredFile};
use crate::error::Result;
use crate::export;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// Run the full mastering pipeline
pub fn run(settings: &Settings) -> Result<BatchResult> {
    let pipeline_start = Instant::now();

    // Dry run mode - show files and exit
    if settings.dry_run {
        return run_dry_run(settings);
    }

    info!("Scanning for audio files...");
    let expected = if settings.input.is_dir() {
        discovery::scan(&settings.input, settings.batch.ignore_case)?.len()
    } else {
        // run_batch reports the missing directory
        0
    };

    let progress = if settings.show_progress && expected > 0 {
        Some(ProgressBarObserver::new(expected))
    } else {
        None
    };
    let observer: &dyn BatchObserver = match progress {
        Some(ref bar) => bar,
        None => &NoopObserver,
    };

    let result = run_batch(
        &settings.input,
        &settings.output,
        settings.profile,
        &settings.params,
        &settings.batch,
        observer,
    )?;

    if let Some(bar) = progress {
        bar.finish("Mastering complete");
    }

    if let Some(ref report_path) = settings.report {
        export::write_report(&result, settings.profile, &settings.params, report_path)?;
    }

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(result)
}

/// Dry run mode - show files, outputs and the chain without processing
fn run_dry_run(settings: &Settings) -> Result<BatchResult> {
    // Parameters are checked first, exactly as a real run would
    let chain = build_chain(settings.profile, &settings.params)?;
    let files = discovery::scan(&settings.input, settings.batch.ignore_case)?;

    println!();
    println!("=== DRY RUN MODE ===");
    println!();

    for file in &files {
        let output =
            discovery::output_path_for(&file.path, &settings.output, settings.params.output_format);
        let name = file.path.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        let vocal = settings.params.vocal_mode != settings.batch.vocal_overrides.contains(name);
        println!(
            "  {} -> {}{}",
            name,
            output.display(),
            if vocal { "  [vocal]" } else { "" }
        );
    }

    println!();
    println!("─────────────────────────────────────────");
    println!();
    println!("Would master {} files:", files.len());
    for (format, count) in format_breakdown(&files) {
        println!("  {} {} files", count, format);
    }
    println!();

    println!(
        "Signal chain ({} stages, profile '{}'):",
        chain.len(),
        chain.profile()
    );
    match serde_json::to_string_pretty(chain.stages()) {
        Ok(json) => println!("{}", json),
        Err(_) => {
            for stage in chain.stages() {
                println!("  {}", stage.name());
            }
        }
    }
    println!();

    Ok(BatchResult {
        total_count: files.len(),
        skipped_count: files.len(), // All "skipped" in dry run mode
        ..BatchResult::default()
    })
}

/// Count files per upper-case extension, most common first
fn format_breakdown(files: &[DiscoveredFile]) -> Vec<(String, usize)> {
    let mut by_format: HashMap<String, usize> = HashMap::new();
    for file in files {
        let ext = file
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_uppercase();
        *by_format.entry(ext).or_default() += 1;
    }

    let mut formats: Vec<_> = by_format.into_iter().collect();
    formats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    formats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_breakdown_orders_by_count() {
        let file = |name: &str| DiscoveredFile {
            path: PathBuf::from(name),
            format: crate::types::InputFormat::Wav,
            size_bytes: 0,
        };
        let files = vec![file("a.wav"), file("b.flac"), file("c.wav")];
        assert_eq!(
            format_breakdown(&files),
            vec![("WAV".to_string(), 2), ("FLAC".to_string(), 1)]
        );
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("song.wav"), b"x").unwrap();

        let settings = Settings {
            input: input.path().to_path_buf(),
            output: output.path().join("mastered"),
            dry_run: true,
            show_progress: false,
            ..Settings::default()
        };
        let result = run(&settings).unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert!(!output.path().join("mastered").exists());
    }
}
