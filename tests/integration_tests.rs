//! Integration tests for the audiomaster pipeline
//!
//! These tests master generated WAV fixtures end-to-end and check counts,
//! file naming and output bytes.

use audiomaster::chain::{MasteringProfile, StageParams};
use audiomaster::config::Settings;
use audiomaster::error::MasterError;
use audiomaster::pipeline::{
    self, run_batch, spawn_batch, BatchEvent, BatchOptions, CancelToken, FnObserver, NoopObserver,
};
use audiomaster::types::JobStatus;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Generate a sine wave WAV file for testing
///
/// Creates a 16-bit WAV with the tone on every channel.
fn generate_sine_wav(
    path: &Path,
    frequency_hz: f32,
    duration_secs: f32,
    sample_rate: u32,
    channels: u16,
) {
    use std::f32::consts::PI;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");

    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let amplitude = 0.5f32; // 50% amplitude to avoid clipping

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let sample = (2.0 * PI * frequency_hz * t).sin() * amplitude;
        let sample_i16 = (sample * 32767.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample_i16).expect("Failed to write sample");
        }
    }

    writer.finalize().expect("Failed to finalize WAV");
}

/// Write a file with a supported extension that no decoder accepts
fn write_corrupt(path: &Path) {
    fs::write(path, b"RIFF\x00\x00\x00\x00WAVEjunkjunkjunk").expect("Failed to write corrupt file");
}

/// Options with a fixed worker count
fn options(concurrency: usize) -> BatchOptions {
    BatchOptions {
        concurrency,
        ..BatchOptions::default()
    }
}

/// Read every file in a directory into name -> bytes
fn read_outputs(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .expect("Failed to read output dir")
        .map(|e| e.expect("Bad dir entry").path())
        .map(|p| {
            (
                p.file_name().unwrap().to_string_lossy().into_owned(),
                fs::read(&p).expect("Failed to read output"),
            )
        })
        .collect()
}

/// A handful of short, different tones
fn populate(input: &Path, count: usize) {
    for i in 0..count {
        let path = input.join(format!("tone_{}.wav", i));
        generate_sine_wav(&path, 220.0 * (i + 1) as f32, 1.0, 44100, 2);
    }
}

#[test]
fn test_mixed_directory_masters_only_audio() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let output_dir = TempDir::new().expect("Failed to create output temp dir");

    generate_sine_wav(&input_dir.path().join("song.wav"), 440.0, 1.0, 44100, 2);
    // symphonia probes by content, so a WAV payload behind a .flac name decodes
    generate_sine_wav(&input_dir.path().join("track.flac"), 330.0, 1.0, 48000, 1);
    fs::write(input_dir.path().join("notes.txt"), "mix notes").unwrap();

    let result = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &options(2),
        &NoopObserver,
    )
    .expect("Batch should run");

    assert_eq!(result.total_count, 2, "notes.txt must be ignored");
    assert_eq!(result.succeeded_count, 2);
    assert_eq!(result.failed_count, 0);

    let outputs = read_outputs(output_dir.path());
    let names: Vec<_> = outputs.keys().cloned().collect();
    assert_eq!(names, vec!["songMastered.wav", "trackMastered.wav"]);
}

#[test]
fn test_output_format_and_ceiling() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    // Hot mono input at 44.1 kHz
    generate_sine_wav(&input_dir.path().join("hot.wav"), 100.0, 1.0, 44100, 1);

    let params = StageParams {
        volume_adjust_db: 12.0,
        bass_boost_enabled: true,
        ..StageParams::default()
    };
    let result = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Rock,
        &params,
        &options(1),
        &NoopObserver,
    )
    .unwrap();
    assert_eq!(result.succeeded_count, 1);

    let reader = hound::WavReader::open(output_dir.path().join("hotMastered.wav")).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.bits_per_sample, 24);

    let full_scale = 8_388_607.0f32;
    let peak = reader
        .into_samples::<i32>()
        .map(|s| s.unwrap().unsigned_abs() as f32 / full_scale)
        .fold(0.0f32, f32::max);
    assert!(peak <= 0.95 + 1e-5, "peak {} above limiter ceiling", peak);
    assert!(peak > 0.1, "output should not be silent");
}

#[test]
fn test_corrupt_files_are_counted_not_fatal() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 3);
    write_corrupt(&input_dir.path().join("broken_a.wav"));
    write_corrupt(&input_dir.path().join("broken_b.mp3"));

    let errors = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let errors_cb = std::sync::Arc::clone(&errors);
    let observer = FnObserver::new(|_, _| {}).with_errors(move |path, _| {
        errors_cb.lock().unwrap().push(path.to_path_buf());
    });

    let result = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &options(4),
        &observer,
    )
    .expect("Corrupt inputs must not abort the batch");

    assert_eq!(result.total_count, 5);
    assert_eq!(result.succeeded_count, 3);
    assert_eq!(result.failed_count, 2);

    let failed: Vec<_> = result
        .per_file_errors
        .iter()
        .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(failed, vec!["broken_a.wav", "broken_b.mp3"]);
    assert_eq!(errors.lock().unwrap().len(), 2);

    for job in &result.jobs {
        assert!(job.status.is_terminal());
        assert_eq!(job.error_detail.is_some(), job.status == JobStatus::Failed);
    }
}

#[test]
fn test_concurrency_does_not_change_output() {
    let input_dir = TempDir::new().unwrap();
    let serial_dir = TempDir::new().unwrap();
    let parallel_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 4);

    let params = StageParams {
        vocal_mode: true,
        reverb: audiomaster::chain::ReverbParams {
            enabled: true,
            ..Default::default()
        },
        ..StageParams::default()
    };

    for (dir, concurrency) in [(&serial_dir, 1), (&parallel_dir, 4)] {
        let result = run_batch(
            input_dir.path(),
            dir.path(),
            MasteringProfile::SynthVocals,
            &params,
            &options(concurrency),
            &NoopObserver,
        )
        .unwrap();
        assert_eq!(result.succeeded_count, 4);
    }

    assert_eq!(
        read_outputs(serial_dir.path()),
        read_outputs(parallel_dir.path())
    );
}

#[test]
fn test_rerun_overwrites_with_identical_bytes() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 2);

    let mut params = StageParams::default();
    params.multiband.enabled = true;

    let run = || {
        run_batch(
            input_dir.path(),
            output_dir.path(),
            MasteringProfile::Custom,
            &params,
            &options(2),
            &NoopObserver,
        )
        .unwrap()
    };

    run();
    let first = read_outputs(output_dir.path());
    run();
    let second = read_outputs(output_dir.path());

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[test]
fn test_cancel_before_start_skips_everything() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 3);

    let cancel = CancelToken::new();
    cancel.cancel();
    let opts = BatchOptions {
        cancel,
        ..options(2)
    };

    let result = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &opts,
        &NoopObserver,
    )
    .unwrap();

    assert_eq!(result.total_count, 3);
    assert_eq!(result.skipped_count, 3);
    assert_eq!(result.succeeded_count + result.failed_count, 0);
    assert!(read_outputs(output_dir.path()).is_empty());
    assert!(result.jobs.iter().all(|j| j.status == JobStatus::Pending));
}

#[test]
fn test_cancel_mid_batch_finishes_in_flight_job() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 4);

    let opts = options(1);
    let token = opts.cancel.clone();
    let observer = FnObserver::new(move |completed, _| {
        if completed >= 1 {
            token.cancel();
        }
    });

    let result = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Piano,
        &StageParams::default(),
        &opts,
        &observer,
    )
    .unwrap();

    assert_eq!(result.succeeded_count, 1);
    assert_eq!(result.skipped_count, 3);
    assert_eq!(read_outputs(output_dir.path()).len(), 1);
}

#[test]
fn test_missing_input_is_resource_error() {
    let output_dir = TempDir::new().unwrap();
    let err = run_batch(
        &output_dir.path().join("does-not-exist"),
        output_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &options(1),
        &NoopObserver,
    )
    .unwrap_err();

    assert!(matches!(err, MasterError::ResourceError { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn test_unusable_output_is_resource_error() {
    let input_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 1);
    // A regular file where the output directory should be
    let blocker = input_dir.path().join("blocker");
    fs::write(&blocker, b"x").unwrap();

    let err = run_batch(
        input_dir.path(),
        &blocker,
        MasteringProfile::Default,
        &StageParams::default(),
        &options(1),
        &NoopObserver,
    )
    .unwrap_err();

    assert!(matches!(err, MasterError::ResourceError { .. }));
}

#[test]
fn test_invalid_crossover_rejected_before_any_work() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 1);

    let mut params = StageParams::default();
    params.multiband.crossover_low_hz = 5000.0;
    params.multiband.crossover_high_hz = 200.0;

    let err = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Custom,
        &params,
        &options(1),
        &NoopObserver,
    )
    .unwrap_err();

    assert!(matches!(err, MasterError::InvalidParameters(_)));
    assert!(read_outputs(output_dir.path()).is_empty());
}

#[test]
fn test_empty_directory() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    fs::write(input_dir.path().join("readme.md"), "nothing here").unwrap();

    let result = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &options(4),
        &NoopObserver,
    )
    .unwrap();

    assert_eq!(result.total_count, 0);
    assert!(result.is_complete_success());
}

#[test]
fn test_zero_timeout_fails_every_file() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 2);

    let opts = BatchOptions {
        file_timeout: Some(Duration::ZERO),
        ..options(2)
    };
    let result = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &opts,
        &NoopObserver,
    )
    .unwrap();

    assert_eq!(result.failed_count, 2);
    for failure in &result.per_file_errors {
        assert!(failure.detail.contains("time limit"), "{}", failure.detail);
    }
}

#[test]
fn test_uppercase_extension_needs_ignore_case() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    generate_sine_wav(&input_dir.path().join("LOUD.WAV"), 440.0, 1.0, 44100, 2);

    let strict = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &options(1),
        &NoopObserver,
    )
    .unwrap();
    assert_eq!(strict.total_count, 0);

    let relaxed = run_batch(
        input_dir.path(),
        output_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &BatchOptions {
            ignore_case: true,
            ..options(1)
        },
        &NoopObserver,
    )
    .unwrap();
    assert_eq!(relaxed.succeeded_count, 1);
    assert!(output_dir.path().join("LOUDMastered.wav").exists());
}

#[test]
fn test_spawn_batch_streams_events() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 2);

    let handle = spawn_batch(
        input_dir.path().to_path_buf(),
        output_dir.path().to_path_buf(),
        MasteringProfile::Synth,
        StageParams::default(),
        options(2),
    )
    .unwrap();

    let events = handle.events().clone();
    let result = handle.join().unwrap();
    assert_eq!(result.succeeded_count, 2);

    let events: Vec<_> = events.try_iter().collect();
    assert!(events.contains(&BatchEvent::Progress {
        completed: 2,
        total: 2
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, BatchEvent::Stage { stage, .. } if stage == "limiter")));
}

#[test]
fn test_pipeline_run_writes_report() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 1);
    write_corrupt(&input_dir.path().join("zz_broken.wav"));
    let report_path = output_dir.path().join("report.json");

    let settings = Settings {
        input: input_dir.path().to_path_buf(),
        output: output_dir.path().join("mastered"),
        report: Some(report_path.clone()),
        show_progress: false, // Disable progress bars in tests
        ..Settings::default()
    };
    let result = pipeline::run(&settings).expect("Pipeline should succeed");
    assert_eq!(result.succeeded_count, 1);
    assert_eq!(result.failed_count, 1);

    let report = audiomaster::export::read_report(&report_path).unwrap();
    assert_eq!(report.totals.total, 2);
    assert_eq!(report.totals.failed, 1);
    assert_eq!(report.jobs.len(), 2);
    assert_eq!(report.jobs[1].status, JobStatus::Failed);
    assert!(report.jobs[1].error.is_some());
    assert!(report.jobs[0].output.ends_with("tone_0Mastered.wav"));
}

#[test]
fn test_vocal_override_changes_only_that_file() {
    let input_dir = TempDir::new().unwrap();
    let plain_dir = TempDir::new().unwrap();
    let override_dir = TempDir::new().unwrap();
    populate(input_dir.path(), 2);

    run_batch(
        input_dir.path(),
        plain_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &options(2),
        &NoopObserver,
    )
    .unwrap();

    let opts = BatchOptions {
        vocal_overrides: ["tone_1.wav".to_string()].into_iter().collect(),
        ..options(2)
    };
    let result = run_batch(
        input_dir.path(),
        override_dir.path(),
        MasteringProfile::Default,
        &StageParams::default(),
        &opts,
        &NoopObserver,
    )
    .unwrap();
    assert!(result.jobs[1].vocal_mode);

    let plain = read_outputs(plain_dir.path());
    let overridden = read_outputs(override_dir.path());
    assert_eq!(plain["tone_0Mastered.wav"], overridden["tone_0Mastered.wav"]);
    assert_ne!(plain["tone_1Mastered.wav"], overridden["tone_1Mastered.wav"]);
}
