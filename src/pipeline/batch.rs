//! Batch mastering
//!
//! `run_batch` scans a directory, builds the shared chain(s), then masters
//! every file on a batch-local rayon pool. Per-file failures are recorded
//! against their job and never abort the batch; only the up-front checks
//! (parameters, input directory, output directory) are fatal.

use super::observer::{BatchEvent, BatchObserver, ChannelObserver};
use crate::audio::{self, EncodeOptions};
use crate::chain::{build_chain, MasteringProfile, SignalChain, StageParams};
use crate::discovery::{self, DiscoveredFile};
use crate::error::{ErrorContext, MasterError, Result};
use crate::types::JobStatus;
use crossbeam_channel::Receiver;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default number of concurrent workers
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Name of the file used to probe the output directory for writability
const WRITE_PROBE_NAME: &str = ".audiomaster-write-probe";

// =============================================================================
// Options
// =============================================================================

/// Cooperative cancellation flag, checked before each job starts
///
/// Jobs already running finish normally; jobs never started stay `Pending`
/// and are reported as skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scheduling and selection options for one batch
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads; 0 means one per CPU
    pub concurrency: usize,
    /// Wall-clock limit per file
    pub file_timeout: Option<Duration>,
    /// Accept `.WAV` as well as `.wav`
    pub ignore_case: bool,
    /// File names whose vocal mode is the opposite of the batch setting
    pub vocal_overrides: BTreeSet<String>,
    pub cancel: CancelToken,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            file_timeout: None,
            ignore_case: false,
            vocal_overrides: BTreeSet::new(),
            cancel: CancelToken::new(),
        }
    }
}

impl BatchOptions {
    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        if self.concurrency == 0 {
            num_cpus::get()
        } else {
            self.concurrency
        }
    }
}

// =============================================================================
// Jobs and results
// =============================================================================

/// One file to master
#[derive(Debug)]
pub struct AudioJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub chain: Arc<SignalChain>,
    /// Whether `chain` carries the vocal sub-chain
    pub vocal_mode: bool,
    pub status: JobStatus,
    pub error_detail: Option<String>,
}

impl AudioJob {
    fn new(
        input_path: PathBuf,
        output_path: PathBuf,
        chain: Arc<SignalChain>,
        vocal_mode: bool,
    ) -> Self {
        Self {
            input_path,
            output_path,
            chain,
            vocal_mode,
            status: JobStatus::Pending,
            error_detail: None,
        }
    }

    fn transition(&mut self, next: JobStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal job transition {:?} -> {:?}",
            self.status,
            next
        );
        self.status = next;
    }

    fn fail(&mut self, detail: String) {
        if self.status == JobStatus::Pending {
            self.transition(JobStatus::Running);
        }
        self.transition(JobStatus::Failed);
        self.error_detail = Some(detail);
    }
}

/// Final state of one job, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub status: JobStatus,
    pub vocal_mode: bool,
    pub error_detail: Option<String>,
}

/// A failed file and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub detail: String,
}

/// Batch summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub total_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    /// Jobs never started because the batch was cancelled
    pub skipped_count: usize,
    /// Failures in scan order
    pub per_file_errors: Vec<FileError>,
    /// Every job in scan order
    pub jobs: Vec<JobOutcome>,
}

impl BatchResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed_count == 0 && self.skipped_count == 0
    }
}

/// Shared counters for one batch
///
/// Increment and notify happen under one lock so observers always see
/// strictly increasing `completed` values.
struct BatchRun {
    total_count: usize,
    counters: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    completed: usize,
    failed: usize,
}

impl BatchRun {
    fn new(total_count: usize) -> Self {
        Self {
            total_count,
            counters: Mutex::new(Counters::default()),
        }
    }

    fn record(&self, failed: bool, observer: &dyn BatchObserver) {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        counters.completed += 1;
        if failed {
            counters.failed += 1;
        }
        debug!(
            "Progress {}/{} ({} failed)",
            counters.completed, self.total_count, counters.failed
        );
        observer.on_progress(counters.completed, self.total_count);
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Master every supported file directly inside `input_dir`
///
/// Blocks until every job is terminal (or skipped after cancellation).
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    profile: MasteringProfile,
    params: &StageParams,
    options: &BatchOptions,
    observer: &dyn BatchObserver,
) -> Result<BatchResult> {
    let batch_start = Instant::now();

    // Phase 1: preconditions, all fatal
    let chains = ChainSet::build(profile, params, !options.vocal_overrides.is_empty())?;
    check_input_dir(input_dir)?;
    prepare_output_dir(output_dir)?;

    // Phase 2: discovery
    let files = discovery::scan(input_dir, options.ignore_case)?;
    let mut jobs = plan_jobs(&files, output_dir, params, options, &chains);

    if jobs.is_empty() {
        return Ok(BatchResult::default());
    }

    // Phase 3: processing
    let workers = options.worker_count();
    info!(
        "Mastering {} files with profile '{}' on {} workers",
        jobs.len(),
        profile,
        workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("audiomaster-worker-{}", i))
        .build()
        .map_err(|e| MasterError::ConfigError(format!("Failed to build worker pool: {}", e)))?;

    let run = BatchRun::new(jobs.len());
    let encode_options = EncodeOptions::from(params);

    pool.install(|| {
        jobs.par_iter_mut().for_each(|job| {
            if job.status.is_terminal() {
                // Rejected while planning
                if let Some(ref detail) = job.error_detail {
                    observer.on_file_error(&job.input_path, detail);
                }
                run.record(true, observer);
                return;
            }
            if options.cancel.is_cancelled() {
                return;
            }
            run_job(job, &encode_options, options.file_timeout, observer);
            run.record(job.status == JobStatus::Failed, observer);
        });
    });

    let result = summarize(jobs);

    info!(
        "Batch finished in {:.2}s: {} succeeded, {} failed, {} skipped",
        batch_start.elapsed().as_secs_f64(),
        result.succeeded_count,
        result.failed_count,
        result.skipped_count
    );

    Ok(result)
}

/// Handle to a batch running on a background thread
pub struct BatchHandle {
    events: Receiver<BatchEvent>,
    cancel: CancelToken,
    thread: JoinHandle<Result<BatchResult>>,
}

impl BatchHandle {
    /// Progress events, in the order workers produced them
    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.events
    }

    /// Stop dispatching new jobs; running jobs finish
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the batch to end
    pub fn join(self) -> Result<BatchResult> {
        self.thread.join().unwrap_or_else(|panic| {
            Err(MasterError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("batch thread panicked: {}", panic_message(panic.as_ref())),
            )))
        })
    }
}

/// Run a batch on a background thread
///
/// For callers with their own event loop: poll `events()` or block on
/// `join()`. The handle's cancel token replaces the one in `options`.
pub fn spawn_batch(
    input_dir: PathBuf,
    output_dir: PathBuf,
    profile: MasteringProfile,
    params: StageParams,
    mut options: BatchOptions,
) -> Result<BatchHandle> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let cancel = CancelToken::new();
    options.cancel = cancel.clone();

    let thread = std::thread::Builder::new()
        .name("audiomaster-batch".to_string())
        .spawn(move || {
            let observer = ChannelObserver::new(tx);
            run_batch(&input_dir, &output_dir, profile, &params, &options, &observer)
        })?;

    Ok(BatchHandle {
        events: rx,
        cancel,
        thread,
    })
}

// =============================================================================
// Planning
// =============================================================================

/// The batch chain plus, when per-file overrides exist, its vocal-toggled twin
struct ChainSet {
    base: Arc<SignalChain>,
    toggled: Option<Arc<SignalChain>>,
}

impl ChainSet {
    fn build(profile: MasteringProfile, params: &StageParams, with_toggled: bool) -> Result<Self> {
        let base = Arc::new(build_chain(profile, params)?);
        debug!("Built {}-stage chain for profile '{}'", base.len(), profile);

        let toggled = if with_toggled {
            let mut toggled_params = params.clone();
            toggled_params.vocal_mode = !params.vocal_mode;
            Some(Arc::new(build_chain(profile, &toggled_params)?))
        } else {
            None
        };

        Ok(Self { base, toggled })
    }

    fn for_file(&self, toggled: bool) -> Arc<SignalChain> {
        match (&self.toggled, toggled) {
            (Some(chain), true) => Arc::clone(chain),
            _ => Arc::clone(&self.base),
        }
    }
}

fn plan_jobs(
    files: &[DiscoveredFile],
    output_dir: &Path,
    params: &StageParams,
    options: &BatchOptions,
    chains: &ChainSet,
) -> Vec<AudioJob> {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    files
        .iter()
        .map(|file| {
            let output_path =
                discovery::output_path_for(&file.path, output_dir, params.output_format);
            let toggled = file
                .path
                .file_name()
                .map(|n| options.vocal_overrides.contains(n.to_string_lossy().as_ref()))
                .unwrap_or(false);
            let mut job = AudioJob::new(
                file.path.clone(),
                output_path.clone(),
                chains.for_file(toggled),
                params.vocal_mode != toggled,
            );

            // song.wav and song.flac both map to songMastered.<ext>; the
            // first in scan order keeps the name
            if let Some(owner) = claimed.get(&output_path) {
                let err = MasterError::encode_error(
                    &file.path,
                    format!(
                        "Output {} is already produced from {}",
                        output_path.display(),
                        owner.display()
                    ),
                );
                warn!("{}", err);
                job.fail(err.to_string());
            } else {
                claimed.insert(output_path, file.path.clone());
            }
            job
        })
        .collect()
}

fn check_input_dir(input_dir: &Path) -> Result<()> {
    match std::fs::metadata(input_dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(MasterError::ResourceError {
            path: input_dir.to_path_buf(),
            reason: "Input path is not a directory".to_string(),
        }),
        Err(e) => Err(MasterError::resource_error(input_dir, e)),
    }
}

/// Create the output directory if needed and prove it is writable
fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| MasterError::resource_error(output_dir, e))?;

    let probe = output_dir.join(WRITE_PROBE_NAME);
    std::fs::write(&probe, b"").map_err(|e| MasterError::resource_error(output_dir, e))?;
    if let Err(e) = std::fs::remove_file(&probe) {
        debug!("Could not remove write probe {}: {}", probe.display(), e);
    }
    Ok(())
}

// =============================================================================
// Per-file work
// =============================================================================

fn run_job(
    job: &mut AudioJob,
    encode_options: &EncodeOptions,
    timeout: Option<Duration>,
    observer: &dyn BatchObserver,
) {
    job.transition(JobStatus::Running);
    observer.on_file_started(&job.input_path);
    debug!("Mastering: {}", job.input_path.display());

    let deadline = timeout.map(|limit| (Instant::now() + limit, limit.as_secs()));
    let started = Instant::now();

    let result = catch_unwind(AssertUnwindSafe(|| {
        master_file(
            &job.input_path,
            &job.output_path,
            &job.chain,
            encode_options,
            deadline,
            observer,
        )
    }))
    .unwrap_or_else(|panic| {
        Err(MasterError::stage(
            "worker",
            format!("panicked: {}", panic_message(panic.as_ref())),
        ))
    })
    .with_file_context(&job.input_path);

    match result {
        Ok(()) => {
            job.transition(JobStatus::Succeeded);
            debug!(
                "Mastered {} -> {} in {:.2}s",
                job.input_path.display(),
                job.output_path.display(),
                started.elapsed().as_secs_f64()
            );
        }
        Err(e) => {
            let detail = e.to_string();
            warn!("Failed {}: {}", job.input_path.display(), detail);
            observer.on_file_error(&job.input_path, &detail);
            job.fail(detail);
        }
    }
}

/// Decode, run the chain, encode, write
fn master_file(
    input: &Path,
    output: &Path,
    chain: &SignalChain,
    encode_options: &EncodeOptions,
    deadline: Option<(Instant, u64)>,
    observer: &dyn BatchObserver,
) -> Result<()> {
    let check = || match deadline {
        Some((at, limit_secs)) if Instant::now() >= at => Err(MasterError::Timeout {
            path: input.to_path_buf(),
            limit_secs,
        }),
        _ => Ok(()),
    };

    let mut buffer = audio::decode_with(input, &mut || check())?;

    chain.run(&mut buffer, |index, count, stage| {
        check()?;
        observer.on_stage_progress(input, index, count, stage.name());
        Ok(())
    })?;

    check()?;
    audio::write_output(&buffer, output, encode_options)
}

fn summarize(jobs: Vec<AudioJob>) -> BatchResult {
    let mut result = BatchResult {
        total_count: jobs.len(),
        ..BatchResult::default()
    };

    for job in jobs {
        match job.status {
            JobStatus::Succeeded => result.succeeded_count += 1,
            JobStatus::Failed => {
                result.failed_count += 1;
                result.per_file_errors.push(FileError {
                    path: job.input_path.clone(),
                    detail: job.error_detail.clone().unwrap_or_default(),
                });
            }
            JobStatus::Pending | JobStatus::Running => result.skipped_count += 1,
        }

        result.jobs.push(JobOutcome {
            input_path: job.input_path,
            output_path: job.output_path,
            status: job.status,
            vocal_mode: job.vocal_mode,
            error_detail: job.error_detail,
        });
    }

    result
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::scan;
    use std::fs;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_worker_count_zero_means_cpus() {
        let options = BatchOptions {
            concurrency: 0,
            ..BatchOptions::default()
        };
        assert_eq!(options.worker_count(), num_cpus::get());
        assert_eq!(BatchOptions::default().worker_count(), DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_colliding_outputs_fail_later_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("song.flac"), b"x").unwrap();
        fs::write(dir.path().join("song.wav"), b"x").unwrap();
        let files = scan(dir.path(), false).unwrap();

        let params = StageParams::default();
        let chains = ChainSet::build(MasteringProfile::Default, &params, false).unwrap();
        let jobs = plan_jobs(&files, dir.path(), &params, &BatchOptions::default(), &chains);

        assert_eq!(jobs[0].status, JobStatus::Pending);
        assert_eq!(jobs[1].status, JobStatus::Failed);
        assert!(jobs[1].error_detail.as_deref().unwrap().contains("song.flac"));
    }

    #[test]
    fn test_vocal_override_uses_second_chain() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.wav"), b"x").unwrap();
        fs::write(dir.path().join("b.wav"), b"x").unwrap();
        let files = scan(dir.path(), false).unwrap();

        let params = StageParams::default();
        let options = BatchOptions {
            vocal_overrides: ["b.wav".to_string()].into_iter().collect(),
            ..BatchOptions::default()
        };
        let chains = ChainSet::build(MasteringProfile::Rock, &params, true).unwrap();
        let jobs = plan_jobs(&files, dir.path(), &params, &options, &chains);

        assert!(!jobs[0].vocal_mode);
        assert!(jobs[1].vocal_mode);
        assert!(jobs[1].chain.len() > jobs[0].chain.len());
        assert!(!Arc::ptr_eq(&jobs[0].chain, &jobs[1].chain));
    }

    #[test]
    fn test_summary_counts_pending_as_skipped() {
        let chain = Arc::new(build_chain(MasteringProfile::Default, &StageParams::default()).unwrap());
        let mut done = AudioJob::new("a.wav".into(), "aMastered.wav".into(), Arc::clone(&chain), false);
        done.transition(JobStatus::Running);
        done.transition(JobStatus::Succeeded);
        let mut failed = AudioJob::new("b.wav".into(), "bMastered.wav".into(), Arc::clone(&chain), false);
        failed.fail("bad header".to_string());
        let pending = AudioJob::new("c.wav".into(), "cMastered.wav".into(), chain, false);

        let result = summarize(vec![done, failed, pending]);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.succeeded_count, 1);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.per_file_errors[0].path, PathBuf::from("b.wav"));
        assert!(!result.is_complete_success());
    }

    #[test]
    fn test_output_probe_rejects_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            prepare_output_dir(&file),
            Err(MasterError::ResourceError { .. })
        ));
    }

    #[test]
    fn test_invalid_params_fail_before_io() {
        let mut params = StageParams::default();
        params.multiband.enabled = true;
        params.multiband.crossover_low_hz = 5000.0;
        params.multiband.crossover_high_hz = 200.0;

        let err = run_batch(
            Path::new("/no/such/input"),
            Path::new("/no/such/output"),
            MasteringProfile::Custom,
            &params,
            &BatchOptions::default(),
            &super::super::observer::NoopObserver,
        )
        .unwrap_err();
        assert!(matches!(err, MasterError::InvalidParameters(_)));
    }
}
