//! Batch progress sinks
//!
//! The pipeline reports through `BatchObserver` and never asks it for
//! decisions. Implementations must be `Send + Sync`: callbacks fire from
//! worker threads.

use crossbeam_channel::Sender;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// Receives batch progress notifications
pub trait BatchObserver: Send + Sync {
    /// A job finished (either way); `completed` counts terminal jobs
    fn on_progress(&self, completed: usize, total: usize);

    /// A job failed with the given detail
    fn on_file_error(&self, path: &Path, detail: &str);

    /// A worker picked up a job
    fn on_file_started(&self, _path: &Path) {}

    /// A stage is about to run on a file
    fn on_stage_progress(&self, _path: &Path, _stage_index: usize, _stage_count: usize, _stage: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn on_progress(&self, _completed: usize, _total: usize) {}
    fn on_file_error(&self, _path: &Path, _detail: &str) {}
}

type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&Path, &str) + Send + Sync>;

/// Closure adaptor for callers that only want the two core callbacks
pub struct FnObserver {
    progress: ProgressFn,
    error: Option<ErrorFn>,
}

impl FnObserver {
    pub fn new(on_progress: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        Self {
            progress: Box::new(on_progress),
            error: None,
        }
    }

    pub fn with_errors(mut self, on_error: impl Fn(&Path, &str) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(on_error));
        self
    }
}

impl BatchObserver for FnObserver {
    fn on_progress(&self, completed: usize, total: usize) {
        (self.progress)(completed, total);
    }

    fn on_file_error(&self, path: &Path, detail: &str) {
        if let Some(ref error) = self.error {
            error(path, detail);
        }
    }
}

/// Terminal progress bar used by the CLI
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl BatchObserver for ProgressBarObserver {
    fn on_progress(&self, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
    }

    fn on_file_error(&self, path: &Path, detail: &str) {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        self.bar.println(format!("✗ {}: {}", name, detail));
    }

    fn on_file_started(&self, path: &Path) {
        self.bar
            .set_message(path.file_name().unwrap_or_default().to_string_lossy().into_owned());
    }
}

/// Event stream emitted by `ChannelObserver`
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    FileStarted {
        path: PathBuf,
    },
    Stage {
        path: PathBuf,
        index: usize,
        count: usize,
        stage: String,
    },
    FileError {
        path: PathBuf,
        detail: String,
    },
    Progress {
        completed: usize,
        total: usize,
    },
}

/// Forwards notifications into a channel, for callers on another thread
///
/// Send failures are ignored: a caller that dropped the receiver simply
/// stops listening.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<BatchEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<BatchEvent>) -> Self {
        Self { tx }
    }
}

impl BatchObserver for ChannelObserver {
    fn on_progress(&self, completed: usize, total: usize) {
        let _ = self.tx.send(BatchEvent::Progress { completed, total });
    }

    fn on_file_error(&self, path: &Path, detail: &str) {
        let _ = self.tx.send(BatchEvent::FileError {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        });
    }

    fn on_file_started(&self, path: &Path) {
        let _ = self.tx.send(BatchEvent::FileStarted {
            path: path.to_path_buf(),
        });
    }

    fn on_stage_progress(&self, path: &Path, stage_index: usize, stage_count: usize, stage: &str) {
        let _ = self.tx.send(BatchEvent::Stage {
            path: path.to_path_buf(),
            index: stage_index,
            count: stage_count,
            stage: stage.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fn_observer_forwards() {
        let seen = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        let errors_cb = Arc::clone(&errors);
        let observer = FnObserver::new(move |completed, _| {
            seen_cb.store(completed, Ordering::SeqCst);
        })
        .with_errors(move |_, _| {
            errors_cb.fetch_add(1, Ordering::SeqCst);
        });

        observer.on_progress(3, 5);
        observer.on_file_error(Path::new("x.wav"), "bad");
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_observer_events() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let observer = ChannelObserver::new(tx);
        observer.on_file_started(Path::new("a.wav"));
        observer.on_progress(1, 2);
        drop(observer);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                BatchEvent::FileStarted {
                    path: PathBuf::from("a.wav")
                },
                BatchEvent::Progress {
                    completed: 1,
                    total: 2
                },
            ]
        );
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        ChannelObserver::new(tx).on_progress(1, 1);
    }
}
