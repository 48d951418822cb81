//! Batch processing
//!
//! - `batch`: the engine (`run_batch`, `spawn_batch`)
//! - `observer`: progress sinks
//! - `orchestrator`: the CLI run built on top

pub mod batch;
pub mod observer;
pub mod orchestrator;

pub use batch::{
    run_batch, spawn_batch, AudioJob, BatchHandle, BatchOptions, BatchResult, CancelToken,
    FileError, JobOutcome, DEFAULT_CONCURRENCY,
};
pub use observer::{
    BatchEvent, BatchObserver, ChannelObserver, FnObserver, NoopObserver, ProgressBarObserver,
};
pub use orchestrator::run;
