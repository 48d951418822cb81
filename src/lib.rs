//! audiomaster - Batch Audio Mastering Engine
//!
//! Masters directories of audio files through a profile-driven, in-process
//! signal chain: band limiting, denoise, EQ, compression, optional
//! multiband/reverb/vocal stages, loudness normalisation and a final limiter.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: Input scanning and output naming
//! - `audio`: Decoding (symphonia) and encoding (hound, FLAC, LAME)
//! - `chain`: Profiles, parameters and the `build_chain` stage compiler
//! - `dsp`: The stage interpreter and its processors
//! - `pipeline`: Bounded-concurrency batch processing
//! - `export`: JSON run reports
//!
//! # Example
//!
//! ```no_run
//! use audiomaster::chain::{MasteringProfile, StageParams};
//! use audiomaster::pipeline::{run_batch, BatchOptions, NoopObserver};
//! use std::path::Path;
//!
//! let result = run_batch(
//!     Path::new("./mixes"),
//!     Path::new("./mastered"),
//!     MasteringProfile::Default,
//!     &StageParams::default(),
//!     &BatchOptions::default(),
//!     &NoopObserver,
//! )
//! .expect("Batch failed");
//! println!("Mastered {} of {} files", result.succeeded_count, result.total_count);
//! ```

pub mod audio;
pub mod chain;
pub mod config;
pub mod discovery;
pub mod dsp;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod types;

// Re-export key types at crate root
pub use chain::{build_chain, MasteringProfile, SignalChain, StageDescriptor, StageParams};
pub use error::{MasterError, Result};
pub use pipeline::{run_batch, BatchResult};
pub use types::{AudioBuffer, JobStatus, OutputFormat};
