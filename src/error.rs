//! Unified error types for audiomaster
//!
//! Error strategy:
//! - Chain construction errors (invalid parameters): Fatal, surfaced before any job runs
//! - Per-file errors (decode, stage, encode, timeout): Recoverable, record and continue
//! - System errors (missing input, unwritable output): Fatal, abort batch
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Input formats recognised by the scanner, for helpful error messages
pub const SUPPORTED_FORMATS: &str = "WAV, MP3, AAC, OGG, FLAC";

/// Top-level error type for audiomaster operations
#[derive(Debug, Error)]
pub enum MasterError {
    // =========================================================================
    // Chain construction - fatal to the build call
    // =========================================================================
    #[error("Invalid mastering parameters: {0}")]
    InvalidParameters(String),

    // =========================================================================
    // Recoverable errors - record against the file, continue batch
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}\n  Tip: If the file plays in other apps, it may be corrupted or use an unsupported codec")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("Failed to encode '{path}': {reason}")]
    EncodeError { path: PathBuf, reason: String },

    #[error("Stage '{stage}' failed for '{path}': {reason}")]
    StageExecutionError {
        path: PathBuf,
        stage: String,
        reason: String,
    },

    #[error("Processing '{path}' exceeded the {limit_secs}s time limit\n  Tip: Raise --timeout or check the file is not malformed")]
    Timeout { path: PathBuf, limit_secs: u64 },

    // =========================================================================
    // Fatal errors - abort entire batch
    // =========================================================================
    #[error("Cannot use '{path}': {reason}")]
    ResourceError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for audiomaster operations
pub type Result<T> = std::result::Result<T, MasterError>;

impl MasterError {
    /// Returns true if this error is contained to one file (record it, continue batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MasterError::DecodeError { .. }
                | MasterError::UnsupportedFormat { .. }
                | MasterError::EncodeError { .. }
                | MasterError::StageExecutionError { .. }
                | MasterError::Timeout { .. }
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MasterError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an encode error with context about the issue
    pub fn encode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MasterError::EncodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Stage failure raised inside the interpreter, before the file is known
    pub fn stage(stage: &str, reason: impl Into<String>) -> Self {
        MasterError::StageExecutionError {
            path: PathBuf::new(),
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-parameter error
    pub fn invalid(reason: impl Into<String>) -> Self {
        MasterError::InvalidParameters(reason.into())
    }

    /// Create a resource error, checking for common issues
    pub fn resource_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!("Directory does not exist: {}", path.display())
            }
            _ => err.to_string(),
        };
        MasterError::ResourceError { path, reason }
    }

    /// Create an encode error for an output format whose encoder was not compiled in
    pub fn encoder_feature_disabled(path: impl Into<PathBuf>, feature: &str) -> Self {
        MasterError::EncodeError {
            path: path.into(),
            reason: format!(
                "{} output is not compiled in\n  Tip: rebuild with --features {}",
                feature.to_uppercase(),
                feature
            ),
        }
    }
}

/// Extension trait for adding file context to errors raised before the path was known
pub trait ErrorContext<T> {
    /// Attach the file being processed to a per-file error
    fn with_file_context(self, path: &std::path::Path) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn with_file_context(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| match e {
            MasterError::StageExecutionError { stage, reason, .. } => {
                MasterError::StageExecutionError {
                    path: path.to_path_buf(),
                    stage,
                    reason,
                }
            }
            MasterError::DecodeError { reason, .. } => MasterError::DecodeError {
                path: path.to_path_buf(),
                reason,
            },
            MasterError::EncodeError { reason, .. } => MasterError::EncodeError {
                path: path.to_path_buf(),
                reason,
            },
            MasterError::Timeout { limit_secs, .. } => MasterError::Timeout {
                path: path.to_path_buf(),
                limit_secs,
            },
            other => other,
        })
    }
}
