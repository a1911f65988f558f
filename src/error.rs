//! Error types for the capture pipeline.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The taxonomy mirrors the pipeline's failure surfaces:
//!
//! - **QueueClosed**: a frame was offered to a queue that no longer admits
//!   frames - a caller bug, never retried internally
//! - **Write / File**: sink or filesystem I/O failures - fatal for the
//!   session that owns the sink
//! - **InvalidState**: an operation was issued in a state that does not
//!   permit it (for example a second `stop()`)
//! - **SourceDisconnected**: the frame source ended without a stop
//!   handshake
//! - **DrainTimeout**: a stop request could not drain the queue in time
//! - **Corrupt**: a reel file or frame record failed validation
//! - **Config**: a configuration was rejected before the session started
//!
//! Gap skips are intentionally *not* errors: they are recovered locally,
//! counted in [`CaptureStats`](crate::CaptureStats) and reported through
//! the session summary.
//!
//! ## Retry Classification
//!
//! ```rust
//! use kinescope::CaptureError;
//!
//! let error = CaptureError::source_disconnected("websocket closed");
//! assert!(error.is_retryable());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::SessionState;

/// Result type alias for capture operations.
pub type Result<T, E = CaptureError> = std::result::Result<T, E>;

/// Main error type for capture operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("frame queue is closed")]
    QueueClosed,

    #[error("sink write failed: {context}")]
    Write {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation '{operation}' is invalid while the session is {state}")]
    InvalidState { operation: String, state: SessionState },

    #[error("frame source disconnected: {reason}")]
    SourceDisconnected {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("drain did not complete within {duration:?} ({frames_flushed} frames flushed)")]
    DrainTimeout { duration: Duration, frames_flushed: u64 },

    #[error("corrupt data in {context}: {details}")]
    Corrupt { context: String, details: String },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl CaptureError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Only source-side failures are retryable, by starting a fresh session
    /// once the producer is reachable again. Everything else is either a
    /// caller bug or a sink failure that a blind retry would repeat.
    pub fn is_retryable(&self) -> bool {
        match self {
            CaptureError::SourceDisconnected { .. } => true,
            CaptureError::QueueClosed => false,
            CaptureError::Write { .. } => false,
            CaptureError::File { .. } => false,
            CaptureError::InvalidState { .. } => false,
            CaptureError::DrainTimeout { .. } => false,
            CaptureError::Corrupt { .. } => false,
            CaptureError::Config { .. } => false,
        }
    }

    /// Helper constructor for sink write errors with context.
    pub fn write(context: impl Into<String>, source: std::io::Error) -> Self {
        CaptureError::Write { context: context.into(), source }
    }

    /// Helper constructor for file errors with path context.
    pub fn file(path: PathBuf, source: std::io::Error) -> Self {
        CaptureError::File { path, source }
    }

    /// Helper constructor for invalid-state errors.
    pub fn invalid_state(operation: impl Into<String>, state: SessionState) -> Self {
        CaptureError::InvalidState { operation: operation.into(), state }
    }

    /// Helper constructor for source disconnections.
    pub fn source_disconnected(reason: impl Into<String>) -> Self {
        CaptureError::SourceDisconnected { reason: reason.into(), source: None }
    }

    /// Helper constructor for source disconnections with an underlying cause.
    pub fn source_disconnected_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        CaptureError::SourceDisconnected { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for drain timeouts.
    pub fn drain_timeout(duration: Duration, frames_flushed: u64) -> Self {
        CaptureError::DrainTimeout { duration, frames_flushed }
    }

    /// Helper constructor for corrupt-data errors.
    pub fn corrupt(context: impl Into<String>, details: impl Into<String>) -> Self {
        CaptureError::Corrupt { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        CaptureError::Config { reason: reason.into() }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Write { context: "i/o".to_string(), source: err }
    }
}
