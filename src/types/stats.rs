//! Capture statistics and the end-of-session summary

use std::sync::Arc;

use serde::Serialize;

use crate::CaptureError;

/// Live counters for a running capture session.
///
/// Published through a watch channel; see
/// [`CaptureSession::stats_updates`](crate::CaptureSession::stats_updates).
/// Values are a consistent snapshot from the drain side, so
/// `frames_captured` may briefly run ahead of `frames_written`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Frames admitted to the queue (and therefore acknowledged).
    pub frames_captured: u64,

    /// Frame records persisted to the sink.
    pub frames_written: u64,

    /// Bytes appended to the sink, length prefixes included.
    pub bytes_written: u64,

    /// Reorder gaps given up on after the reorder timeout.
    pub gaps_skipped: u64,

    /// Frames discarded because they arrived after their gap was skipped.
    pub late_frames_dropped: u64,
}

/// Final report returned by [`CaptureSession::stop`](crate::CaptureSession::stop).
#[derive(Debug, Clone)]
pub struct Summary {
    /// Frame records persisted to the sink.
    pub frame_count: u64,

    /// Bytes appended to the sink, length prefixes included.
    pub bytes_written: u64,

    /// Wall-clock seconds from session start to stop.
    pub duration_seconds: f64,

    /// Reorder gaps skipped during the session.
    pub gaps_skipped: u64,

    /// The failure that terminated the session, if it did not stop cleanly.
    pub failure: Option<Arc<CaptureError>>,
}

impl Summary {
    /// Whether the session ended without a failure.
    pub fn is_clean(&self) -> bool {
        self.failure.is_none()
    }
}
