//! Frame types for the capture pipeline

use std::sync::Arc;

/// Opaque acknowledgment token attached to every frame.
///
/// The producer mints one token per frame and expects it back through
/// [`FrameSource::acknowledge`](crate::FrameSource::acknowledge) once the
/// frame has been safely admitted to the pipeline. The pipeline never
/// interprets the value; it only carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AckToken(u64);

impl AckToken {
    /// Wrap a producer-side identifier.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The producer-side identifier this token wraps.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A single captured screencast frame.
///
/// This is the fundamental data unit that flows through the pipeline.
/// A frame is immutable once constructed: all fields are private and the
/// payload is shared zero-copy via `Arc`, so cloning a frame never copies
/// image bytes.
///
/// Sequence numbers are assigned by the source, start at zero and are
/// strictly increasing within a session. The writer's ordering guarantee
/// is anchored at sequence zero.
#[derive(Debug, Clone)]
pub struct Frame {
    sequence: u64,
    timestamp: f64,
    payload: Arc<[u8]>,
    ack: AckToken,
}

impl Frame {
    /// Create a new frame.
    ///
    /// `timestamp` is in seconds since the start of the capture session.
    pub fn new(sequence: u64, timestamp: f64, payload: Vec<u8>, ack: AckToken) -> Self {
        Self { sequence, timestamp, payload: payload.into(), ack }
    }

    /// Session-local sequence number, starting at zero.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Seconds since session start at which this frame was captured.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// The encoded image bytes. Opaque to the pipeline.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// The acknowledgment token to hand back to the producer.
    pub fn ack_token(&self) -> AckToken {
        self.ack
    }
}
