//! FrameSource trait for screencast producers

use crate::Result;
use crate::types::{AckToken, Frame, StreamConfig};

/// Trait for screencast frame producers.
///
/// Sources abstract over where frames come from (a browser debugging
/// session, a recorded reel, a test script) behind a pull-style
/// interface. Implementations own their transport and timing; the
/// pipeline only pulls.
///
/// Sequence numbers must start at zero and increase strictly within one
/// stream. The pipeline's ordering guarantee is anchored there: a source
/// that numbers from anywhere else converges only after a gap skip.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Ask the producer to begin streaming frames.
    ///
    /// Called exactly once, before the first `next_frame`.
    async fn start_stream(&mut self, config: &StreamConfig) -> Result<()>;

    /// Get the next frame.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - new frame available
    /// - `Ok(None)` - stream ended; only expected after `stop_stream`,
    ///   anything earlier is treated as a disconnection
    /// - `Err(e)` - source-side failure
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Confirm receipt of a frame to the producer.
    ///
    /// The session calls this strictly after the frame has been admitted
    /// to the queue - never before. Producers use the outstanding-ack
    /// window to pace themselves, so delaying this call *is* the
    /// backpressure signal.
    async fn acknowledge(&mut self, token: AckToken) -> Result<()>;

    /// Ask the producer to stop streaming.
    ///
    /// Frames already in flight may still be returned by `next_frame`
    /// before it yields `Ok(None)`.
    async fn stop_stream(&mut self) -> Result<()>;
}
