//! Backpressure-aware capture pipeline for screencast frame streams.
//!
//! Kinescope sits between a frame producer - typically a browser
//! debugging session casting its tab - and a durable byte sink, and
//! guarantees what naive event-handler recording silently does not:
//!
//! - **Backpressure**: frames are admitted through a bounded queue; a
//!   full queue suspends the producer side and delays acknowledgment,
//!   which is exactly the signal screencast protocols pace themselves on
//! - **Ordering**: records land in strict frame-sequence order, with a
//!   reorder buffer and a bounded gap timeout instead of silent shuffles
//! - **Durability**: frames are acknowledged only after they are safely
//!   queued, and the sink is flushed and closed on every exit path
//!
//! Output is a "reel": a flat file of length-prefixed frame records that
//! [`reel::ReelReader`] reads back and [`ReelReplaySource`] can replay.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kinescope::{CaptureConfig, ChannelSource, Kinescope, ScreencastEvent, SourceControl};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> kinescope::Result<()> {
//!     // The browser client feeds screencast events in and executes
//!     // start/ack/stop commands coming back.
//!     let (event_tx, event_rx) = mpsc::channel::<ScreencastEvent>(16);
//!     let (control_tx, control_rx) = mpsc::unbounded_channel::<SourceControl>();
//!     let source = ChannelSource::new(event_rx, control_tx);
//!     # let _ = (event_tx, control_rx);
//!
//!     let mut session =
//!         Kinescope::capture(source, "tab-capture.reel", CaptureConfig::default()).await?;
//!
//!     // ... capture runs; stop when done and inspect the summary.
//!     let summary = session.stop().await?;
//!     println!("captured {} frames in {:.1}s", summary.frame_count, summary.duration_seconds);
//!     Ok(())
//! }
//! ```
//!
//! Replaying a recorded reel works through the same pipeline:
//!
//! ```rust,no_run
//! use kinescope::{CaptureConfig, Kinescope, ReelReplaySource};
//!
//! # async fn replay() -> kinescope::Result<()> {
//! let source = ReelReplaySource::open("tab-capture.reel")?;
//! let session = Kinescope::capture(source, "copy.reel", CaptureConfig::default()).await?;
//! # let _ = session;
//! # Ok(())
//! # }
//! ```

// Core types and error handling
mod error;
pub mod types;

#[cfg(test)]
pub mod test_utils;

// Pipeline components
pub mod queue;
pub mod session;
pub mod sink;
pub mod sinks;
pub mod source;
pub mod sources;
pub mod writer;

// Output format and observation utilities
pub mod reel;
pub mod stream;

// Core exports
pub use error::{CaptureError, Result};
pub use types::*;

// Pipeline exports
pub use queue::FrameQueue;
pub use session::CaptureSession;
pub use sink::Sink;
pub use sinks::{FileSink, MemorySink};
pub use source::FrameSource;
pub use sources::{ChannelSource, ReelReplaySource, ScreencastEvent, SourceControl};
pub use writer::FrameWriter;

use std::path::Path;

/// Unified entry point for capture sessions.
///
/// This factory wires a [`FrameSource`] to a sink and returns the running
/// [`CaptureSession`]. Use [`capture`](Kinescope::capture) for the common
/// record-to-file case, or [`capture_with_sink`](Kinescope::capture_with_sink)
/// to plug in any [`Sink`] implementation - an in-memory buffer, an
/// encoder process, an uploader.
///
/// # Examples
///
/// ```rust,no_run
/// use kinescope::{CaptureConfig, Kinescope, MemorySink, ReelReplaySource};
///
/// # async fn demo() -> kinescope::Result<()> {
/// let source = ReelReplaySource::open("session.reel")?;
/// let sink = MemorySink::new();
/// let session = Kinescope::capture_with_sink(source, sink.clone(), CaptureConfig::default())
///     .await?;
/// # let _ = session;
/// # Ok(())
/// # }
/// ```
pub struct Kinescope;

impl Kinescope {
    /// Start capturing from `source` into a reel file at `path`.
    ///
    /// Creates (or truncates) the file, asks the source to start
    /// streaming and returns the running session.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The output file cannot be created
    /// - The source rejects the stream request
    pub async fn capture<S>(
        source: S,
        path: impl AsRef<Path>,
        config: CaptureConfig,
    ) -> Result<CaptureSession>
    where
        S: FrameSource,
    {
        let sink = FileSink::create(path).await?;
        CaptureSession::start(source, sink, config).await
    }

    /// Start capturing from `source` into a caller-provided sink.
    ///
    /// The session takes exclusive ownership of the sink for its whole
    /// lifetime; no other writer may touch it.
    pub async fn capture_with_sink<Src, Snk>(
        source: Src,
        sink: Snk,
        config: CaptureConfig,
    ) -> Result<CaptureSession>
    where
        Src: FrameSource,
        Snk: Sink,
    {
        CaptureSession::start(source, sink, config).await
    }
}
