//! Frame writer: in-order persistence with reorder recovery.
//!
//! The writer owns the session's sink exclusively and appends one
//! length-prefixed record per frame, strictly in increasing sequence
//! order. Frames that arrive ahead of the write cursor are held in a
//! reorder buffer; if the missing frame does not show up within the
//! reorder timeout the gap is skipped - counted and logged, never
//! silently reordered - and writing resumes from the next buffered
//! sequence. Frames older than the cursor (stragglers from a skipped
//! gap) are dropped and counted.
//!
//! The drain loop drives time explicitly: [`FrameWriter::reorder_deadline`]
//! exposes when the current gap expires and [`FrameWriter::skip_gap`]
//! resolves it, so the writer itself never sleeps.

use std::collections::BTreeMap;

use tokio::time::{Duration, Instant};
use tracing::{trace, warn};

use crate::reel::format;
use crate::sink::Sink;
use crate::types::Frame;
use crate::{CaptureError, Result};

/// Writes frames to a [`Sink`] in strict sequence order.
pub struct FrameWriter<S: Sink> {
    sink: S,
    reorder_timeout: Duration,
    /// Sequence number the next emitted record must carry.
    next_sequence: u64,
    /// Frames received ahead of the cursor, keyed by sequence.
    pending: BTreeMap<u64, Frame>,
    /// When the gap currently blocking the cursor expires.
    gap_deadline: Option<Instant>,
    frames_written: u64,
    bytes_written: u64,
    gaps_skipped: u64,
    late_frames_dropped: u64,
    closed: bool,
}

impl<S: Sink> FrameWriter<S> {
    /// Create a writer over an exclusively owned sink.
    ///
    /// The write cursor starts at sequence zero, matching the numbering
    /// contract of [`FrameSource`](crate::FrameSource).
    pub fn new(sink: S, reorder_timeout: Duration) -> Self {
        Self {
            sink,
            reorder_timeout,
            next_sequence: 0,
            pending: BTreeMap::new(),
            gap_deadline: None,
            frames_written: 0,
            bytes_written: 0,
            gaps_skipped: 0,
            late_frames_dropped: 0,
            closed: false,
        }
    }

    /// Accept a frame for persistence.
    ///
    /// Emits immediately when the frame is the one the cursor expects,
    /// together with any directly following frames already buffered.
    /// Frames ahead of the cursor are held; frames behind it are dropped
    /// and counted.
    pub async fn write(&mut self, frame: Frame) -> Result<()> {
        debug_assert!(!self.closed, "write after finish is a drain-loop bug");
        let sequence = frame.sequence();

        if sequence < self.next_sequence {
            warn!("dropping late frame {} (cursor at {})", sequence, self.next_sequence);
            self.late_frames_dropped += 1;
            return Ok(());
        }

        if sequence == self.next_sequence {
            self.emit(frame).await?;
            self.advance().await
        } else {
            trace!("holding out-of-order frame {} (cursor at {})", sequence, self.next_sequence);
            self.pending.insert(sequence, frame);
            if self.gap_deadline.is_none() {
                self.gap_deadline = Some(Instant::now() + self.reorder_timeout);
            }
            Ok(())
        }
    }

    /// Deadline at which the gap blocking the cursor should be skipped.
    ///
    /// `None` while nothing is buffered out of order.
    pub fn reorder_deadline(&self) -> Option<Instant> {
        self.gap_deadline
    }

    /// Give up on the gap in front of the cursor.
    ///
    /// Moves the cursor to the oldest buffered frame and emits everything
    /// consecutive from there. Called by the drain loop when
    /// [`reorder_deadline`](Self::reorder_deadline) expires.
    pub async fn skip_gap(&mut self) -> Result<()> {
        let Some((&target, _)) = self.pending.first_key_value() else {
            self.gap_deadline = None;
            return Ok(());
        };
        warn!("reorder timeout expired, skipping gap {}..{}", self.next_sequence, target);
        self.gaps_skipped += 1;
        self.next_sequence = target;
        self.advance().await
    }

    /// Flush everything and release the sink.
    ///
    /// Buffered out-of-order frames are written out first, skipping any
    /// residual gaps, so nothing admitted to the pipeline is lost at
    /// shutdown. The sink is closed on every path, including when the
    /// final flush fails.
    pub async fn finish(&mut self) -> Result<()> {
        let outcome = self.drain_pending_and_flush().await;
        let close_outcome =
            self.sink.close().await.map_err(|e| CaptureError::write("close sink", e));
        self.closed = true;

        outcome.and(close_outcome)
    }

    /// Release the sink after a failure, keeping the original error.
    ///
    /// Close failures are logged only; the failure that brought the
    /// session down has already been recorded.
    pub async fn abort(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sink.close().await {
            warn!("sink close during abort failed: {e}");
        }
    }

    /// Frame records emitted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Bytes appended so far, length prefixes included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Gap-skip events so far.
    pub fn gaps_skipped(&self) -> u64 {
        self.gaps_skipped
    }

    /// Late frames dropped so far.
    pub fn late_frames_dropped(&self) -> u64 {
        self.late_frames_dropped
    }

    /// Frames currently held out of order.
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Emit every buffered frame the cursor now reaches, then rearm the
    /// gap deadline if something is still stuck.
    async fn advance(&mut self) -> Result<()> {
        while let Some(frame) = self.pending.remove(&self.next_sequence) {
            self.emit(frame).await?;
        }
        // Whatever remains is blocked by a fresh gap; each gap gets the
        // full reorder timeout.
        self.gap_deadline =
            (!self.pending.is_empty()).then(|| Instant::now() + self.reorder_timeout);
        Ok(())
    }

    async fn emit(&mut self, frame: Frame) -> Result<()> {
        if frame.payload_len() > format::MAX_PAYLOAD_LEN as usize {
            return Err(CaptureError::corrupt(
                "frame record",
                format!(
                    "frame {} payload is {} bytes, beyond the {} byte record bound",
                    frame.sequence(),
                    frame.payload_len(),
                    format::MAX_PAYLOAD_LEN
                ),
            ));
        }

        let record = format::encode_record(frame.payload());
        self.sink.append(&record).await.map_err(|e| {
            CaptureError::write(format!("append record for frame {}", frame.sequence()), e)
        })?;

        self.frames_written += 1;
        self.bytes_written += record.len() as u64;
        self.next_sequence = frame.sequence() + 1;
        trace!("frame {} written ({} bytes)", frame.sequence(), record.len());
        Ok(())
    }

    async fn drain_pending_and_flush(&mut self) -> Result<()> {
        while let Some((&target, _)) = self.pending.first_key_value() {
            if target > self.next_sequence {
                warn!(
                    "closing with an unfilled gap, skipping {}..{}",
                    self.next_sequence, target
                );
                self.gaps_skipped += 1;
                self.next_sequence = target;
            }
            self.advance().await?;
        }
        self.gap_deadline = None;
        self.sink.flush().await.map_err(|e| CaptureError::write("flush sink", e))
    }
}
