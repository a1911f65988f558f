//! Capture session controller.
//!
//! A [`CaptureSession`] owns the whole pipeline for one capture target:
//! the bounded [`FrameQueue`], the [`FrameWriter`] bound to the sink, and
//! the two tokio tasks that move frames between them.
//!
//! - The **arrival task** pulls frames from the [`FrameSource`], admits
//!   them to the queue (suspending while it is full - that suspension is
//!   the backpressure signal) and acknowledges each frame to the source
//!   strictly *after* it is safely queued. Acknowledging first would risk
//!   losing an acked frame on a crash between ack and admission.
//! - The **drain task** dequeues frames and hands them to the writer,
//!   driving the reorder deadline, and publishes [`CaptureStats`]
//!   snapshots through a watch channel.
//!
//! Lifecycle: `Capturing → Stopping → Stopped`, or `Failed` from any
//! non-terminal state on an unrecoverable error. `stop()` is cooperative:
//! it cancels frame requests, closes the queue to new admissions and
//! waits - bounded by the drain timeout - for everything queued to reach
//! the sink.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::Stream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::queue::FrameQueue;
use crate::sink::Sink;
use crate::source::FrameSource;
use crate::types::{CaptureConfig, CaptureStats, SessionState, Summary};
use crate::writer::FrameWriter;
use crate::{CaptureError, Result};


/// First-failure-wins slot shared between the session handle and its
/// tasks. Later failures are logged and discarded so the error that
/// actually brought the session down is the one surfaced.
#[derive(Clone, Default, Debug)]
struct FailureCell {
    slot: Arc<Mutex<Option<Arc<CaptureError>>>>,
}

impl FailureCell {
    fn record(&self, error: CaptureError) {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            *slot = Some(Arc::new(error));
        } else {
            debug!("suppressing follow-up failure: {error}");
        }
    }

    fn get(&self) -> Option<Arc<CaptureError>> {
        let slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone()
    }
}

/// An active capture session.
///
/// Created by [`Kinescope::capture`](crate::Kinescope::capture) (or
/// [`CaptureSession::start`] with a custom sink). Dropping a running
/// session cancels its tasks; call [`stop`](Self::stop) to drain cleanly
/// and collect the [`Summary`].
#[derive(Debug)]
pub struct CaptureSession {
    state_tx: Arc<watch::Sender<SessionState>>,
    state_rx: watch::Receiver<SessionState>,
    stats_rx: watch::Receiver<CaptureStats>,
    cancel: CancellationToken,
    queue: Arc<FrameQueue>,
    arrival_task: Option<JoinHandle<()>>,
    drain_task: Option<JoinHandle<()>>,
    failure: FailureCell,
    started_at: Instant,
    stopped_at: Option<Instant>,
    drain_timeout: Duration,
    summary_taken: bool,
}

impl CaptureSession {
    /// Start capturing from `source` into `sink`.
    ///
    /// Validates the configuration, asks the source to begin streaming
    /// and spawns the arrival and drain tasks. Errors from either step
    /// surface here; a returned session is already `Capturing`.
    pub async fn start<Src, Snk>(mut source: Src, sink: Snk, config: CaptureConfig) -> Result<Self>
    where
        Src: FrameSource,
        Snk: Sink,
    {
        config.validate()?;

        debug!("requesting frame stream (queue capacity {})", config.queue_capacity);
        source.start_stream(&config.stream).await?;

        let queue = Arc::new(FrameQueue::bounded(config.queue_capacity));
        let writer = FrameWriter::new(sink, config.reorder_timeout());

        let (state_tx, state_rx) = watch::channel(SessionState::Capturing);
        let state_tx = Arc::new(state_tx);
        let (stats_tx, stats_rx) = watch::channel(CaptureStats::default());
        let cancel = CancellationToken::new();
        let failure = FailureCell::default();
        let frames_captured = Arc::new(AtomicU64::new(0));

        let arrival_task = tokio::spawn(run_arrival(
            source,
            Arc::clone(&queue),
            cancel.clone(),
            failure.clone(),
            Arc::clone(&frames_captured),
        ));
        let drain_task = tokio::spawn(run_drain(
            Arc::clone(&queue),
            writer,
            stats_tx,
            Arc::clone(&state_tx),
            failure.clone(),
            frames_captured,
        ));

        info!("capture session started");
        Ok(Self {
            state_tx,
            state_rx,
            stats_rx,
            cancel,
            queue,
            arrival_task: Some(arrival_task),
            drain_task: Some(drain_task),
            failure,
            started_at: Instant::now(),
            stopped_at: None,
            drain_timeout: config.drain_timeout(),
            summary_taken: false,
        })
    }

    /// Stop the session and collect its [`Summary`].
    ///
    /// Cancels frame requests, closes the queue to new admissions and
    /// waits up to the drain timeout for queued frames to reach the sink.
    /// The summary is returned even when the session ends `Failed` - the
    /// failure rides along in [`Summary::failure`].
    ///
    /// A summary can be collected exactly once, from a `Capturing`
    /// session (normal stop) or from one that already failed
    /// (post-mortem). Any other call - a second stop, in particular -
    /// fails with [`CaptureError::InvalidState`].
    pub async fn stop(&mut self) -> Result<Summary> {
        let state = self.state();
        if self.summary_taken {
            return Err(CaptureError::invalid_state("stop", state));
        }
        match state {
            SessionState::Capturing => {}
            SessionState::Failed => return self.collect_post_mortem().await,
            other => return Err(CaptureError::invalid_state("stop", other)),
        }

        info!("stop requested, draining capture pipeline");
        self.state_tx.send_if_modified(|s| {
            if *s == SessionState::Capturing {
                *s = SessionState::Stopping;
                true
            } else {
                false
            }
        });

        // Stop requesting frames, then refuse new admissions. A producer
        // suspended on the full queue is woken with QueueClosed; its
        // frame stays unacknowledged, so it is never lost, only deferred
        // to a future session.
        self.cancel.cancel();
        self.queue.close();

        if let Some(handle) = self.arrival_task.take() {
            if let Err(e) = handle.await {
                error!("arrival task panicked: {e}");
                self.failure
                    .record(CaptureError::source_disconnected(format!("arrival task panicked: {e}")));
            }
        }

        if let Some(mut handle) = self.drain_task.take() {
            tokio::select! {
                joined = &mut handle => {
                    if let Err(e) = joined {
                        error!("drain task panicked: {e}");
                        self.failure.record(CaptureError::write(
                            "drain task",
                            std::io::Error::other(e.to_string()),
                        ));
                    }
                }
                _ = tokio::time::sleep(self.drain_timeout) => {
                    let flushed = self.stats_rx.borrow().frames_written;
                    warn!(
                        "drain did not complete within {:?} ({} frames flushed)",
                        self.drain_timeout, flushed
                    );
                    handle.abort();
                    self.failure.record(CaptureError::drain_timeout(self.drain_timeout, flushed));
                }
            }
        }

        finalize_state(&self.state_tx, &self.failure);
        self.finish_summary()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Latest statistics snapshot.
    pub fn stats(&self) -> CaptureStats {
        *self.stats_rx.borrow()
    }

    /// Statistics as a stream, starting with the current snapshot.
    ///
    /// Combine with [`SampleExt::sample`](crate::stream::SampleExt::sample)
    /// to rate-limit observation.
    pub fn stats_updates(&self) -> impl Stream<Item = CaptureStats> + Send + 'static {
        WatchStream::new(self.stats_rx.clone())
    }

    /// The failure that terminated the session, if any.
    pub fn failure(&self) -> Option<Arc<CaptureError>> {
        self.failure.get()
    }

    /// Collect the summary of a session that already failed on its own.
    async fn collect_post_mortem(&mut self) -> Result<Summary> {
        debug!("collecting post-mortem summary");
        self.cancel.cancel();
        self.queue.close();
        if let Some(handle) = self.arrival_task.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.drain_task.take() {
            let _ = handle.await;
        }
        self.finish_summary()
    }

    fn finish_summary(&mut self) -> Result<Summary> {
        self.summary_taken = true;
        let stopped_at = *self.stopped_at.get_or_insert_with(Instant::now);
        let stats = *self.stats_rx.borrow();
        let failure = self.failure.get();

        match &failure {
            None => info!(
                "capture session stopped cleanly: {} frames, {} bytes",
                stats.frames_written, stats.bytes_written
            ),
            Some(e) => info!(
                "capture session failed after {} frames: {e}",
                stats.frames_written
            ),
        }

        Ok(Summary {
            frame_count: stats.frames_written,
            bytes_written: stats.bytes_written,
            duration_seconds: (stopped_at - self.started_at).as_secs_f64(),
            gaps_skipped: stats.gaps_skipped,
            failure,
        })
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        debug!("dropping capture session");
        // Cancel tasks on drop for clean shutdown; the drain task still
        // flushes whatever was queued before it exits.
        self.cancel.cancel();
        self.queue.close();
    }
}

/// Arrival flow: pull frames from the source, admit them to the queue,
/// acknowledge after admission.
async fn run_arrival<Src: FrameSource>(
    mut source: Src,
    queue: Arc<FrameQueue>,
    cancel: CancellationToken,
    failure: FailureCell,
    frames_captured: Arc<AtomicU64>,
) {
    debug!("arrival task started");
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = source.next_frame() => next,
        };

        match next {
            Ok(Some(frame)) => {
                let sequence = frame.sequence();
                let token = frame.ack_token();
                match queue.enqueue(frame).await {
                    Ok(()) => {
                        frames_captured.fetch_add(1, Ordering::Relaxed);
                        // Acknowledge strictly after the frame is safely
                        // queued, never before.
                        if let Err(e) = source.acknowledge(token).await {
                            warn!("acknowledge failed for frame {sequence}: {e}");
                            failure.record(e);
                            break;
                        }
                    }
                    Err(_) if cancel.is_cancelled() => {
                        // stop() closed the queue; the unacked frame is
                        // the producer's to redeliver.
                        debug!("frame {sequence} rejected during stop");
                        break;
                    }
                    Err(e) => {
                        // The queue only closes early when the drain side
                        // failed; that failure is already recorded and
                        // wins over this one.
                        debug!("frame {sequence} rejected: {e}");
                        failure.record(e);
                        break;
                    }
                }
            }
            Ok(None) => {
                if cancel.is_cancelled() {
                    break;
                }
                warn!("frame source ended without a stop handshake");
                failure.record(CaptureError::source_disconnected(
                    "frame stream ended unexpectedly",
                ));
                break;
            }
            Err(e) => {
                error!("frame source error: {e}");
                failure.record(e);
                break;
            }
        }
    }

    // Close the queue on every exit path so the drain task finishes and
    // flushes, then tell the producer to stand down.
    queue.close();
    if let Err(e) = source.stop_stream().await {
        warn!("stop_stream failed: {e}");
    }
    debug!("arrival task ended");
}

enum DrainEvent {
    Frame(Option<crate::types::Frame>),
    ReorderTimeout,
}

/// Drain flow: dequeue frames into the writer and keep stats fresh.
async fn run_drain<S: Sink>(
    queue: Arc<FrameQueue>,
    mut writer: FrameWriter<S>,
    stats_tx: watch::Sender<CaptureStats>,
    state_tx: Arc<watch::Sender<SessionState>>,
    failure: FailureCell,
    frames_captured: Arc<AtomicU64>,
) {
    debug!("drain task started");
    let mut result = Ok(());

    loop {
        let event = match writer.reorder_deadline() {
            Some(deadline) => tokio::select! {
                frame = queue.dequeue() => DrainEvent::Frame(frame),
                _ = tokio::time::sleep_until(deadline) => DrainEvent::ReorderTimeout,
            },
            None => DrainEvent::Frame(queue.dequeue().await),
        };

        let step = match event {
            DrainEvent::Frame(Some(frame)) => writer.write(frame).await,
            DrainEvent::ReorderTimeout => writer.skip_gap().await,
            DrainEvent::Frame(None) => break,
        };
        publish_stats(&stats_tx, &writer, &frames_captured);

        if let Err(e) = step {
            result = Err(e);
            break;
        }
    }

    if result.is_ok() {
        result = writer.finish().await;
    } else {
        writer.abort().await;
    }
    publish_stats(&stats_tx, &writer, &frames_captured);

    if let Err(e) = result {
        error!("frame writer failed after {} frames: {e}", writer.frames_written());
        // Unblock a suspended producer; its enqueue fails with QueueClosed.
        queue.close();
        failure.record(e);
    }

    finalize_state(&state_tx, &failure);
    debug!("drain task ended ({} frames written)", writer.frames_written());
}

fn publish_stats<S: Sink>(
    stats_tx: &watch::Sender<CaptureStats>,
    writer: &FrameWriter<S>,
    frames_captured: &AtomicU64,
) {
    stats_tx.send_replace(CaptureStats {
        frames_captured: frames_captured.load(Ordering::Relaxed),
        frames_written: writer.frames_written(),
        bytes_written: writer.bytes_written(),
        gaps_skipped: writer.gaps_skipped(),
        late_frames_dropped: writer.late_frames_dropped(),
    });
}

/// Settle the terminal state once the pipeline has wound down. No-op if
/// a terminal state was already reached.
fn finalize_state(state_tx: &watch::Sender<SessionState>, failure: &FailureCell) {
    let target = if failure.get().is_some() { SessionState::Failed } else { SessionState::Stopped };
    state_tx.send_if_modified(|s| {
        if s.is_terminal() {
            false
        } else {
            *s = target;
            true
        }
    });
}
