//! Test doubles for capture pipeline tests.
//!
//! [`ScriptedSource`] plays a fixed script of frames (in order, out of
//! order, with waits, errors or an early end) and records every
//! interaction the session has with it, so tests can assert protocol
//! ordering - in particular that acknowledgments strictly follow queue
//! admission. [`FailingSink`] and [`GatedSink`] wrap [`MemorySink`] with
//! injected failures and externally released appends.

#![cfg(test)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::reel::ReelReader;
use crate::sink::Sink;
use crate::sinks::MemorySink;
use crate::source::FrameSource;
use crate::types::{AckToken, Frame, StreamConfig};
use crate::{CaptureError, Result};

/// Everything a [`ScriptedSource`] observes, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    StreamStarted,
    Yielded(u64),
    Acked(u64),
    StreamStopped,
}

/// Shared, ordered record of source interactions.
pub type EventLog = Arc<Mutex<Vec<SourceEvent>>>;

/// Snapshot an event log.
pub fn events(log: &EventLog) -> Vec<SourceEvent> {
    log.lock().unwrap().clone()
}

/// Acks recorded so far, in order.
pub fn acked(log: &EventLog) -> Vec<u64> {
    events(log)
        .into_iter()
        .filter_map(|e| match e {
            SourceEvent::Acked(seq) => Some(seq),
            _ => None,
        })
        .collect()
}

/// One step of a source script.
pub enum Step {
    /// Yield a frame with this sequence number.
    Frame(u64),
    /// Sleep before the next step.
    Wait(Duration),
    /// Fail `next_frame` with a disconnection.
    Fail(&'static str),
    /// End the stream (`next_frame` returns `Ok(None)`).
    End,
}

/// Frame source driven by a prewritten script.
///
/// After the script runs out, `next_frame` stays pending forever - the
/// stream is open but idle, which is what a quiet capture target looks
/// like. Ack tokens equal sequence numbers so assertions stay readable.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    log: EventLog,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> (Self, EventLog) {
        let log = EventLog::default();
        (Self { steps: steps.into(), log: Arc::clone(&log) }, log)
    }

    /// A script of `count` in-order frames, then an idle stream.
    pub fn frames(count: u64) -> (Self, EventLog) {
        Self::new((0..count).map(Step::Frame).collect())
    }

    /// The payload a scripted frame carries.
    pub fn payload(sequence: u64) -> Vec<u8> {
        format!("frame-{sequence:04}").into_bytes()
    }

    fn build_frame(sequence: u64) -> Frame {
        Frame::new(sequence, sequence as f64 / 30.0, Self::payload(sequence), AckToken::new(sequence))
    }

    fn log(&self, event: SourceEvent) {
        self.log.lock().unwrap().push(event);
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedSource {
    async fn start_stream(&mut self, _config: &StreamConfig) -> Result<()> {
        self.log(SourceEvent::StreamStarted);
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.steps.pop_front() {
                Some(Step::Frame(sequence)) => {
                    self.log(SourceEvent::Yielded(sequence));
                    return Ok(Some(Self::build_frame(sequence)));
                }
                Some(Step::Wait(duration)) => tokio::time::sleep(duration).await,
                Some(Step::Fail(reason)) => {
                    return Err(CaptureError::source_disconnected(reason));
                }
                Some(Step::End) => return Ok(None),
                None => std::future::pending::<()>().await,
            }
        }
    }

    async fn acknowledge(&mut self, token: AckToken) -> Result<()> {
        self.log(SourceEvent::Acked(token.raw()));
        Ok(())
    }

    async fn stop_stream(&mut self) -> Result<()> {
        self.log(SourceEvent::StreamStopped);
        Ok(())
    }
}

/// Sink whose Nth append (1-based) fails, and keeps failing from there.
pub struct FailingSink {
    inner: MemorySink,
    fail_from: u64,
    appends: u64,
}

impl FailingSink {
    /// Returns the sink and a [`MemorySink`] observer over the bytes that
    /// made it through before the failure.
    pub fn failing_on(nth: u64) -> (Self, MemorySink) {
        let inner = MemorySink::new();
        let observer = inner.clone();
        (Self { inner, fail_from: nth, appends: 0 }, observer)
    }
}

#[async_trait::async_trait]
impl Sink for FailingSink {
    async fn append(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.appends += 1;
        if self.appends >= self.fail_from {
            return Err(std::io::Error::other("injected append failure"));
        }
        self.inner.append(bytes).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.inner.close().await
    }
}

/// Sink whose appends only proceed when the test releases them.
///
/// Each append consumes one permit from the gate before it lands, which
/// lets a test hold the drain side still and observe backpressure build
/// up in the queue.
pub struct GatedSink {
    inner: MemorySink,
    gate: Arc<Semaphore>,
}

impl GatedSink {
    pub fn new() -> (Self, MemorySink, Arc<Semaphore>) {
        let inner = MemorySink::new();
        let observer = inner.clone();
        let gate = Arc::new(Semaphore::new(0));
        (Self { inner, gate: Arc::clone(&gate) }, observer, gate)
    }
}

#[async_trait::async_trait]
impl Sink for GatedSink {
    async fn append(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| std::io::Error::other("gate closed"))?;
        permit.forget();
        self.inner.append(bytes).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.inner.close().await
    }
}

/// Decode every record in a reel byte buffer.
pub fn decode_records(bytes: Vec<u8>) -> Vec<Vec<u8>> {
    let mut reader = ReelReader::from_bytes(bytes);
    let mut records = Vec::new();
    while let Some(payload) = reader.read_next_record().expect("reel should be well-formed") {
        records.push(payload);
    }
    records
}
