//! Channel-backed frame source.
//!
//! Browser debugging clients deliver screencast frames as push-style
//! events and expect three commands back: start the cast, acknowledge a
//! frame, stop the cast. [`ChannelSource`] is the shim between that
//! event callback and the pull-style [`FrameSource`] the pipeline
//! consumes: the client's event handler sends [`ScreencastEvent`]s into
//! an mpsc channel and executes [`SourceControl`] commands coming back
//! the other way.
//!
//! Sequence numbers are assigned here, in arrival order, starting at
//! zero - event order on the debugging connection is authoritative, the
//! wire protocol itself has no frame counter.

use tokio::sync::mpsc;
use tracing::debug;

use crate::source::FrameSource;
use crate::types::{AckToken, Frame, StreamConfig};
use crate::{CaptureError, Result};

/// One screencast frame event as delivered by the browser client.
#[derive(Debug, Clone)]
pub struct ScreencastEvent {
    /// Decoded image bytes (the wire carries base64; the client decodes
    /// before handing the event over).
    pub payload: Vec<u8>,

    /// Capture timestamp in seconds since session start.
    pub timestamp: f64,

    /// The ack identifier the browser expects back for this frame.
    pub ack: AckToken,
}

/// Command for the browser client driving the debugging connection.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceControl {
    /// Begin the screencast with this configuration.
    Start(StreamConfig),
    /// Acknowledge a frame so the browser sends the next one.
    Ack(AckToken),
    /// Stop the screencast.
    Stop,
}

/// [`FrameSource`] fed by a channel of screencast events.
///
/// The event channel should be modestly bounded: the browser paces
/// itself on outstanding acks, so a deep buffer here only hides
/// backpressure from the producer.
pub struct ChannelSource {
    events: mpsc::Receiver<ScreencastEvent>,
    control: mpsc::UnboundedSender<SourceControl>,
    next_sequence: u64,
}

impl ChannelSource {
    /// Build a source over the client's event and control channels.
    pub fn new(
        events: mpsc::Receiver<ScreencastEvent>,
        control: mpsc::UnboundedSender<SourceControl>,
    ) -> Self {
        Self { events, control, next_sequence: 0 }
    }

    fn send_control(&self, command: SourceControl) -> Result<()> {
        self.control
            .send(command)
            .map_err(|_| CaptureError::source_disconnected("control channel closed"))
    }
}

#[async_trait::async_trait]
impl FrameSource for ChannelSource {
    async fn start_stream(&mut self, config: &StreamConfig) -> Result<()> {
        debug!("requesting screencast start");
        self.send_control(SourceControl::Start(config.clone()))
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.events.recv().await {
            Some(event) => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                Ok(Some(Frame::new(sequence, event.timestamp, event.payload, event.ack)))
            }
            // The client hung up; whether that is a disconnection is the
            // session's call, based on whether it asked for a stop.
            None => Ok(None),
        }
    }

    async fn acknowledge(&mut self, token: AckToken) -> Result<()> {
        self.send_control(SourceControl::Ack(token))
    }

    async fn stop_stream(&mut self) -> Result<()> {
        debug!("requesting screencast stop");
        self.send_control(SourceControl::Stop)?;
        // Stop pulling new events; already-buffered frames still drain.
        self.events.close();
        Ok(())
    }
}
