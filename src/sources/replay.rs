//! Replay source for recorded reels.
//!
//! Replays a reel file through the same pipeline interface as a live
//! capture target, paced at a configurable frame rate. Useful for
//! exercising downstream consumers - re-recording, sink implementations,
//! observers - without a browser anywhere near the test.
//!
//! Reel records carry payloads only, so sequence numbers and timestamps
//! are resynthesized from record order and the replay rate.

use std::path::Path;

use tokio::time::{Duration, Interval, interval};
use tracing::{debug, info};

use crate::reel::ReelReader;
use crate::source::FrameSource;
use crate::types::{AckToken, Frame, StreamConfig};
use crate::Result;

/// Default replay rate when none is given.
pub const DEFAULT_FPS: f64 = 30.0;

/// [`FrameSource`] that replays a recorded reel at a fixed rate.
pub struct ReelReplaySource {
    reader: ReelReader,
    interval: Interval,
    fps: f64,
    next_sequence: u64,
    frames_acked: u64,
}

impl ReelReplaySource {
    /// Open a reel file for replay at [`DEFAULT_FPS`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_fps(path, DEFAULT_FPS)
    }

    /// Open a reel file for replay at `fps` frames per second.
    pub fn open_with_fps<P: AsRef<Path>>(path: P, fps: f64) -> Result<Self> {
        let reader = ReelReader::open(path)?;
        info!("replaying reel {}", reader.path().display());
        Ok(Self::from_reader(reader, fps))
    }

    /// Replay from an already-open reader.
    pub fn from_reader(reader: ReelReader, fps: f64) -> Self {
        let fps = fps.clamp(0.1, 240.0);
        let interval = interval(Duration::from_secs_f64(1.0 / fps));
        Self { reader, interval, fps, next_sequence: 0, frames_acked: 0 }
    }

    /// Replay rate in frames per second.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Frames acknowledged by the consumer so far.
    pub fn frames_acked(&self) -> u64 {
        self.frames_acked
    }
}

#[async_trait::async_trait]
impl FrameSource for ReelReplaySource {
    async fn start_stream(&mut self, _config: &StreamConfig) -> Result<()> {
        // Replay ignores the capture request: payloads were encoded when
        // the reel was recorded.
        debug!("reel replay started at {} fps", self.fps);
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(payload) = self.reader.read_next_record()? else {
            debug!("reel exhausted after {} frames", self.next_sequence);
            return Ok(None);
        };

        // Frame pacing: one record per interval tick.
        self.interval.tick().await;

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let timestamp = sequence as f64 / self.fps;
        Ok(Some(Frame::new(sequence, timestamp, payload, AckToken::new(sequence))))
    }

    async fn acknowledge(&mut self, _token: AckToken) -> Result<()> {
        self.frames_acked += 1;
        Ok(())
    }

    async fn stop_stream(&mut self) -> Result<()> {
        debug!("reel replay stopped at frame {}", self.next_sequence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reel::format::encode_record;

    fn reel(payloads: &[&[u8]]) -> ReelReader {
        ReelReader::from_bytes(payloads.iter().flat_map(|p| encode_record(p)).collect())
    }

    #[tokio::test(start_paused = true)]
    async fn replays_records_as_sequenced_frames() {
        let reader = reel(&[b"one", b"two", b"three"]);
        let mut source = ReelReplaySource::from_reader(reader, 30.0);
        source.start_stream(&StreamConfig::default()).await.unwrap();

        let mut frames = Vec::new();
        while let Some(frame) = source.next_frame().await.unwrap() {
            source.acknowledge(frame.ack_token()).await.unwrap();
            frames.push(frame);
        }

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload(), b"one");
        assert_eq!(frames[2].payload(), b"three");
        assert_eq!(frames[0].sequence(), 0);
        assert_eq!(frames[2].sequence(), 2);
        assert_eq!(source.frames_acked(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timestamps_follow_the_replay_rate() {
        let reader = reel(&[b"a", b"b", b"c"]);
        let mut source = ReelReplaySource::from_reader(reader, 10.0);

        let mut timestamps = Vec::new();
        while let Some(frame) = source.next_frame().await.unwrap() {
            timestamps.push(frame.timestamp());
        }
        assert_eq!(timestamps, vec![0.0, 0.1, 0.2]);
    }

    #[tokio::test(start_paused = true)]
    async fn fps_is_clamped_to_a_sane_range() {
        let source = ReelReplaySource::from_reader(reel(&[]), 0.0);
        assert_eq!(source.fps(), 0.1);
    }
}
