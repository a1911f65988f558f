//! Capture configuration
//!
//! [`CaptureConfig`] carries the pipeline knobs (queue capacity and the
//! two timeouts), [`StreamConfig`] the request forwarded to the frame
//! source when the stream starts. Both deserialize from YAML so capture
//! profiles can live in config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CaptureError, Result};

/// Encoding requested from the frame source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

/// The capture request handed to the frame source when streaming starts.
///
/// Field semantics follow the browser screencast protocol: `quality` is
/// only meaningful for lossy formats, `every_nth_frame` subsamples at the
/// producer so skipped frames never enter the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Image encoding for frame payloads.
    pub format: ImageFormat,

    /// Compression quality, 0–100. Ignored for lossless formats.
    pub quality: u8,

    /// Deliver only every Nth frame. 1 delivers everything.
    pub every_nth_frame: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { format: ImageFormat::Jpeg, quality: 90, every_nth_frame: 1 }
    }
}

/// Configuration for a capture session.
///
/// ```rust
/// use kinescope::CaptureConfig;
///
/// let config = CaptureConfig::default();
/// assert_eq!(config.queue_capacity, 64);
///
/// let from_yaml = CaptureConfig::from_yaml("queue_capacity: 8").unwrap();
/// assert_eq!(from_yaml.queue_capacity, 8);
/// assert_eq!(from_yaml.reorder_timeout_ms, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum number of frames buffered between arrival and persistence.
    /// A full queue suspends the arrival side; that suspension is the
    /// backpressure signal that throttles the producer.
    pub queue_capacity: usize,

    /// How long the writer holds an out-of-order frame before skipping
    /// the gap in front of it.
    pub reorder_timeout_ms: u64,

    /// How long `stop()` waits for queued frames to reach the sink before
    /// declaring the session failed.
    pub drain_timeout_ms: u64,

    /// Request forwarded to the frame source at stream start.
    pub stream: StreamConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            reorder_timeout_ms: 500,
            drain_timeout_ms: 5000,
            stream: StreamConfig::default(),
        }
    }
}

impl CaptureConfig {
    /// Reorder timeout as a [`Duration`].
    pub fn reorder_timeout(&self) -> Duration {
        Duration::from_millis(self.reorder_timeout_ms)
    }

    /// Drain timeout as a [`Duration`].
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Parse a configuration from YAML.
    ///
    /// Missing fields take their defaults, so a profile only needs to
    /// name what it overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: CaptureConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| CaptureError::config(format!("invalid capture profile: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(CaptureError::config("queue_capacity must be at least 1"));
        }
        if self.stream.quality > 100 {
            return Err(CaptureError::config(format!(
                "stream quality must be 0-100, got {}",
                self.stream.quality
            )));
        }
        if self.stream.every_nth_frame == 0 {
            return Err(CaptureError::config("every_nth_frame must be at least 1"));
        }
        Ok(())
    }
}
