//! Core types for the capture pipeline.
//!
//! - [`Frame`] is the unit of data flowing through the pipeline: an opaque
//!   encoded image with a sequence number, a timestamp and the producer's
//!   acknowledgment token. Payloads are shared zero-copy via `Arc`.
//! - [`CaptureConfig`] / [`StreamConfig`] configure a session and the
//!   request sent to the frame source.
//! - [`SessionState`] is the session lifecycle, [`CaptureStats`] the live
//!   counters and [`Summary`] the end-of-session report.

mod config;
mod frame;
mod state;
mod stats;

pub use config::{CaptureConfig, ImageFormat, StreamConfig};
pub use frame::{AckToken, Frame};
pub use state::SessionState;
pub use stats::{CaptureStats, Summary};
