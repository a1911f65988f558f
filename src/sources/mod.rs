//! Frame source implementations.
//!
//! [`ChannelSource`] adapts a browser client's push-style screencast
//! events to the pull-style [`FrameSource`](crate::FrameSource) the
//! pipeline consumes. [`ReelReplaySource`] replays a recorded reel file,
//! for testing and reprocessing without a live capture target.

pub mod channel;
pub mod replay;

pub use channel::{ChannelSource, ScreencastEvent, SourceControl};
pub use replay::ReelReplaySource;
