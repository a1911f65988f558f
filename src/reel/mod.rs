//! Reel file support: the durable frame envelope and its reader.
//!
//! "Reel" is the crate's name for its output file - a flat sequence of
//! length-prefixed frame records written in sequence order. The format
//! lives in [`format`], [`ReelReader`] reads recorded reels back for
//! inspection or replay.

pub mod format;
pub mod reader;

pub use reader::ReelReader;
