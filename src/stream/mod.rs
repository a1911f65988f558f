//! Stream utilities for observation surfaces.

mod sample;

pub use sample::{Sample, SampleExt};
