//! Sink implementations.
//!
//! [`FileSink`] persists to the filesystem, [`MemorySink`] to a shared
//! in-memory buffer. Anything else - an encoder process, a network
//! uploader - is a caller-provided [`Sink`](crate::Sink) implementation.

pub mod file;
pub mod memory;

pub use file::FileSink;
pub use memory::MemorySink;
