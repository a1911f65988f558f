//! In-memory sink

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::sink::Sink;

/// Sink that collects appended bytes in memory.
///
/// Handles are cheap clones sharing the same buffer, so a capture test
/// can keep one clone for inspection while the session owns another.
/// Also usable as a staging buffer when the real destination is reached
/// by some other transport.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    data: Mutex<Vec<u8>>,
    closed: AtomicBool,
    flushes: AtomicU64,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock_data().clone()
    }

    /// Total bytes appended so far.
    pub fn len(&self) -> usize {
        self.lock_data().len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.lock_data().is_empty()
    }

    /// Whether [`close`](Sink::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Number of flushes observed.
    pub fn flush_count(&self) -> u64 {
        self.shared.flushes.load(Ordering::Relaxed)
    }

    fn lock_data(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        match self.shared.data.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait::async_trait]
impl Sink for MemorySink {
    async fn append(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        if self.is_closed() {
            return Err(std::io::Error::other("memory sink is closed"));
        }
        self.lock_data().extend_from_slice(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.shared.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.shared.closed.store(true, Ordering::Release);
        Ok(())
    }
}
