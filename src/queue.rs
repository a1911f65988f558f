//! Bounded frame queue decoupling arrival from persistence.
//!
//! The queue is the single synchronization point between the two flows of
//! a capture session: the arrival task pushing frames from the source and
//! the drain task writing them out. It is bounded and FIFO; a full queue
//! suspends the producer, which in turn delays acknowledgment to the
//! frame source. That suspension is the backpressure mechanism - frames
//! are never dropped to make room.
//!
//! `close()` stops admissions while leaving buffered frames drainable, so
//! a stopping session can still flush everything it accepted.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Notify, Semaphore};
use tracing::debug;

use crate::types::Frame;
use crate::{CaptureError, Result};

/// Bounded FIFO buffer of frames with blocking admission.
///
/// Designed for one producer and one consumer task. A raw mpsc channel
/// cannot express "stop admissions but keep draining" from the consumer's
/// side, hence the explicit composition: a semaphore holds the free
/// slots (closing it wakes blocked producers with [`CaptureError::QueueClosed`]),
/// a [`Notify`] wakes the consumer on arrival and on close.
#[derive(Debug)]
pub struct FrameQueue {
    items: Mutex<VecDeque<Frame>>,
    slots: Semaphore,
    available: Notify,
    closed: AtomicBool,
    capacity: usize,
}

impl FrameQueue {
    /// Create a queue admitting at most `capacity` frames at a time.
    pub fn bounded(capacity: usize) -> Self {
        debug_assert!(capacity >= 1, "queue capacity must be at least 1");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            slots: Semaphore::new(capacity),
            available: Notify::new(),
            closed: AtomicBool::new(false),
            capacity,
        }
    }

    /// Admit a frame, suspending while the queue is full.
    ///
    /// The suspension is the intended backpressure signal, not an error
    /// condition. Fails with [`CaptureError::QueueClosed`] once the queue
    /// has been closed, including while suspended.
    pub async fn enqueue(&self, frame: Frame) -> Result<()> {
        let permit = match self.slots.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Err(CaptureError::QueueClosed),
        };
        if self.closed.load(Ordering::Acquire) {
            return Err(CaptureError::QueueClosed);
        }
        self.lock_items().push_back(frame);
        // The slot stays taken until a dequeue hands it back.
        permit.forget();
        self.available.notify_one();
        Ok(())
    }

    /// Pop the oldest frame, suspending while the queue is empty.
    ///
    /// Returns `None` once the queue is closed *and* drained - the
    /// end-of-stream marker for the consumer.
    pub async fn dequeue(&self) -> Option<Frame> {
        loop {
            // Register interest before checking, so a concurrent
            // enqueue/close cannot slip between the check and the await.
            let notified = self.available.notified();

            if let Some(frame) = self.lock_items().pop_front() {
                self.slots.add_permits(1);
                return Some(frame);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }

            notified.await;
        }
    }

    /// Stop admitting frames. Idempotent.
    ///
    /// Producers suspended in [`enqueue`](Self::enqueue) are woken with
    /// [`CaptureError::QueueClosed`]; frames already buffered remain
    /// drainable via [`dequeue`](Self::dequeue).
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.slots.close();
            self.available.notify_waiters();
            debug!("frame queue closed with {} frames still buffered", self.len());
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.lock_items().is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock_items(&self) -> std::sync::MutexGuard<'_, VecDeque<Frame>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AckToken;
    use std::sync::Arc;
    use std::time::Duration;

    fn frame(sequence: u64) -> Frame {
        Frame::new(sequence, sequence as f64 / 30.0, vec![sequence as u8; 8], AckToken::new(sequence))
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let queue = FrameQueue::bounded(8);
        for seq in 0..5 {
            queue.enqueue(frame(seq)).await.unwrap();
        }
        for seq in 0..5 {
            assert_eq!(queue.dequeue().await.unwrap().sequence(), seq);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_suspends_on_a_full_queue_until_a_dequeue() {
        let queue = Arc::new(FrameQueue::bounded(2));
        queue.enqueue(frame(0)).await.unwrap();
        queue.enqueue(frame(1)).await.unwrap();

        // The third enqueue must not complete while both slots are taken.
        let contender = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.enqueue(frame(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished(), "enqueue should suspend while the queue is full");
        assert_eq!(queue.len(), 2);

        // One dequeue frees a slot; the suspended enqueue now lands.
        assert_eq!(queue.dequeue().await.unwrap().sequence(), 0);
        contender.await.unwrap().unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dequeue().await.unwrap().sequence(), 1);
        assert_eq!(queue.dequeue().await.unwrap().sequence(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dequeue_suspends_until_a_frame_arrives() {
        let queue = Arc::new(FrameQueue::bounded(2));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!consumer.is_finished(), "dequeue should suspend while the queue is empty");

        queue.enqueue(frame(7)).await.unwrap();
        assert_eq!(consumer.await.unwrap().unwrap().sequence(), 7);
    }

    #[tokio::test]
    async fn close_rejects_new_frames_but_drains_buffered_ones() {
        let queue = FrameQueue::bounded(4);
        queue.enqueue(frame(0)).await.unwrap();
        queue.enqueue(frame(1)).await.unwrap();

        queue.close();
        assert!(queue.is_closed());
        assert!(matches!(queue.enqueue(frame(2)).await, Err(CaptureError::QueueClosed)));

        assert_eq!(queue.dequeue().await.unwrap().sequence(), 0);
        assert_eq!(queue.dequeue().await.unwrap().sequence(), 1);
        assert!(queue.dequeue().await.is_none(), "closed and drained means end of stream");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let queue = FrameQueue::bounded(1);
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn close_wakes_a_suspended_producer() {
        let queue = Arc::new(FrameQueue::bounded(1));
        queue.enqueue(frame(0)).await.unwrap();

        let blocked = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.enqueue(frame(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!blocked.is_finished());

        queue.close();
        assert!(matches!(blocked.await.unwrap(), Err(CaptureError::QueueClosed)));
        // The frame admitted before close is still there.
        assert_eq!(queue.dequeue().await.unwrap().sequence(), 0);
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn close_wakes_a_suspended_consumer() {
        let queue = Arc::new(FrameQueue::bounded(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!consumer.is_finished());

        queue.close();
        assert!(consumer.await.unwrap().is_none());
    }
}
