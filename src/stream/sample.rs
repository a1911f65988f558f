//! Latest-wins stream sampling.
//!
//! [`SampleExt::sample`] bounds how often a stream is observed: at most
//! one item per period, and if several arrive within a period only the
//! freshest survives. Built for high-churn observation streams like
//! [`stats_updates`](crate::CaptureSession::stats_updates), where every
//! intermediate value is superseded by the next one anyway.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait adding [`sample`](SampleExt::sample) to any stream.
pub trait SampleExt: Stream {
    /// Emit at most one item per `period`, keeping only the freshest.
    ///
    /// When the inner stream ends, the last unsampled item (if any) is
    /// emitted before the sampled stream ends too, so the final value is
    /// never lost to the clock.
    fn sample(self, period: Duration) -> Sample<Self>
    where
        Self: Sized,
    {
        Sample::new(self, period)
    }
}

impl<S: Stream> SampleExt for S {}

pin_project! {
    /// Stream combinator produced by [`SampleExt::sample`].
    pub struct Sample<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        latest: Option<S::Item>,
        exhausted: bool,
    }
}

impl<S: Stream> Sample<S> {
    fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        // A stalled consumer should not be paid back with a burst.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { stream, interval, latest: None, exhausted: false }
    }
}

impl<S: Stream> Stream for Sample<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.exhausted {
                return Poll::Ready(this.latest.take());
            }

            // Take everything the source has ready; the freshest wins.
            loop {
                match this.stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(item)) => *this.latest = Some(item),
                    Poll::Ready(None) => {
                        *this.exhausted = true;
                        break;
                    }
                    Poll::Pending => break,
                }
            }
            if *this.exhausted {
                // Flush the final value now, end on the next poll.
                return Poll::Ready(this.latest.take());
            }

            ready!(this.interval.poll_tick(cx));
            if let Some(item) = this.latest.take() {
                return Poll::Ready(Some(item));
            }
            // An empty period; wait out the next one.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    #[tokio::test(start_paused = true)]
    async fn keeps_only_the_freshest_item_per_period() {
        let (tx, rx) = mpsc::channel(16);
        let mut sampled = ReceiverStream::new(rx).sample(Duration::from_millis(100));

        // Three values land inside one period; only the last survives.
        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        tx.send(3).await.unwrap();
        assert_eq!(sampled.next().await, Some(3));

        tx.send(4).await.unwrap();
        drop(tx);
        assert_eq!(sampled.next().await, Some(4));
        assert_eq!(sampled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn an_empty_period_emits_nothing() {
        let (tx, rx) = mpsc::channel(16);
        let mut sampled = ReceiverStream::new(rx).sample(Duration::from_millis(50));

        tx.send("first").await.unwrap();
        assert_eq!(sampled.next().await, Some("first"));

        // Nothing arrives for a while; the stream stays quiet instead of
        // repeating or ending.
        let waited = tokio::time::timeout(Duration::from_millis(200), sampled.next()).await;
        assert!(waited.is_err(), "no item should be emitted for an empty period");

        tx.send("second").await.unwrap();
        assert_eq!(sampled.next().await, Some("second"));
        drop(tx);
        assert_eq!(sampled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn the_final_value_survives_stream_end() {
        let values = futures::stream::iter(vec![10, 20, 30]);
        let mut sampled = values.sample(Duration::from_secs(1));

        // The source ends immediately; the last value must still come out.
        assert_eq!(sampled.next().await, Some(30));
        assert_eq!(sampled.next().await, None);
    }
}
