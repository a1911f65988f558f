//! Sink trait for frame persistence targets

/// Trait for byte sinks that persist captured frames.
///
/// Models the filesystem or a downstream encoder process. Opening is the
/// implementor's constructor; the trait only covers the write side. A
/// sink is exclusively owned by one session's writer for its whole
/// lifetime - no concurrent writers exist by construction.
///
/// Methods return `std::io::Result` so implementations stay close to the
/// underlying transport; the frame writer adds pipeline context when it
/// converts failures into [`CaptureError`](crate::CaptureError).
#[async_trait::async_trait]
pub trait Sink: Send + 'static {
    /// Append bytes to the sink.
    async fn append(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Flush buffered bytes to durable storage.
    async fn flush(&mut self) -> std::io::Result<()>;

    /// Flush and release the sink. Idempotent; appends after close fail.
    async fn close(&mut self) -> std::io::Result<()>;
}
