//! Filesystem sink

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::sink::Sink;
use crate::{CaptureError, Result};

/// Sink that appends to a file on disk.
///
/// Writes go through a buffered writer; [`flush`](Sink::flush) pushes the
/// buffer down and syncs file contents to storage, so a flushed reel
/// survives a crash. The file is truncated on creation - a reel is always
/// written from the start.
#[derive(Debug)]
pub struct FileSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
}

impl FileSink {
    /// Create (or truncate) the file at `path` and open it for appending.
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(&path)
            .await
            .map_err(|e| CaptureError::file(path.as_ref().to_path_buf(), e))?;
        debug!("file sink opened at {}", path.as_ref().display());
        Ok(Self { writer: Some(BufWriter::new(file)), path: path.as_ref().to_path_buf() })
    }

    /// Path this sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or_else(|| std::io::Error::other("file sink is closed"))
    }
}

#[async_trait::async_trait]
impl Sink for FileSink {
    async fn append(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer()?.write_all(bytes).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        let writer = self.writer()?;
        writer.flush().await?;
        writer.get_ref().sync_all().await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush().await?;
        writer.get_ref().sync_all().await?;
        debug!("file sink closed at {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_land_in_the_file_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.reel");

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.append(b"hello ").await.unwrap();
        sink.append(b"reel").await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello reel");
    }

    #[tokio::test]
    async fn flush_makes_bytes_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.reel");

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.append(b"durable").await.unwrap();
        sink.flush().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"durable");
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent_and_seals_the_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.reel");

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();

        let err = sink.append(b"late").await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn create_in_a_missing_directory_reports_the_path() {
        let err = FileSink::create("/nonexistent/dir/out.reel").await.unwrap_err();
        assert!(matches!(err, CaptureError::File { .. }));
    }
}
