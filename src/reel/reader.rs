//! Reel file reader.
//!
//! Reads the length-prefixed records of a recorded reel back, in order,
//! with validation: a declared length beyond the payload bound or past
//! the end of the file is reported as corruption rather than silently
//! truncated.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use kinescope::reel::ReelReader;
//!
//! fn count_frames() -> kinescope::Result<u64> {
//!     let mut reader = ReelReader::open("capture.reel")?;
//!     while reader.read_next_record()?.is_some() {}
//!     Ok(reader.records_read())
//! }
//! ```

use std::path::{Path, PathBuf};

use super::format::{LENGTH_PREFIX_SIZE, MAX_PAYLOAD_LEN};
use crate::{CaptureError, Result};

/// Sequential reader over a reel file.
///
/// File data is loaded into memory at construction time, matching the
/// size range of capture output this crate produces and keeping record
/// access allocation-light.
#[derive(Debug)]
pub struct ReelReader {
    data: Vec<u8>,
    position: usize,
    path: PathBuf,
    records_read: u64,
}

impl ReelReader {
    /// Open a reel file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(&path)
            .map_err(|e| CaptureError::file(path.as_ref().to_path_buf(), e))?;
        Ok(Self::from_bytes_with_path(data, path.as_ref().to_path_buf()))
    }

    /// Create a reader over in-memory reel bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::from_bytes_with_path(data, PathBuf::from("<memory>"))
    }

    fn from_bytes_with_path(data: Vec<u8>, path: PathBuf) -> Self {
        Self { data, position: 0, path, records_read: 0 }
    }

    /// Read the next record's payload.
    ///
    /// Returns `Ok(None)` at a clean end of file. A file that ends in the
    /// middle of a record - the signature of a crashed or interrupted
    /// writer - fails with [`CaptureError::Corrupt`].
    pub fn read_next_record(&mut self) -> Result<Option<Vec<u8>>> {
        let remaining = self.data.len() - self.position;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < LENGTH_PREFIX_SIZE {
            return Err(CaptureError::corrupt(
                self.context(),
                format!(
                    "length prefix of record {} truncated: {} trailing bytes",
                    self.records_read, remaining
                ),
            ));
        }

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&self.data[self.position..self.position + LENGTH_PREFIX_SIZE]);
        let declared = u32::from_be_bytes(prefix);
        if declared > MAX_PAYLOAD_LEN {
            return Err(CaptureError::corrupt(
                self.context(),
                format!(
                    "record {} declares {} bytes, beyond the {} byte payload bound",
                    self.records_read, declared, MAX_PAYLOAD_LEN
                ),
            ));
        }

        let payload_start = self.position + LENGTH_PREFIX_SIZE;
        let payload_len = declared as usize;
        if self.data.len() - payload_start < payload_len {
            return Err(CaptureError::corrupt(
                self.context(),
                format!(
                    "record {} declares {} bytes but only {} remain",
                    self.records_read,
                    payload_len,
                    self.data.len() - payload_start
                ),
            ));
        }

        let payload = self.data[payload_start..payload_start + payload_len].to_vec();
        self.position = payload_start + payload_len;
        self.records_read += 1;
        Ok(Some(payload))
    }

    /// Number of records read so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Bytes not yet consumed.
    pub fn remaining_bytes(&self) -> usize {
        self.data.len() - self.position
    }

    /// Path this reader was opened from (`<memory>` for byte readers).
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn context(&self) -> String {
        format!("reel {}", self.path.display())
    }
}
