//! Local file implementation of [`RangeReader`].
//!
//! Each reader owns one open file handle. Reads seek and fill exactly the
//! requested span; the handle is guarded by an async mutex so a reader can
//! be shared across tasks, but the catalog and the delivery engine both open
//! a fresh reader per use so nothing contends on it in practice.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

use crate::error::IoError;

use super::RangeReader;

/// Range reader over a file on local disk.
pub struct LocalFileReader {
    path: PathBuf,
    identifier: String,
    size: u64,
    file: Mutex<File>,
}

impl LocalFileReader {
    /// Open `path` for reading and record its length.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        let size = file.metadata().await?.len();

        Ok(Self {
            identifier: path.display().to_string(),
            path,
            size,
            file: Mutex::new(file),
        })
    }

    /// Path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Give up range access and hand back the underlying file handle.
    ///
    /// Used by the delivery engine once it has peeked at a tile's markers and
    /// wants to stream the body from the same handle.
    pub fn into_file(self) -> File {
        self.file.into_inner()
    }
}

#[async_trait]
impl RangeReader for LocalFileReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let out_of_bounds = IoError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size: self.size,
        };
        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| out_of_bounds.clone())?;
        if end > self.size {
            return Err(out_of_bounds);
        }

        let mut buf = vec![0u8; len];
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.read_exact(&mut buf).await?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
