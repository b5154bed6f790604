use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Trait for reading byte ranges from a container file.
///
/// The TIFF parser only ever asks for the header, the directories and the
/// value arrays they point to, so a multi-gigabyte pyramid is never read in
/// full. The delivery engine uses the same reads to peek at tile markers.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (used in log lines).
    ///
    /// For local files this is the path as given.
    fn identifier(&self) -> &str;
}
