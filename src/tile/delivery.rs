//! Reading matched tiles out of the container.
//!
//! Two paths:
//!
//! - **Passthrough**: peek at the tile's first and last two bytes, plan the
//!   JPEG table splice, then hand back a reader that yields
//!   `prefix ++ file[range] ++ suffix` straight from the open file. The tile
//!   is never held in memory and the exact length is known up front.
//! - **Edge transcode**: read the whole tile, splice it, then decode, crop
//!   and re-encode on the blocking pool.

use std::io::{Cursor, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Chain, Take};

use crate::error::{IoError, TileError};
use crate::format::jpeg::{merge_jpeg_tables, SplicePlan};
use crate::iiif::TileMatch;
use crate::io::{LocalFileReader, RangeReader};

use super::encoder::JpegTileEncoder;

/// `Cache-Control` for tile responses: published containers never change.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Async reader over an assembled tile stream.
pub type SpliceReader = Chain<Chain<Cursor<Bytes>, Take<File>>, Cursor<Bytes>>;

/// Open `path` and build a reader for the tile described by `tile`.
///
/// Returns the reader and the exact number of bytes it will yield.
pub async fn open_passthrough(
    path: &Path,
    tables: Option<&[u8]>,
    tile: &TileMatch,
) -> Result<(SpliceReader, u64), TileError> {
    let reader = LocalFileReader::open(path).await?;

    let peek = tile.length.min(2);
    let head = reader.read_exact_at(tile.offset, peek as usize).await?;
    let tail = reader
        .read_exact_at(tile.offset + tile.length - peek, peek as usize)
        .await?;

    let plan = SplicePlan::new(tables, tile.length, &head, &tail);
    let content_length = plan.content_length();

    let mut file = reader.into_file();
    file.seek(SeekFrom::Start(tile.offset + plan.body_start))
        .await
        .map_err(IoError::from)?;

    let stream = Cursor::new(plan.prefix)
        .chain(file.take(plan.body_len))
        .chain(Cursor::new(plan.suffix));

    Ok((stream, content_length))
}

/// Read a whole tile and splice in the level's tables.
pub async fn read_assembled(
    path: &Path,
    tables: Option<&[u8]>,
    tile: &TileMatch,
) -> Result<Bytes, TileError> {
    let reader = LocalFileReader::open(path).await?;
    let len = usize::try_from(tile.length).map_err(|_| {
        TileError::Io(IoError::Read(format!("tile of {} bytes", tile.length)))
    })?;
    let raw = reader.read_exact_at(tile.offset, len).await?;
    Ok(merge_jpeg_tables(tables, &raw))
}

/// Read an edge tile and crop it to the matched output size.
pub async fn transcode_edge(
    path: &Path,
    tables: Option<&[u8]>,
    tile: &TileMatch,
    encoder: JpegTileEncoder,
) -> Result<Bytes, TileError> {
    let jpeg = read_assembled(path, tables, tile).await?;
    let (width, height) = (tile.width, tile.height);

    tokio::task::spawn_blocking(move || encoder.crop_encode(&jpeg, width, height))
        .await
        .map_err(|e| TileError::EncodeError {
            message: format!("transcode task failed: {}", e),
        })?
}
