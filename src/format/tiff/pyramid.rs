//! Pyramid model built from a tiled TIFF or BigTIFF.
//!
//! # Directory traversal
//!
//! Pyramid writers disagree on where reduced resolutions live. Some chain
//! every level through the next-IFD pointer, others hang them off the first
//! IFD through the `SubIFDs` tag, and a few do both. Directories are
//! therefore walked as a graph: a work queue of pending offsets plus a set of
//! visited ones, so each directory is parsed exactly once and cycles end.
//!
//! # Levels
//!
//! Every directory carrying the five geometry tags (ImageWidth, ImageLength,
//! TileWidth, TileLength, Compression) is a level candidate. Candidates are
//! sorted by descending width; the rank in that order gives the scale factor
//! `2^rank`. Nothing in the file records the scale, so a pyramid whose levels
//! do not halve cleanly still loads, it just won't match many requests.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::warn;

use crate::error::TiffError;
use crate::io::{LocalFileReader, RangeReader};

use super::parser::{Ifd, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::{Compression, TiffTag};
use super::values::ValueReader;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of IFDs to parse (safety limit for malformed files)
pub const MAX_IFDS: usize = 1024;

// =============================================================================
// PyramidLevel
// =============================================================================

/// One resolution layer of the pyramid.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Position in descending-width order (0 = full resolution)
    pub rank: usize,

    /// Downsampling factor relative to level 0, `2^rank`
    pub scale: u32,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Native tile width in pixels
    pub tile_width: u32,

    /// Native tile height in pixels
    pub tile_height: u32,

    /// `ceil(width / tile_width)`
    pub tiles_across: u32,

    /// `ceil(height / tile_height)`
    pub tiles_down: u32,

    /// Raw compression code (7 = JPEG)
    pub compression: u16,

    /// Byte offset of each tile, row-major
    pub tile_offsets: Vec<u64>,

    /// Byte length of each tile, index-aligned with `tile_offsets`
    pub tile_byte_counts: Vec<u64>,

    /// Shared JPEG tables, if the level's tiles are abbreviated streams
    pub jpeg_tables: Option<Bytes>,
}

impl PyramidLevel {
    /// Linear tile index for a grid position, `None` if out of range.
    pub fn tile_index(&self, col: u32, row: u32) -> Option<usize> {
        if col >= self.tiles_across || row >= self.tiles_down {
            return None;
        }
        let index = row as u64 * self.tiles_across as u64 + col as u64;
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.tile_offsets.len())
    }

    /// Byte offset and length of a tile.
    pub fn tile_location(&self, index: usize) -> Option<(u64, u64)> {
        Some((
            *self.tile_offsets.get(index)?,
            *self.tile_byte_counts.get(index)?,
        ))
    }

    /// Whether the whole level is stored as one tile.
    pub fn is_single_tile(&self) -> bool {
        self.tiles_across == 1 && self.tiles_down == 1
    }

    /// Whether the level's tiles can be sent without transcoding.
    pub fn is_passthrough(&self) -> bool {
        Compression::from_u16(self.compression)
            .map(Compression::is_passthrough)
            .unwrap_or(false)
    }

    /// Footprint of one tile in full-resolution pixels.
    pub fn scaled_tile_size(&self) -> (u64, u64) {
        (
            self.tile_width as u64 * self.scale as u64,
            self.tile_height as u64 * self.scale as u64,
        )
    }
}

/// A level as read from one directory, before ranking.
#[derive(Debug)]
struct LevelCandidate {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    compression: u16,
    tile_offsets: Vec<u64>,
    tile_byte_counts: Vec<u64>,
    jpeg_tables: Option<Bytes>,
}

// =============================================================================
// TiffPyramid
// =============================================================================

/// A parsed image pyramid. Immutable once built.
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    /// Container file the pyramid was read from
    pub path: PathBuf,

    /// Whether the container uses 64-bit offsets
    pub is_bigtiff: bool,

    /// Full-resolution width (level 0)
    pub width: u32,

    /// Full-resolution height (level 0)
    pub height: u32,

    /// Levels in descending resolution
    pub levels: Vec<PyramidLevel>,
}

impl TiffPyramid {
    /// Open a container on local disk and build its pyramid.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TiffError> {
        let reader = LocalFileReader::open(path.as_ref()).await?;
        Self::parse(&reader, reader.path().to_path_buf()).await
    }

    /// Build a pyramid from any range reader. `path` is recorded for
    /// later tile reads.
    pub async fn parse<R: RangeReader>(reader: &R, path: PathBuf) -> Result<Self, TiffError> {
        let header_len = reader.size().min(BIGTIFF_HEADER_SIZE as u64) as usize;
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::read_directories(reader, &header).await?;

        let mut candidates = Vec::new();
        for ifd in &ifds {
            if let Some(candidate) = Self::read_candidate(reader, &header, ifd).await? {
                candidates.push(candidate);
            }
        }

        Self::build(path, header.is_bigtiff, candidates)
    }

    /// Walk next-IFD and SubIFDs pointers breadth-first from the first IFD.
    async fn read_directories<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut queue = VecDeque::from([header.first_ifd_offset]);
        let mut visited = HashSet::new();
        let mut ifds = Vec::new();

        while let Some(offset) = queue.pop_front() {
            if offset == 0 || !visited.insert(offset) {
                continue;
            }
            if ifds.len() >= MAX_IFDS {
                warn!(
                    file = reader.identifier(),
                    limit = MAX_IFDS,
                    "Directory limit reached, ignoring remaining IFDs"
                );
                break;
            }
            if offset >= reader.size() {
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            let count_bytes = reader.read_exact_at(offset, header.ifd_count_size()).await?;
            let entry_count = header.read_entry_count(&count_bytes);
            let ifd_size =
                Ifd::calculate_size(entry_count, header).ok_or(TiffError::ValueOverflow {
                    what: "IFD entry count",
                    value: entry_count,
                })?;
            let ifd_bytes = reader.read_exact_at(offset, ifd_size).await?;
            let ifd = Ifd::parse(offset, &ifd_bytes, header)?;

            queue.push_back(ifd.next_ifd_offset);
            if let Some(entry) = ifd.get_entry_by_tag(TiffTag::SubIfds) {
                let values = ValueReader::new(reader, header);
                queue.extend(values.read_u64_array(entry).await?);
            }

            ifds.push(ifd);
        }

        Ok(ifds)
    }

    /// Decode a level from a directory, or `None` if it lacks geometry tags.
    async fn read_candidate<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
        ifd: &Ifd,
    ) -> Result<Option<LevelCandidate>, TiffError> {
        let geometry = [
            TiffTag::ImageWidth,
            TiffTag::ImageLength,
            TiffTag::TileWidth,
            TiffTag::TileLength,
            TiffTag::Compression,
        ];
        if !geometry.iter().all(|&tag| ifd.has_tag(tag)) {
            return Ok(None);
        }

        let values = ValueReader::new(reader, header);
        let width = values.read_u32(required(ifd, TiffTag::ImageWidth)?).await?;
        let height = values.read_u32(required(ifd, TiffTag::ImageLength)?).await?;
        let tile_width = values.read_u32(required(ifd, TiffTag::TileWidth)?).await?;
        let tile_height = values.read_u32(required(ifd, TiffTag::TileLength)?).await?;
        let compression = values.read_u64(required(ifd, TiffTag::Compression)?).await?;
        let compression = u16::try_from(compression).map_err(|_| TiffError::ValueOverflow {
            what: "Compression",
            value: compression,
        })?;

        for (tag, value) in [
            (TiffTag::ImageWidth, width),
            (TiffTag::ImageLength, height),
            (TiffTag::TileWidth, tile_width),
            (TiffTag::TileLength, tile_height),
        ] {
            if value == 0 {
                return Err(TiffError::InvalidTagValue {
                    tag: tag.name(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        let tile_offsets = values
            .read_u64_array(required(ifd, TiffTag::TileOffsets)?)
            .await?;
        let tile_byte_counts = values
            .read_u64_array(required(ifd, TiffTag::TileByteCounts)?)
            .await?;

        for (&offset, &len) in tile_offsets.iter().zip(&tile_byte_counts) {
            let end = offset.checked_add(len).ok_or(TiffError::ValueOverflow {
                what: "tile byte range",
                value: offset,
            })?;
            if end > reader.size() {
                return Err(TiffError::InvalidTagValue {
                    tag: TiffTag::TileOffsets.name(),
                    message: format!(
                        "tile at {} with {} bytes ends past end of file ({} bytes)",
                        offset,
                        len,
                        reader.size()
                    ),
                });
            }
        }

        let jpeg_tables = match ifd.get_entry_by_tag(TiffTag::JpegTables) {
            Some(entry) => Some(values.read_raw_bytes(entry).await?),
            None => None,
        };

        Ok(Some(LevelCandidate {
            width,
            height,
            tile_width,
            tile_height,
            compression,
            tile_offsets,
            tile_byte_counts,
            jpeg_tables,
        }))
    }

    /// Rank candidates and check every level's tile tables against its grid.
    fn build(
        path: PathBuf,
        is_bigtiff: bool,
        mut candidates: Vec<LevelCandidate>,
    ) -> Result<Self, TiffError> {
        if candidates.is_empty() {
            return Err(TiffError::NoTiledLevels);
        }

        candidates.sort_by(|a, b| b.width.cmp(&a.width));

        let mut levels = Vec::with_capacity(candidates.len());
        for (rank, c) in candidates.into_iter().enumerate() {
            let scale = u32::try_from(rank)
                .ok()
                .and_then(|r| 1u32.checked_shl(r))
                .ok_or(TiffError::ValueOverflow {
                    what: "scale factor",
                    value: rank as u64,
                })?;

            let tiles_across = c.width.div_ceil(c.tile_width);
            let tiles_down = c.height.div_ceil(c.tile_height);
            let expected = tiles_across as u64 * tiles_down as u64;

            if c.tile_offsets.len() as u64 != expected
                || c.tile_byte_counts.len() as u64 != expected
            {
                return Err(TiffError::TileCountMismatch {
                    expected,
                    offsets: c.tile_offsets.len(),
                    byte_counts: c.tile_byte_counts.len(),
                });
            }

            levels.push(PyramidLevel {
                rank,
                scale,
                width: c.width,
                height: c.height,
                tile_width: c.tile_width,
                tile_height: c.tile_height,
                tiles_across,
                tiles_down,
                compression: c.compression,
                tile_offsets: c.tile_offsets,
                tile_byte_counts: c.tile_byte_counts,
                jpeg_tables: c.jpeg_tables,
            });
        }

        Ok(TiffPyramid {
            path,
            is_bigtiff,
            width: levels[0].width,
            height: levels[0].height,
            levels,
        })
    }

    /// Get a level by rank.
    pub fn level(&self, rank: usize) -> Option<&PyramidLevel> {
        self.levels.get(rank)
    }

    /// Full-resolution level.
    pub fn base_level(&self) -> &PyramidLevel {
        &self.levels[0]
    }

    /// `2^rank` for every level, ascending.
    pub fn scale_factors(&self) -> Vec<u32> {
        self.levels.iter().map(|l| l.scale).collect()
    }

    /// Sizes of JPEG levels stored as exactly one unpadded tile, descending
    /// by width.
    ///
    /// These are the only full-image sizes that can be served without
    /// decoding. A level smaller than its tile is still servable by cropping,
    /// but is not listed.
    pub fn single_tile_sizes(&self) -> Vec<(u32, u32)> {
        self.levels
            .iter()
            .filter(|l| {
                l.is_single_tile()
                    && l.is_passthrough()
                    && l.width == l.tile_width
                    && l.height == l.tile_height
            })
            .map(|l| (l.width, l.height))
            .collect()
    }
}

fn required(ifd: &Ifd, tag: TiffTag) -> Result<&super::parser::IfdEntry, TiffError> {
    ifd.get_entry_by_tag(tag)
        .ok_or(TiffError::MissingTag(tag.name()))
}

// =============================================================================
// Tests
// =============================================================================
