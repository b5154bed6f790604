//! JPEG stream reassembly for tiles that share a `JPEGTables` blob.
//!
//! # Abbreviated JPEG Streams
//!
//! Pyramid writers usually factor the quantization (DQT) and Huffman (DHT)
//! tables out of every tile and store them once per level in the
//! `JPEGTables` tag. Each tile is then an abbreviated stream that a decoder
//! rejects on its own.
//!
//! # Splicing
//!
//! 1. JPEGTables starts with SOI (FFD8) and usually ends with EOI (FFD9)
//! 2. Tile data usually starts with SOI and ends with EOI
//! 3. Output: tables without their EOI, tile without its SOI and EOI, one EOI
//!
//! Only the first and last two bytes of each input are inspected. The
//! compressed payload itself is never parsed, so the splice works the same
//! for any encoder's table layout. Without tables the tile passes through
//! untouched.

use bytes::{Bytes, BytesMut};

// =============================================================================
// JPEG Markers
// =============================================================================

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

// =============================================================================
// SplicePlan
// =============================================================================

/// How to turn a stored tile into a standalone JPEG without holding it in
/// memory: write `prefix`, copy `body_len` bytes of the tile starting
/// `body_start` bytes in, then write `suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplicePlan {
    /// Bytes sent before the tile body (tables minus their EOI)
    pub prefix: Bytes,

    /// Offset of the passthrough span relative to the tile start
    pub body_start: u64,

    /// Length of the passthrough span
    pub body_len: u64,

    /// Bytes sent after the tile body
    pub suffix: Bytes,
}

impl SplicePlan {
    /// Plan the splice for a tile of `tile_len` bytes.
    ///
    /// `head` and `tail` are the tile's first and last (up to) two bytes.
    pub fn new(tables: Option<&[u8]>, tile_len: u64, head: &[u8], tail: &[u8]) -> Self {
        let tables = match tables {
            Some(t) if !t.is_empty() => t,
            _ => {
                return SplicePlan {
                    prefix: Bytes::new(),
                    body_start: 0,
                    body_len: tile_len,
                    suffix: Bytes::new(),
                }
            }
        };

        let tables_end = if tables.ends_with(&EOI) {
            tables.len() - 2
        } else {
            tables.len()
        };

        let skip_head: u64 = if tile_len >= 2 && head.starts_with(&SOI) {
            2
        } else {
            0
        };
        // The trailing EOI must not overlap the SOI already skipped
        let skip_tail: u64 = if tile_len >= skip_head + 2 && tail.ends_with(&EOI) {
            2
        } else {
            0
        };

        SplicePlan {
            prefix: Bytes::copy_from_slice(&tables[..tables_end]),
            body_start: skip_head,
            body_len: tile_len - skip_head - skip_tail,
            suffix: Bytes::from_static(&EOI),
        }
    }

    /// Plan the splice for a tile already in memory.
    pub fn for_tile(tables: Option<&[u8]>, tile: &[u8]) -> Self {
        let head = &tile[..tile.len().min(2)];
        let tail = &tile[tile.len().saturating_sub(2)..];
        Self::new(tables, tile.len() as u64, head, tail)
    }

    /// Exact size of the assembled stream.
    pub fn content_length(&self) -> u64 {
        self.prefix.len() as u64 + self.body_len + self.suffix.len() as u64
    }

    /// Whether the tile is sent exactly as stored.
    pub fn is_passthrough(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty() && self.body_start == 0
    }

    /// Assemble the stream from the full tile bytes.
    pub fn apply(&self, tile: &[u8]) -> Bytes {
        let start = self.body_start as usize;
        let end = start + self.body_len as usize;

        let mut out = BytesMut::with_capacity(self.content_length() as usize);
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(&tile[start..end]);
        out.extend_from_slice(&self.suffix);
        out.freeze()
    }
}

// =============================================================================
// JPEG Tables Merging
// =============================================================================

/// Merge a level's JPEGTables with one tile's bytes into a decodable JPEG.
///
/// Without tables, the tile is returned unchanged.
pub fn merge_jpeg_tables(tables: Option<&[u8]>, tile_data: &[u8]) -> Bytes {
    SplicePlan::for_tile(tables, tile_data).apply(tile_data)
}

// =============================================================================
// Tests
// =============================================================================
