//! Request-to-tile matching.
//!
//! Decides whether a normalized image request is exactly one stored tile.
//! No resampling, cropping or stitching happens downstream, so the match is
//! strict: the region must be a tile's full footprint (shorter at the right
//! and bottom edges) and the output size must be the tile's native size, or
//! the true remaining pixel count for an edge tile.
//!
//! Levels are tried highest resolution first and the first fit wins.

use crate::format::tiff::{PyramidLevel, TiffPyramid};

use super::request::{ImageRequest, Region, Size};

/// The single tile that satisfies a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMatch {
    /// Rank of the matched level
    pub level: usize,

    /// Row-major index within the level
    pub tile_index: usize,

    /// Byte offset of the tile in the container
    pub offset: u64,

    /// Byte length of the tile
    pub length: u64,

    /// Output width the tile satisfies
    pub width: u32,

    /// Output height the tile satisfies
    pub height: u32,

    /// Native tile width of the level
    pub tile_width: u32,

    /// Native tile height of the level
    pub tile_height: u32,
}

impl TileMatch {
    /// Whether the tile's stored pixels are exactly the output, so its bytes
    /// can be streamed as they are.
    pub fn is_native_size(&self) -> bool {
        self.width == self.tile_width && self.height == self.tile_height
    }
}

/// Find the tile that exactly satisfies `request`, if any.
pub fn match_tile(pyramid: &TiffPyramid, request: &ImageRequest) -> Option<TileMatch> {
    match request.region {
        Region::Full => match_full(pyramid, &request.size),
        Region::Rect { x, y, w, h } => {
            // A rectangle covering the whole image is the full region spelled out
            let whole = x == 0 && y == 0 && w == pyramid.width && h == pyramid.height;
            whole
                .then(|| match_full(pyramid, &request.size))
                .flatten()
                .or_else(|| {
                    pyramid
                        .levels
                        .iter()
                        .find_map(|level| match_rect(pyramid, level, (x, y, w, h), &request.size))
                })
        }
    }
}

/// A full-image request is only servable from a level stored as one tile.
fn match_full(pyramid: &TiffPyramid, size: &Size) -> Option<TileMatch> {
    let level = pyramid.levels.iter().find(|l| {
        l.is_single_tile() && l.is_passthrough() && size.accepts(l.width, l.height)
    })?;

    build_match(level, 0, level.width, level.height)
}

fn match_rect(
    pyramid: &TiffPyramid,
    level: &PyramidLevel,
    (x, y, w, h): (u32, u32, u32, u32),
    size: &Size,
) -> Option<TileMatch> {
    let (x, y, w, h) = (x as u64, y as u64, w as u64, h as u64);
    let (scaled_w, scaled_h) = level.scaled_tile_size();
    let (image_w, image_h) = (pyramid.width as u64, pyramid.height as u64);

    if x % scaled_w != 0 || y % scaled_h != 0 || x >= image_w || y >= image_h {
        return None;
    }

    let remaining_w = image_w - x;
    let remaining_h = image_h - y;
    if w != scaled_w.min(remaining_w) || h != scaled_h.min(remaining_h) {
        return None;
    }

    let scale = level.scale as u64;
    let out_w = if remaining_w >= scaled_w {
        level.tile_width
    } else {
        u32::try_from(remaining_w.div_ceil(scale)).ok()?
    };
    let out_h = if remaining_h >= scaled_h {
        level.tile_height
    } else {
        u32::try_from(remaining_h.div_ceil(scale)).ok()?
    };
    if !size.accepts(out_w, out_h) {
        return None;
    }

    let col = u32::try_from(x / scaled_w).ok()?;
    let row = u32::try_from(y / scaled_h).ok()?;
    let index = level.tile_index(col, row)?;
    if !level.is_passthrough() {
        return None;
    }

    build_match(level, index, out_w, out_h)
}

fn build_match(level: &PyramidLevel, index: usize, width: u32, height: u32) -> Option<TileMatch> {
    let (offset, length) = level.tile_location(index)?;
    Some(TileMatch {
        level: level.rank,
        tile_index: index,
        offset,
        length,
        width,
        height,
        tile_width: level.tile_width,
        tile_height: level.tile_height,
    })
}

// =============================================================================
// Tests
// =============================================================================
