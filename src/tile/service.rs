//! Image request orchestration.
//!
//! ```text
//! identifier ──► Catalog ──► TiffPyramid
//! params ──► ImageRequest ──► match_tile ──► TileMatch
//!                                   │
//!              native size ◄────────┴────────► smaller (edge)
//!                  │                               │
//!          open_passthrough                  transcode_edge
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::TileError;
use crate::format::tiff::TiffPyramid;
use crate::iiif::{match_tile, ImageParams, ImageRequest, Region, TileMatch};

use super::delivery::{open_passthrough, transcode_edge, SpliceReader};
use super::encoder::JpegTileEncoder;

// =============================================================================
// Tile Response
// =============================================================================

/// Response body for an image request.
pub enum TileBody {
    /// Tile bytes streamed from the container with tables spliced around them
    Stream(SpliceReader),

    /// Re-encoded edge tile
    Buffered(Bytes),
}

/// A resolved image request, ready to send.
pub struct TileResponse {
    pub body: TileBody,

    /// Exact body length
    pub content_length: u64,

    /// The tile that satisfied the request
    pub tile: TileMatch,
}

impl TileResponse {
    /// Whether the bytes come from the container unchanged.
    pub fn is_passthrough(&self) -> bool {
        matches!(self.body, TileBody::Stream(_))
    }
}

// =============================================================================
// Tile Service
// =============================================================================

/// Resolves identifiers and image requests against the catalog.
#[derive(Clone)]
pub struct TileService {
    catalog: Arc<Catalog>,
    encoder: JpegTileEncoder,
}

impl TileService {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_encoder(catalog, JpegTileEncoder::default())
    }

    /// Use `encoder` for edge tiles.
    pub fn with_encoder(catalog: Arc<Catalog>, encoder: JpegTileEncoder) -> Self {
        Self { catalog, encoder }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Look up a pyramid by identifier.
    pub fn pyramid(&self, identifier: &str) -> Result<Arc<TiffPyramid>, TileError> {
        self.catalog
            .get(identifier)
            .ok_or_else(|| TileError::NotFound {
                identifier: identifier.to_string(),
            })
    }

    /// Validate and match an image request without reading any tile data.
    pub fn resolve(
        &self,
        identifier: &str,
        params: &ImageParams,
    ) -> Result<(Arc<TiffPyramid>, TileMatch), TileError> {
        let pyramid = self.pyramid(identifier)?;
        let request = ImageRequest::parse(params, pyramid.width, pyramid.height)?;

        let tile = match_tile(&pyramid, &request).ok_or(match request.region {
            Region::Full => TileError::NoFullSizeMatch {
                width: request.size.width,
                height: request.size.height,
            },
            Region::Rect { x, y, w, h } => TileError::NotTileAligned {
                x,
                y,
                w,
                h,
                out_w: request.size.width,
                out_h: request.size.height,
            },
        })?;

        Ok((pyramid, tile))
    }

    /// Serve an image request.
    ///
    /// Native-size tiles are streamed; smaller edge tiles are transcoded.
    pub async fn get_image(
        &self,
        identifier: &str,
        params: &ImageParams,
    ) -> Result<TileResponse, TileError> {
        let (pyramid, tile) = self.resolve(identifier, params)?;
        let tables = pyramid
            .level(tile.level)
            .and_then(|l| l.jpeg_tables.as_deref());

        if tile.is_native_size() {
            let (reader, content_length) = open_passthrough(&pyramid.path, tables, &tile).await?;
            debug!(
                identifier = identifier,
                level = tile.level,
                tile = tile.tile_index,
                bytes = content_length,
                "Streaming tile"
            );
            return Ok(TileResponse {
                body: TileBody::Stream(reader),
                content_length,
                tile,
            });
        }

        let data = transcode_edge(&pyramid.path, tables, &tile, self.encoder).await?;
        debug!(
            identifier = identifier,
            level = tile.level,
            tile = tile.tile_index,
            width = tile.width,
            height = tile.height,
            "Transcoded edge tile"
        );
        Ok(TileResponse {
            content_length: data.len() as u64,
            body: TileBody::Buffered(data),
            tile,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
