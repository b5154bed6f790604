//! # IIIF Streamer
//!
//! A IIIF Image API (2.1 and 3.0, level 0) server for tiled pyramidal TIFF
//! and BigTIFF files.
//!
//! JPEG tiles are streamed from their byte range in the file with the
//! level's shared JPEG tables spliced in front, so the common request never
//! decodes a pixel. The only exception is an edge tile requested at its
//! cropped size, which is decoded, cropped and re-encoded.
//!
//! ## Architecture
//!
//! - [`io`] - Positional range reads from local files
//! - [`mod@format`] - TIFF/BigTIFF parser, pyramid model and JPEG splicing
//! - [`iiif`] - Request grammar, tile matching and info.json
//! - [`catalog`] - Identifier to pyramid lookup, loaded once at startup
//! - [`tile`] - Tile service: passthrough streaming and edge transcoding
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use iiif_streamer::{create_router, Catalog, RouterConfig, TileService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Catalog::load_dir("/data/images").await?;
//!     let router = create_router(TileService::new(Arc::new(catalog)), RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod iiif;
pub mod io;
pub mod server;
pub mod tile;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::{CheckConfig, Cli, Command, ServeConfig};
pub use error::{IoError, RequestError, TiffError, TileError};
pub use format::tiff::{
    ByteOrder, Compression, FieldType, Ifd, IfdEntry, PyramidLevel, TiffHeader, TiffPyramid,
    TiffTag, ValueReader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE,
};
pub use format::{merge_jpeg_tables, SplicePlan};
pub use iiif::{
    info_json, match_tile, ApiVersion, IiifPath, ImageParams, ImageRequest, InfoDocument, Region,
    Size, TileMatch,
};
pub use io::{LocalFileReader, RangeReader};
pub use server::{
    create_router, health_handler, iiif_handler, list_handler, AppState, ErrorResponse,
    HealthResponse, ImagesResponse, RouterConfig,
};
pub use tile::{
    is_valid_quality, JpegTileEncoder, TileBody, TileResponse, TileService, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
