//! Tile service layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │   Delivery   │  │  JPEG Encoder   │  │
//! │  │  (byte-range │  │  (edge tiles:   │  │
//! │  │   stream)    │  │  decode → crop) │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │                Catalog                  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: resolves identifier and request to a tile and sends it
//! - [`open_passthrough`]: streams tile bytes with JPEG tables spliced in
//! - [`JpegTileEncoder`]: crops edge tiles to their valid content

mod delivery;
mod encoder;
mod service;

pub use delivery::{
    open_passthrough, read_assembled, transcode_edge, SpliceReader, IMMUTABLE_CACHE_CONTROL,
};
pub use encoder::{
    is_valid_quality, JpegTileEncoder, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use service::{TileBody, TileResponse, TileService};
