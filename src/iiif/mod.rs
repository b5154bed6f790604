//! IIIF Image API surface: request grammar, tile matching and capability
//! documents.
//!
//! ```text
//! path ──► IiifPath::parse ──► ImageRequest::parse ──► match_tile ──► TileMatch
//!                         └──► info_json
//! ```

pub mod info;
pub mod matcher;
pub mod request;

pub use info::{image_id, info_json, InfoDocument};
pub use matcher::{match_tile, TileMatch};
pub use request::{ApiVersion, IiifPath, ImageParams, ImageRequest, Region, Size, SizeMode};
