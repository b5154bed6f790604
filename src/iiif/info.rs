//! IIIF capability documents (`info.json`).
//!
//! Both versions describe the same facts: full size, level-0 tile size,
//! `2^rank` scale factors and the full-image sizes servable without decoding.
//! Only the document shape differs.

use serde::Serialize;

use crate::format::tiff::TiffPyramid;

use super::request::ApiVersion;

/// IIIF protocol identifier.
pub const PROTOCOL: &str = "http://iiif.io/api/image";

/// Level 0 compliance profile for Image API 2.
pub const V2_PROFILE: &str = "http://iiif.io/api/image/2/level0.json";

/// Tile grid description shared by both versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileInfo {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeInfo {
    pub width: u32,
    pub height: u32,
}

/// Extra profile entry of a v2 document.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileV2 {
    pub formats: Vec<&'static str>,
    pub qualities: Vec<&'static str>,
}

/// Image API 2.1 capability document.
#[derive(Debug, Clone, Serialize)]
pub struct InfoV2 {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@id")]
    pub id: String,
    pub protocol: &'static str,
    pub width: u32,
    pub height: u32,
    pub profile: (&'static str, ProfileV2),
    pub tiles: Vec<TileInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<SizeInfo>,
}

/// Image API 3.0 capability document.
#[derive(Debug, Clone, Serialize)]
pub struct InfoV3 {
    #[serde(rename = "@context")]
    pub context: &'static str,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub protocol: &'static str,
    pub profile: &'static str,
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<TileInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<SizeInfo>,
}

/// `{base_url}/iiif/{version}/{encoded identifier}`
pub fn image_id(base_url: &str, version: ApiVersion, identifier: &str) -> String {
    format!(
        "{}/iiif/{}/{}",
        base_url.trim_end_matches('/'),
        version,
        urlencoding::encode(identifier)
    )
}

fn tiles(pyramid: &TiffPyramid) -> Vec<TileInfo> {
    let base = pyramid.base_level();
    vec![TileInfo {
        width: base.tile_width,
        height: base.tile_height,
        scale_factors: pyramid.scale_factors(),
    }]
}

fn sizes(pyramid: &TiffPyramid) -> Vec<SizeInfo> {
    pyramid
        .single_tile_sizes()
        .into_iter()
        .map(|(width, height)| SizeInfo { width, height })
        .collect()
}

/// Build the v2 document for a pyramid.
pub fn info_v2(pyramid: &TiffPyramid, id: String) -> InfoV2 {
    InfoV2 {
        context: ApiVersion::V2.context(),
        id,
        protocol: PROTOCOL,
        width: pyramid.width,
        height: pyramid.height,
        profile: (
            V2_PROFILE,
            ProfileV2 {
                formats: vec!["jpg"],
                qualities: vec!["default"],
            },
        ),
        tiles: tiles(pyramid),
        sizes: sizes(pyramid),
    }
}

/// Build the v3 document for a pyramid.
pub fn info_v3(pyramid: &TiffPyramid, id: String) -> InfoV3 {
    InfoV3 {
        context: ApiVersion::V3.context(),
        id,
        kind: "ImageService3",
        protocol: PROTOCOL,
        profile: "level0",
        width: pyramid.width,
        height: pyramid.height,
        tiles: tiles(pyramid),
        sizes: sizes(pyramid),
    }
}

/// A capability document of either version.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InfoDocument {
    V2(InfoV2),
    V3(InfoV3),
}

/// Build the document for `version`.
pub fn info_json(
    pyramid: &TiffPyramid,
    version: ApiVersion,
    base_url: &str,
    identifier: &str,
) -> InfoDocument {
    let id = image_id(base_url, version, identifier);
    match version {
        ApiVersion::V2 => InfoDocument::V2(info_v2(pyramid, id)),
        ApiVersion::V3 => InfoDocument::V3(info_v3(pyramid, id)),
    }
}
