//! IIIF Image API request parsing.
//!
//! Turns a request path into one of three shapes and, for image requests,
//! validates the region/size/rotation/quality grammar into a normalized
//! [`ImageRequest`]. All rejection logic lives here; the matcher only ever
//! sees well-formed requests.
//!
//! # Path shapes
//!
//! ```text
//! [{version}/]{identifier}
//! [{version}/]{identifier}/info.json
//! [{version}/]{identifier}/{region}/{size}/{rotation}/{quality}.{format}
//! ```

use std::fmt;

use crate::error::RequestError;

/// The only quality/format combination served.
pub const DEFAULT_QUALITY_FORMAT: &str = "default.jpg";

// =============================================================================
// ApiVersion
// =============================================================================

/// IIIF Image API major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V2,
    V3,
}

impl ApiVersion {
    /// Parse a path prefix or config value ("2" or "3").
    pub fn parse(s: &str) -> Result<Self, RequestError> {
        match s {
            "2" => Ok(ApiVersion::V2),
            "3" => Ok(ApiVersion::V3),
            other => Err(RequestError::UnsupportedVersion(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V2 => "2",
            ApiVersion::V3 => "3",
        }
    }

    /// JSON-LD context of the version's capability document.
    pub fn context(self) -> &'static str {
        match self {
            ApiVersion::V2 => "http://iiif.io/api/image/2/context.json",
            ApiVersion::V3 => "http://iiif.io/api/image/3/context.json",
        }
    }

    /// Content type for the version's capability document.
    pub fn info_content_type(self) -> String {
        format!("application/ld+json;profile=\"{}\"", self.context())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Path
// =============================================================================

/// A request path split into its IIIF shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IiifPath {
    /// Bare identifier; answered with a redirect to `info.json`
    Base {
        version: ApiVersion,
        identifier: String,
    },

    /// Capability document
    Info {
        version: ApiVersion,
        identifier: String,
    },

    /// Image request, parameters still unparsed
    Image {
        version: ApiVersion,
        identifier: String,
        params: ImageParams,
    },
}

/// Raw image request segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    pub region: String,
    pub size: String,
    pub rotation: String,
    pub quality_format: String,
}

impl IiifPath {
    /// Parse the part of the path after the `/iiif/` mount point.
    ///
    /// Segments are percent-decoded individually, so an identifier may
    /// contain an encoded `/`. Unprefixed paths use `default_version`.
    pub fn parse(path: &str, default_version: ApiVersion) -> Result<Self, RequestError> {
        let raw: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let segments = raw
            .iter()
            .map(|s| decode_segment(s))
            .collect::<Result<Vec<_>, _>>()?;

        if segments.iter().any(|s| s.is_empty()) {
            return Err(RequestError::InvalidPath(path.to_string()));
        }

        let versioned = |s: &str| -> Result<ApiVersion, RequestError> {
            if looks_like_version(s) {
                ApiVersion::parse(s)
            } else {
                Err(RequestError::InvalidPath(path.to_string()))
            }
        };

        match segments.as_slice() {
            [id] => Ok(IiifPath::Base {
                version: default_version,
                identifier: id.clone(),
            }),
            [id, info] if info == "info.json" => Ok(IiifPath::Info {
                version: default_version,
                identifier: id.clone(),
            }),
            [v, id] => Ok(IiifPath::Base {
                version: versioned(v)?,
                identifier: id.clone(),
            }),
            [v, id, info] if info == "info.json" => Ok(IiifPath::Info {
                version: versioned(v)?,
                identifier: id.clone(),
            }),
            [id, region, size, rotation, quality_format] => Ok(IiifPath::Image {
                version: default_version,
                identifier: id.clone(),
                params: ImageParams {
                    region: region.clone(),
                    size: size.clone(),
                    rotation: rotation.clone(),
                    quality_format: quality_format.clone(),
                },
            }),
            [v, id, region, size, rotation, quality_format] => Ok(IiifPath::Image {
                version: versioned(v)?,
                identifier: id.clone(),
                params: ImageParams {
                    region: region.clone(),
                    size: size.clone(),
                    rotation: rotation.clone(),
                    quality_format: quality_format.clone(),
                },
            }),
            _ => Err(RequestError::InvalidPath(path.to_string())),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            IiifPath::Base { identifier, .. }
            | IiifPath::Info { identifier, .. }
            | IiifPath::Image { identifier, .. } => identifier,
        }
    }

    pub fn version(&self) -> ApiVersion {
        match self {
            IiifPath::Base { version, .. }
            | IiifPath::Info { version, .. }
            | IiifPath::Image { version, .. } => *version,
        }
    }
}

fn decode_segment(segment: &str) -> Result<String, RequestError> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| RequestError::InvalidPath(format!("{} is not valid UTF-8", segment)))
}

/// A leading all-digit segment is a version prefix, supported or not.
fn looks_like_version(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Region
// =============================================================================

/// Requested region in full-resolution pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Full,
    Rect { x: u32, y: u32, w: u32, h: u32 },
}

impl Region {
    /// Parse `full` or `x,y,w,h` with `w` and `h` positive.
    pub fn parse(s: &str) -> Result<Self, RequestError> {
        if s == "full" {
            return Ok(Region::Full);
        }

        let invalid = || RequestError::InvalidRegion(s.to_string());
        let parts: Vec<&str> = s.split(',').collect();
        let [x, y, w, h] = parts.as_slice() else {
            return Err(invalid());
        };

        let x = parse_uint(x).ok_or_else(invalid)?;
        let y = parse_uint(y).ok_or_else(invalid)?;
        let w = parse_uint(w).filter(|&v| v > 0).ok_or_else(invalid)?;
        let h = parse_uint(h).filter(|&v| v > 0).ok_or_else(invalid)?;

        Ok(Region::Rect { x, y, w, h })
    }

    /// Width and height of the region against an image of the given size.
    pub fn extent(&self, image_width: u32, image_height: u32) -> (u32, u32) {
        match *self {
            Region::Full => (image_width, image_height),
            Region::Rect { w, h, .. } => (w, h),
        }
    }
}

/// Strict unsigned decimal: digits only, no sign, no whitespace.
fn parse_uint(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// =============================================================================
// Size
// =============================================================================

/// Which output dimensions the client constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    /// `full` or `max`: the region at its own size
    Full,
    /// `w,h`
    Exact,
    /// `w,`
    WidthOnly,
    /// `,h`
    HeightOnly,
}

/// Requested output size with both dimensions resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
    pub mode: SizeMode,
}

impl Size {
    /// Parse a size against the region it applies to.
    ///
    /// `w,` and `,h` derive the other side from the region's aspect ratio,
    /// rounding half up.
    pub fn parse(s: &str, region_width: u32, region_height: u32) -> Result<Self, RequestError> {
        let invalid = || RequestError::InvalidSize(s.to_string());

        if s == "full" || s == "max" {
            return Ok(Size {
                width: region_width,
                height: region_height,
                mode: SizeMode::Full,
            });
        }

        let (w, h) = s.split_once(',').ok_or_else(invalid)?;
        let positive = |v: &str| parse_uint(v).filter(|&n| n > 0);

        match (w.is_empty(), h.is_empty()) {
            (false, false) => Ok(Size {
                width: positive(w).ok_or_else(invalid)?,
                height: positive(h).ok_or_else(invalid)?,
                mode: SizeMode::Exact,
            }),
            (false, true) => {
                let width = positive(w).ok_or_else(invalid)?;
                let height = scale_round(region_height, width, region_width).ok_or_else(invalid)?;
                Ok(Size {
                    width,
                    height,
                    mode: SizeMode::WidthOnly,
                })
            }
            (true, false) => {
                let height = positive(h).ok_or_else(invalid)?;
                let width = scale_round(region_width, height, region_height).ok_or_else(invalid)?;
                Ok(Size {
                    width,
                    height,
                    mode: SizeMode::HeightOnly,
                })
            }
            (true, true) => Err(invalid()),
        }
    }

    /// Whether an output of `width` x `height` satisfies this size, looking
    /// only at the constrained dimensions.
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        match self.mode {
            SizeMode::Full | SizeMode::Exact => self.width == width && self.height == height,
            SizeMode::WidthOnly => self.width == width,
            SizeMode::HeightOnly => self.height == height,
        }
    }
}

/// `round(value * numerator / denominator)`, half up, in integer arithmetic.
fn scale_round(value: u32, numerator: u32, denominator: u32) -> Option<u32> {
    if denominator == 0 {
        return None;
    }
    let num = value as u64 * numerator as u64;
    let den = denominator as u64;
    u32::try_from((2 * num + den) / (2 * den)).ok()
}

// =============================================================================
// ImageRequest
// =============================================================================

/// A validated image request. Rotation is always 0 and the output is
/// always `default.jpg` once parsing succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRequest {
    pub region: Region,
    pub size: Size,
}

impl ImageRequest {
    /// Validate raw image parameters against an image of the given size.
    pub fn parse(
        params: &ImageParams,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, RequestError> {
        let region = Region::parse(&params.region)?;
        let (region_width, region_height) = region.extent(image_width, image_height);
        let size = Size::parse(&params.size, region_width, region_height)?;

        if params.rotation != "0" {
            return Err(RequestError::InvalidRotation(params.rotation.clone()));
        }
        if params.quality_format != DEFAULT_QUALITY_FORMAT {
            return Err(RequestError::UnsupportedFormat(params.quality_format.clone()));
        }

        Ok(ImageRequest { region, size })
    }
}

// =============================================================================
// Tests
// =============================================================================
