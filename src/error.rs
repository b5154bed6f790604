use thiserror::Error;

/// I/O errors that can occur when reading container files
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// Any other failure reported by the operating system
    #[error("Read error: {0}")]
    Read(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(err.to_string()),
            _ => IoError::Read(err.to_string()),
        }
    }
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unknown field type in IFD entry
    #[error("Unsupported field type: {0}")]
    UnknownFieldType(u16),

    /// A value does not fit the integer type it must be used as
    #[error("Value out of range for {what}: {value}")]
    ValueOverflow { what: &'static str, value: u64 },

    /// The tile tables do not cover the tile grid
    #[error("Tile table mismatch: grid needs {expected} tiles, found {offsets} offsets and {byte_counts} byte counts")]
    TileCountMismatch {
        expected: u64,
        offsets: usize,
        byte_counts: usize,
    },

    /// No directory in the file describes a tiled image
    #[error("No tiled pyramid levels found")]
    NoTiledLevels,
}

/// Errors in the IIIF request path, region, size, rotation or format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The path does not have one of the recognised shapes
    #[error("Invalid request path: {0}")]
    InvalidPath(String),

    /// Region is neither `full` nor `x,y,w,h`
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Size is not one of `full`, `max`, `w,h`, `w,` or `,h`
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// Rotation other than `0`
    #[error("Unsupported rotation: {0} (only 0 is supported)")]
    InvalidRotation(String),

    /// Quality/format other than `default.jpg`
    #[error("Unsupported quality or format: {0} (only default.jpg is supported)")]
    UnsupportedFormat(String),

    /// Version prefix other than 2 or 3
    #[error("Unsupported IIIF version: {0}")]
    UnsupportedVersion(String),
}

/// Errors that can occur while serving an image request
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Identifier not present in the catalog
    #[error("Image not found: {identifier}")]
    NotFound { identifier: String },

    /// Malformed request
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Full region requested at a size no single-tile level provides
    #[error("No single-tile level is {width}x{height}; request one of the sizes listed in info.json")]
    NoFullSizeMatch { width: u32, height: u32 },

    /// Region/size pair that does not map onto exactly one stored tile
    #[error("Region {x},{y},{w},{h} at size {out_w}x{out_h} is not aligned to a stored tile")]
    NotTileAligned {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        out_w: u32,
        out_h: u32,
    },

    /// I/O error while reading tile data
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Container structure error discovered while serving
    #[error("Container error: {0}")]
    Container(#[from] TiffError),

    /// Edge tile could not be decoded
    #[error("Failed to decode tile: {message}")]
    DecodeError { message: String },

    /// Edge tile could not be re-encoded
    #[error("Failed to encode tile: {message}")]
    EncodeError { message: String },
}
