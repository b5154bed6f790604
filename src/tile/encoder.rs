//! Edge-tile transcoder.
//!
//! The only place pixels are touched. An edge tile stores a full native tile
//! whose valid content fills the top-left corner; when a client asks for
//! just that content the tile is decoded, cropped from (0, 0) and encoded
//! again.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;
use std::io::Cursor;

use crate::error::TileError;

/// Default JPEG quality for re-encoded edge tiles.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Decodes a standalone JPEG tile, crops it and re-encodes it.
#[derive(Debug, Clone, Copy)]
pub struct JpegTileEncoder {
    quality: u8,
}

impl Default for JpegTileEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl JpegTileEncoder {
    /// Create an encoder; quality is clamped to 1-100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Decode `source`, keep the `width` x `height` rectangle at the
    /// top-left corner and encode the result.
    ///
    /// A rectangle larger than the decoded image is clipped to it.
    ///
    /// # Errors
    ///
    /// `DecodeError` if `source` is not a decodable JPEG, `EncodeError` if
    /// the cropped pixels cannot be written back out.
    pub fn crop_encode(&self, source: &[u8], width: u32, height: u32) -> Result<Bytes, TileError> {
        let reader = ImageReader::with_format(Cursor::new(source), image::ImageFormat::Jpeg);
        let img = reader.decode().map_err(|e| TileError::DecodeError {
            message: e.to_string(),
        })?;

        let cropped = img.crop_imm(0, 0, width.min(img.width()), height.min(img.height()));

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .encode_image(&cropped)
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

/// Whether `quality` is a valid JPEG quality (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}
