//! TIFF tag value reading.
//!
//! Values are stored either inline in the entry's value slot or at an
//! absolute offset in the file. Arrays (TileOffsets, TileByteCounts) are
//! fetched with one read each, then decoded element by element.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from a TIFF file in the file's byte order.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Read the raw bytes of an entry's value.
    ///
    /// Inline values come from the entry itself; everything else is fetched
    /// from the file at the entry's offset.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        let len = usize::try_from(size).map_err(|_| TiffError::ValueOverflow {
            what: "tag value length",
            value: size,
        })?;

        if entry.is_inline {
            return Ok(Bytes::copy_from_slice(&entry.value_offset_bytes[..len]));
        }

        let offset = entry.value_offset(self.header.byte_order);
        Ok(self.reader.read_exact_at(offset, len).await?)
    }

    /// Read a single unsigned integer from an entry of any integer type.
    pub async fn read_u64(&self, entry: &IfdEntry) -> Result<u64, TiffError> {
        if let Some(value) = entry.inline_u64(self.header.byte_order) {
            return Ok(value);
        }

        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.count != 1 {
            return Err(TiffError::InvalidTagValue {
                tag: tag_label(entry.tag_id),
                message: format!("expected count 1, got {}", entry.count),
            });
        }

        let bytes = self.read_bytes(entry).await?;
        self.header
            .byte_order
            .read_uint(field_type, &bytes)
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: tag_label(entry.tag_id),
                message: format!("expected an integer type, got {:?}", field_type),
            })
    }

    /// Read a single value that must fit in `u32` (pixel dimensions).
    pub async fn read_u32(&self, entry: &IfdEntry) -> Result<u32, TiffError> {
        let value = self.read_u64(entry).await?;
        u32::try_from(value).map_err(|_| TiffError::ValueOverflow {
            what: tag_label(entry.tag_id),
            value,
        })
    }

    /// Read an array of unsigned integers.
    ///
    /// Used for TileOffsets, TileByteCounts and SubIFDs. The whole array is
    /// fetched in a single read.
    pub async fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if !field_type.is_integer() {
            return Err(TiffError::InvalidTagValue {
                tag: tag_label(entry.tag_id),
                message: format!("expected an integer array, got {:?}", field_type),
            });
        }

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry).await?;
        let byte_order = self.header.byte_order;

        Ok(bytes
            .chunks_exact(field_type.size_in_bytes())
            .filter_map(|chunk| byte_order.read_uint(field_type, chunk))
            .collect())
    }

    /// Read opaque bytes (JPEGTables).
    pub async fn read_raw_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        self.read_bytes(entry).await
    }
}

fn tag_label(tag_id: u16) -> &'static str {
    super::tags::TiffTag::from_u16(tag_id)
        .map(|t| t.name())
        .unwrap_or("unknown")
}

// =============================================================================
// Tests
// =============================================================================
