//! TIFF and BigTIFF container reader.
//!
//! # Key Concepts
//!
//! - **Byte order**: files declare their endianness (II = little-endian,
//!   MM = big-endian) in the header. Every multi-byte value, including
//!   nested offsets, is read in that order.
//!
//! - **Classic TIFF vs BigTIFF**: classic TIFF uses 32-bit offsets and
//!   12-byte entries, BigTIFF 64-bit offsets and 20-byte entries. The parser
//!   handles both transparently.
//!
//! - **Inline vs offset values**: values that fit in the entry's slot are
//!   stored there, larger ones at the offset the slot holds.

mod parser;
mod pyramid;
mod tags;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pyramid::{PyramidLevel, TiffPyramid, MAX_IFDS};
pub use tags::{compression_name, Compression, FieldType, TiffTag};
pub use values::ValueReader;
