//! Container parsing and JPEG stream reassembly.
//!
//! - [`tiff`]: TIFF/BigTIFF directory walking and the pyramid model
//! - [`jpeg`]: splicing shared JPEG tables into tile streams

pub mod jpeg;
pub mod tiff;

pub use jpeg::{merge_jpeg_tables, SplicePlan};
pub use tiff::{PyramidLevel, TiffPyramid};
