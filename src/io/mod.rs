//! I/O layer: positional byte-range reads from container files.

mod file_reader;
mod range_reader;

pub use file_reader::LocalFileReader;
pub use range_reader::RangeReader;
