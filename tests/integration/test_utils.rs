//! Test utilities for integration tests.
//!
//! Builds TIFF and BigTIFF containers in memory with real JPEG tiles, and
//! writes them to temporary catalog directories.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use tempfile::TempDir;
use tower::ServiceExt;

use iiif_streamer::catalog::Catalog;
use iiif_streamer::server::{create_router, RouterConfig};
use iiif_streamer::tile::TileService;

// =============================================================================
// JPEG Helpers
// =============================================================================

/// Encode a `width` x `height` RGB tile whose pixels depend on `seed`.
pub fn encode_tile(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x + seed * 37) % 256) as u8,
            ((y + seed * 91) % 256) as u8,
            ((x + y + seed) % 256) as u8,
        ])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 85)
        .encode_image(&img)
        .unwrap();
    buf
}

/// Split a complete JPEG into a tables blob (`SOI ... EOI`) and an
/// abbreviated stream (`SOI` + scan data), the way TIFF stores them.
pub fn split_tables(jpeg: &[u8]) -> (Vec<u8>, Vec<u8>) {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    let mut pos = 2;
    loop {
        assert_eq!(jpeg[pos], 0xFF, "expected a marker at {}", pos);
        let marker = jpeg[pos + 1];
        if marker == 0xDA {
            break;
        }
        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        pos += 2 + len;
    }

    let mut tables = jpeg[..pos].to_vec();
    tables.extend_from_slice(&[0xFF, 0xD9]);

    let mut tile = vec![0xFF, 0xD8];
    tile.extend_from_slice(&jpeg[pos..]);

    (tables, tile)
}

/// Dimensions of an encoded JPEG.
pub fn jpeg_dimensions(jpeg: &[u8]) -> (u32, u32) {
    ImageReader::with_format(Cursor::new(jpeg), image::ImageFormat::Jpeg)
        .into_dimensions()
        .unwrap()
}

pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[..2] == [0xFF, 0xD8] && data[data.len() - 2..] == [0xFF, 0xD9]
}

// =============================================================================
// TIFF Builder
// =============================================================================

/// One directory of a test container.
#[derive(Clone)]
pub struct LevelSpec {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub compression: u16,
    pub tiles: Vec<Vec<u8>>,
    pub jpeg_tables: Option<Vec<u8>>,
}

/// How directories after the first are reached.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Each directory's next-offset points at the following one
    Chain,
    /// All other directories are listed in the first one's SubIFDs tag
    SubIfds,
}

pub struct TiffBuilder {
    big_endian: bool,
    bigtiff: bool,
    layout: Layout,
    levels: Vec<LevelSpec>,
}

struct Entry {
    tag: u16,
    field_type: u16,
    count: u64,
    data: Vec<u8>,
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            big_endian: false,
            bigtiff: false,
            layout: Layout::Chain,
            levels: Vec::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn bigtiff(mut self) -> Self {
        self.bigtiff = true;
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn level(mut self, level: LevelSpec) -> Self {
        self.levels.push(level);
        self
    }

    fn u16(&self, v: u16) -> [u8; 2] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    fn u32(&self, v: u32) -> [u8; 4] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    fn u64(&self, v: u64) -> [u8; 8] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    /// Offset-sized value: LONG in classic TIFF, LONG8 in BigTIFF.
    fn offsets_entry(&self, tag: u16, values: &[u64]) -> Entry {
        let mut data = Vec::new();
        for &v in values {
            if self.bigtiff {
                data.extend_from_slice(&self.u64(v));
            } else {
                data.extend_from_slice(&self.u32(v as u32));
            }
        }
        Entry {
            tag,
            field_type: if self.bigtiff { 16 } else { 4 },
            count: values.len() as u64,
            data,
        }
    }

    fn long_entry(&self, tag: u16, v: u32) -> Entry {
        Entry {
            tag,
            field_type: 4,
            count: 1,
            data: self.u32(v).to_vec(),
        }
    }

    fn short_entry(&self, tag: u16, v: u16) -> Entry {
        Entry {
            tag,
            field_type: 3,
            count: 1,
            data: self.u16(v).to_vec(),
        }
    }

    fn slot_size(&self) -> usize {
        if self.bigtiff {
            8
        } else {
            4
        }
    }

    fn block_size(&self, entries: &[Entry]) -> usize {
        let (count, entry, next) = if self.bigtiff { (8, 20, 8) } else { (2, 12, 4) };
        let overflow: usize = entries
            .iter()
            .filter(|e| e.data.len() > self.slot_size())
            .map(|e| e.data.len() + e.data.len() % 2)
            .sum();
        count + entries.len() * entry + next + overflow
    }

    /// Serialize the container.
    pub fn build(&self) -> Vec<u8> {
        assert!(!self.levels.is_empty());

        let mut out = Vec::new();
        out.extend_from_slice(if self.big_endian { b"MM" } else { b"II" });
        if self.bigtiff {
            out.extend_from_slice(&self.u16(43));
            out.extend_from_slice(&self.u16(8));
            out.extend_from_slice(&self.u16(0));
            out.extend_from_slice(&self.u64(0));
        } else {
            out.extend_from_slice(&self.u16(42));
            out.extend_from_slice(&self.u32(0));
        }

        // Tile data
        let mut locations = Vec::new();
        for level in &self.levels {
            let mut offsets = Vec::new();
            let mut counts = Vec::new();
            for tile in &level.tiles {
                offsets.push(out.len() as u64);
                counts.push(tile.len() as u64);
                out.extend_from_slice(tile);
            }
            locations.push((offsets, counts));
        }
        if out.len() % 2 == 1 {
            out.push(0);
        }

        // Directory entries, SubIFDs patched once offsets are known
        let sub_ifd_count = self.levels.len() - 1;
        let mut directories: Vec<Vec<Entry>> = self
            .levels
            .iter()
            .zip(&locations)
            .enumerate()
            .map(|(i, (level, (offsets, counts)))| {
                let mut entries = vec![
                    self.long_entry(256, level.width),
                    self.long_entry(257, level.height),
                    self.short_entry(259, level.compression),
                    self.long_entry(322, level.tile_width),
                    self.long_entry(323, level.tile_height),
                    self.offsets_entry(324, offsets),
                    self.offsets_entry(325, counts),
                ];
                if i == 0 && self.layout == Layout::SubIfds && sub_ifd_count > 0 {
                    entries.push(self.offsets_entry(330, &vec![0; sub_ifd_count]));
                }
                if let Some(tables) = &level.jpeg_tables {
                    entries.push(Entry {
                        tag: 347,
                        field_type: 7,
                        count: tables.len() as u64,
                        data: tables.clone(),
                    });
                }
                entries
            })
            .collect();

        let mut ifd_offsets = Vec::new();
        let mut pos = out.len();
        for entries in &directories {
            ifd_offsets.push(pos as u64);
            pos += self.block_size(entries);
        }

        if self.layout == Layout::SubIfds && sub_ifd_count > 0 {
            let patched = self.offsets_entry(330, &ifd_offsets[1..]);
            if let Some(entry) = directories[0].iter_mut().find(|e| e.tag == 330) {
                *entry = patched;
            }
        }

        for (i, entries) in directories.iter().enumerate() {
            let start = out.len();
            assert_eq!(start as u64, ifd_offsets[i]);

            let (count_size, entry_size, next_size) =
                if self.bigtiff { (8, 20, 8) } else { (2, 12, 4) };
            let mut overflow_pos = start + count_size + entries.len() * entry_size + next_size;
            let mut overflow = Vec::new();

            if self.bigtiff {
                out.extend_from_slice(&self.u64(entries.len() as u64));
            } else {
                out.extend_from_slice(&self.u16(entries.len() as u16));
            }

            for entry in entries {
                out.extend_from_slice(&self.u16(entry.tag));
                out.extend_from_slice(&self.u16(entry.field_type));
                if self.bigtiff {
                    out.extend_from_slice(&self.u64(entry.count));
                } else {
                    out.extend_from_slice(&self.u32(entry.count as u32));
                }

                let slot = self.slot_size();
                if entry.data.len() <= slot {
                    let mut inline = entry.data.clone();
                    inline.resize(slot, 0);
                    out.extend_from_slice(&inline);
                } else {
                    if self.bigtiff {
                        out.extend_from_slice(&self.u64(overflow_pos as u64));
                    } else {
                        out.extend_from_slice(&self.u32(overflow_pos as u32));
                    }
                    overflow.extend_from_slice(&entry.data);
                    if entry.data.len() % 2 == 1 {
                        overflow.push(0);
                    }
                    overflow_pos += entry.data.len() + entry.data.len() % 2;
                }
            }

            let next = match self.layout {
                Layout::Chain if i + 1 < ifd_offsets.len() => ifd_offsets[i + 1],
                _ => 0,
            };
            if self.bigtiff {
                out.extend_from_slice(&self.u64(next));
            } else {
                out.extend_from_slice(&self.u32(next as u32));
            }
            out.extend_from_slice(&overflow);
        }

        // First directory offset
        if self.bigtiff {
            let bytes = self.u64(ifd_offsets[0]);
            out[8..16].copy_from_slice(&bytes);
        } else {
            let bytes = self.u32(ifd_offsets[0] as u32);
            out[4..8].copy_from_slice(&bytes);
        }

        out
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A built container plus the exact bytes each passthrough tile should be
/// served as, indexed `[level][tile]`.
pub struct Fixture {
    pub data: Vec<u8>,
    pub expected: Vec<Vec<Vec<u8>>>,
}

/// A level of `width` x `height` cut into full-size JPEG tiles of `tile`
/// pixels, each tile distinct.
///
/// With `shared_tables` the tiles are stored abbreviated and the level
/// carries a JPEGTables blob.
pub fn jpeg_level(
    width: u32,
    height: u32,
    tile: u32,
    seed: u32,
    shared_tables: bool,
) -> (LevelSpec, Vec<Vec<u8>>) {
    let count = width.div_ceil(tile) * height.div_ceil(tile);
    let mut stored = Vec::new();
    let mut expected = Vec::new();
    let mut tables = None;

    for i in 0..count {
        let full = encode_tile(tile, tile, seed * 100 + i);
        if shared_tables {
            let (level_tables, abbreviated) = split_tables(&full);
            let mut served = level_tables[..level_tables.len() - 2].to_vec();
            served.extend_from_slice(&abbreviated[2..]);
            if tables.is_none() {
                tables = Some(level_tables);
            }
            stored.push(abbreviated);
            expected.push(served);
        } else {
            stored.push(full.clone());
            expected.push(full);
        }
    }

    (
        LevelSpec {
            width,
            height,
            tile_width: tile,
            tile_height: tile,
            compression: 7,
            tiles: stored,
            jpeg_tables: tables,
        },
        expected,
    )
}

/// 1000x700 image with 256px tiles over three levels (1000x700, 500x350,
/// 250x175). The top level is a single padded tile.
pub fn sample_pyramid(builder: TiffBuilder, shared_tables: bool) -> Fixture {
    let mut builder = builder;
    let mut expected = Vec::new();
    for (rank, (w, h)) in [(1000, 700), (500, 350), (250, 175)].into_iter().enumerate() {
        let (level, served) = jpeg_level(w, h, 256, rank as u32 + 1, shared_tables);
        builder = builder.level(level);
        expected.push(served);
    }
    Fixture {
        data: builder.build(),
        expected,
    }
}

/// 512x512 image with 256px tiles whose top level is exactly one tile.
pub fn square_pyramid() -> Fixture {
    let (base, base_tiles) = jpeg_level(512, 512, 256, 7, false);
    let (top, top_tiles) = jpeg_level(256, 256, 256, 8, false);
    Fixture {
        data: TiffBuilder::new().level(base).level(top).build(),
        expected: vec![base_tiles, top_tiles],
    }
}

// =============================================================================
// Catalog and Router
// =============================================================================

/// Write files into a fresh temporary directory.
pub fn catalog_dir<D: AsRef<[u8]>>(files: &[(&str, D)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, data) in files {
        std::fs::write(dir.path().join(name), data.as_ref()).unwrap();
    }
    dir
}

/// Load `dir` and build a router with a fixed base URL and tracing off.
pub async fn router_for(dir: &TempDir, config: RouterConfig) -> Router {
    let catalog = Catalog::load_dir(dir.path()).await.unwrap();
    create_router(TileService::new(Arc::new(catalog)), config.with_tracing(false))
}

pub fn test_config() -> RouterConfig {
    RouterConfig::new().with_base_url("http://example.org")
}

pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
