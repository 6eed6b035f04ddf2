//! # Raster Loading and Access
//!
//! Loads layer rasters from file paths, data URIs, or raw base64 strings and
//! normalizes everything to RGBA pixels. The pipeline only ever needs pixels
//! with an alpha channel: the optics scanner reads alpha, the audit
//! compositor blends with it.
//!
//! The document store itself is external; [`RasterStore`] is the seam the
//! pipeline consumes it through, addressed by the same stable layer id used
//! throughout the tree. [`MemoryStore`] is the in-process implementation
//! used by the CLI and by tests.

use std::collections::HashMap;
use std::io::Cursor;

use image::RgbaImage;

/// Access to layer pixel content, addressable by stable layer id.
///
/// `None` means the store has no pixels for that id — a normal condition
/// (placeholder layers, unrasterized groups, missing assets), never an
/// error.
pub trait RasterStore {
    fn raster_for_layer(&self, layer_id: &str) -> Option<&RgbaImage>;
}

/// An in-memory raster store backed by a map of decoded images.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rasters: HashMap<String, RgbaImage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert decoded pixels for a layer id, replacing any prior entry.
    pub fn insert(&mut self, layer_id: impl Into<String>, raster: RgbaImage) {
        self.rasters.insert(layer_id.into(), raster);
    }

    /// Load from a source string (see [`load_raster`]) and insert.
    pub fn insert_src(&mut self, layer_id: impl Into<String>, src: &str) -> Result<(), String> {
        let raster = load_raster(src)?;
        self.insert(layer_id, raster);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }
}

impl RasterStore for MemoryStore {
    fn raster_for_layer(&self, layer_id: &str) -> Option<&RgbaImage> {
        self.rasters.get(layer_id)
    }
}

/// Load an RGBA raster from a source string.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` — data URI
/// - File path (absolute or relative with an explicit `./`/`../` prefix)
/// - Raw base64-encoded image data
pub fn load_raster(src: &str) -> Result<RgbaImage, String> {
    let raw_bytes = read_source_bytes(src)?;
    decode_raster_bytes(&raw_bytes)
}

/// Resolve the source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>, String> {
    // Data URI: data:image/png;base64,iVBOR...
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        let b64_data = &src[comma_pos + 1..];
        return base64_decode(b64_data);
    }

    // File path — only match explicit path prefixes to avoid treating base64
    // strings (which contain '/') as file paths.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src)
            .map_err(|e| format!("Failed to read raster file '{}': {}", src, e));
    }

    // Try raw base64
    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| format!("Base64 decode error: {}", e))
}

/// Detect image format from magic bytes and decode to RGBA.
fn decode_raster_bytes(data: &[u8]) -> Result<RgbaImage, String> {
    if data.len() < 4 {
        return Err("Raster data too short".to_string());
    }
    if !is_png(data) && !is_jpeg(data) {
        return Err("Unsupported raster format (expected JPEG or PNG)".to_string());
    }

    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Raster format detection error: {}", e))?;
    let img = reader
        .decode()
        .map_err(|e| format!("Failed to decode raster: {}", e))?;
    Ok(img.to_rgba8())
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}
