//! Per-font configuration fixed at load time.

use rustybuzz::ttf_parser::Tag;

use crate::atlas::MAX_ATLAS_WIDTH;
use crate::renderer::RenderMethod;

/// Smallest pixel size a face is rasterized at.
pub const MIN_PIXEL_SIZE: u32 = 4;
/// Largest pixel size a face is rasterized at.
pub const MAX_PIXEL_SIZE: u32 = 512;

/// Load-time settings for a [`crate::Font`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontConfig {
    /// Size glyphs are rendered into the atlas at.
    pub pixel_size: u32,
    /// Rendering strategy; never changes after load.
    pub method: RenderMethod,
    /// Distance-field margin in pixels (ignored for bitmaps).
    pub buffer_width: i32,
    /// Atlas texture width in pixels.
    pub atlas_width: u32,
    /// OpenType feature strings, e.g. `"liga"` or `"-calt"`.
    pub features: Vec<String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            pixel_size: 32,
            method: RenderMethod::Bitmap,
            buffer_width: RenderMethod::Bitmap.default_buffer(),
            atlas_width: 512,
            features: Vec::new(),
        }
    }
}

impl FontConfig {
    /// Configuration for `method` at `pixel_size`, with the method's
    /// default buffer width.
    pub fn new(pixel_size: u32, method: RenderMethod) -> Self {
        Self {
            pixel_size: pixel_size.clamp(MIN_PIXEL_SIZE, MAX_PIXEL_SIZE),
            method,
            buffer_width: method.default_buffer(),
            ..Default::default()
        }
    }

    pub fn with_buffer_width(mut self, buffer: i32) -> Self {
        self.buffer_width = buffer.max(0);
        self
    }

    pub fn with_atlas_width(mut self, width: u32) -> Self {
        self.atlas_width = width.clamp(1, MAX_ATLAS_WIDTH);
        self
    }

    pub fn with_features<S: Into<String>>(mut self, features: impl IntoIterator<Item = S>) -> Self {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Pixel size after clamping to the supported range.
    pub fn clamped_pixel_size(&self) -> u32 {
        self.pixel_size.clamp(MIN_PIXEL_SIZE, MAX_PIXEL_SIZE)
    }

    /// Features parsed for the shaper. Invalid tags are dropped.
    pub fn shaping_features(&self) -> Vec<rustybuzz::Feature> {
        parse_features(&self.features)
    }
}

/// Parse feature strings into shaper features.
///
/// Each string is a 4-char OpenType tag, optionally prefixed with `-` to
/// disable it.
pub fn parse_features(strings: &[String]) -> Vec<rustybuzz::Feature> {
    strings
        .iter()
        .filter_map(|s| {
            let (tag_str, value) = match s.strip_prefix('-') {
                Some(rest) => (rest, 0),
                None => (s.as_str(), 1),
            };
            let Ok(bytes) = <[u8; 4]>::try_from(tag_str.as_bytes()) else {
                log::warn!("FontConfig: ignoring invalid feature tag: {s}");
                return None;
            };
            Some(rustybuzz::Feature::new(Tag::from_bytes(&bytes), value, ..))
        })
        .collect()
}

// ===================================================================
// Tests
// ===================================================================
