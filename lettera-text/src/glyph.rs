//! Glyph data model shared by shaping, rendering, caching and layout.
//!
//! All metrics are in pixels at the face's configured pixel size
//! ([`FaceProperties::pixel_size`]). Layout scales them by
//! `requested_size / pixel_size` at draw time.

use glam::Vec2;

use crate::renderer::RenderMethod;

/// Glyph index within a font face. `0` is the reserved "missing glyph".
pub type GlyphIndex = u32;

/// One entry of raw shaper output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawGlyph {
    /// Glyph index in the shaped face (`0` = not found).
    pub glyph_index: GlyphIndex,
    /// Byte offset of the cluster start in the shaped string.
    pub cluster: u32,
}

/// A shaped glyph tagged with the face that supplied it.
///
/// Clusters produced by one shaping call are in source order. A ligature
/// shows up as one glyph whose `pos` covers several source characters; a
/// decomposition shows up as consecutive entries sharing the same `pos`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphCluster {
    /// Glyph index within the face named by `fallback_index`.
    pub glyph_index: GlyphIndex,
    /// `0` = primary face, `N` = N-th fallback font.
    pub fallback_index: u32,
    /// Byte offset into the source string.
    pub pos: usize,
}

impl GlyphCluster {
    pub fn new(glyph_index: GlyphIndex, fallback_index: u32, pos: usize) -> Self {
        Self {
            glyph_index,
            fallback_index,
            pos,
        }
    }

    /// Whether the face had no glyph for this cluster.
    pub fn is_missing(&self) -> bool {
        self.glyph_index == 0
    }
}

/// Source character at a cluster position, if `pos` is a valid char boundary.
pub fn char_at(text: &str, pos: usize) -> Option<char> {
    text.get(pos..).and_then(|rest| rest.chars().next())
}

/// Whether the source character at `pos` is a control character.
pub(crate) fn is_control_at(text: &str, pos: usize) -> bool {
    char_at(text, pos).is_some_and(char::is_control)
}

/// Per-glyph placement metrics.
///
/// `left`/`top` follow the usual rasterizer convention: `left` is the
/// distance from the pen to the image's left edge, `top` the distance from
/// the baseline up to the image's top edge. `buffer` is the distance-field
/// margin baked around the image (0 for bitmaps).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphInfo {
    pub glyph_index: GlyphIndex,
    pub buffer: i32,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub ascender: f32,
    pub descender: f32,
    pub x_advance: f32,
    pub y_advance: f32,
}

impl GlyphInfo {
    /// Offset from the pen to the image's top-left, pen on the line's top edge.
    pub fn offset(&self, scale: f32) -> Vec2 {
        Vec2::new(
            (self.left - self.buffer) as f32 * scale,
            (self.ascender - self.top as f32 - self.buffer as f32) * scale,
        )
    }

    /// Offset from the pen to the image's top-left, pen on the baseline.
    pub fn base(&self, scale: f32) -> Vec2 {
        Vec2::new(
            (self.left - self.buffer) as f32 * scale,
            (-self.top - self.buffer) as f32 * scale,
        )
    }
}

/// Face-wide metrics at the configured pixel size.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceProperties {
    pub family_name: String,
    pub style_name: String,
    /// Pixel size the face renders at; draw sizes are relative to it.
    pub pixel_size: u32,
    /// Distance from baseline to the top of the line (positive).
    pub ascender: f32,
    /// Distance from baseline to the bottom of the line (positive).
    pub descender: f32,
    /// Advance used for `\t`.
    pub tab_width: f32,
    pub units_per_em: u16,
}

impl FaceProperties {
    /// Line height: ascender + descender.
    pub fn height(&self) -> f32 {
        self.ascender + self.descender
    }
}

/// RGBA8 pixel buffer produced by a glyph renderer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl GlyphImage {
    /// A transparent image of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Expand an 8-bit coverage mask into white RGBA with alpha = coverage.
    pub fn from_alpha(width: u32, height: u32, mask: &[u8]) -> Self {
        let mut data = Vec::with_capacity(mask.len() * 4);
        for &alpha in mask {
            data.extend_from_slice(&[255, 255, 255, alpha]);
        }
        data.resize(width as usize * height as usize * 4, 0);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let px: &[u8; 4] = bytemuck::from_bytes(&self.data[i..i + 4]);
        Some(*px)
    }

    pub(crate) fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = ((y * self.width + x) * 4) as usize;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }
}

/// A glyph rendered by one of the three strategies. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedGlyph {
    pub method: RenderMethod,
    pub glyph_index: GlyphIndex,
    pub image: GlyphImage,
    pub info: GlyphInfo,
}

/// Axis-aligned rectangle returned by layout.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextRect {
    /// The degenerate result of a failed layout.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(top_left: Vec2, width: f32, height: f32) -> Self {
        Self {
            x: top_left.x,
            y: top_left.y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Which point of the text the draw position refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Position is the top-left of the first line.
    #[default]
    TopLeft,
    /// Position is on the first line's baseline.
    Baseline,
}

/// Per-call draw parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// Requested size in pixels.
    pub size: f32,
    /// RGBA tint, each channel in [0.0, 1.0].
    pub color: [f32; 4],
    /// Multiplier applied to the face's line height.
    pub line_height_scale: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 16.0,
            color: [1.0, 1.0, 1.0, 1.0],
            line_height_scale: 1.0,
        }
    }
}

impl TextStyle {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_line_height_scale(mut self, scale: f32) -> Self {
        self.line_height_scale = scale;
        self
    }
}

// ===================================================================
// Tests
// ===================================================================
