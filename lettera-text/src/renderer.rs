//! GlyphRenderer: turns one glyph index into a standalone image using the
//! strategy chosen when the font was loaded.
//!
//! The strategy is a closed sum type; dispatch is an exhaustive `match`.

use std::fmt;

use crate::backend::FontBackend;
use crate::glyph::{GlyphIndex, RenderedGlyph};

/// How glyphs are rasterized into the atlas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMethod {
    /// Anti-aliased coverage bitmap at the face's pixel size.
    #[default]
    Bitmap,
    /// Single-channel signed distance field.
    Sdf,
    /// Multi-channel signed distance field.
    Msdf,
}

impl RenderMethod {
    /// Distance-field margin used when none is configured.
    pub fn default_buffer(self) -> i32 {
        match self {
            Self::Bitmap => 0,
            Self::Sdf => 3,
            Self::Msdf => 4,
        }
    }

    /// Whether atlas texels hold distances rather than coverage.
    pub fn is_distance_field(self) -> bool {
        !matches!(self, Self::Bitmap)
    }
}

impl fmt::Display for RenderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bitmap => "bitmap",
            Self::Sdf => "sdf",
            Self::Msdf => "msdf",
        };
        f.write_str(name)
    }
}

/// Renders glyphs with a fixed method and distance-field buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphRenderer {
    method: RenderMethod,
    buffer: i32,
}

impl GlyphRenderer {
    pub fn new(method: RenderMethod, buffer: i32) -> Self {
        Self {
            method,
            buffer: buffer.max(0),
        }
    }

    pub fn method(&self) -> RenderMethod {
        self.method
    }

    pub fn buffer(&self) -> i32 {
        self.buffer
    }

    pub fn set_buffer(&mut self, buffer: i32) {
        self.buffer = buffer.max(0);
    }

    /// Render `glyph` from `face`. `None` means rasterization failed.
    pub fn render(&self, face: &dyn FontBackend, glyph: GlyphIndex) -> Option<RenderedGlyph> {
        match self.method {
            RenderMethod::Bitmap => face.render_bitmap(glyph),
            RenderMethod::Sdf => face.render_sdf(glyph, self.buffer),
            RenderMethod::Msdf => face.render_msdf(glyph, self.buffer),
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
