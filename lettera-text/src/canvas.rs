//! Draw target for laid-out glyphs.
//!
//! Layout issues one [`GlyphQuad`] per visible glyph. The GPU crate turns
//! them into instances; [`RecordingSink`] just keeps them.

use glam::Vec2;

use crate::atlas::TextureRegion;
use crate::texture::AtlasTexture;

/// One textured quad: a region of an atlas placed on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphQuad {
    /// Source rectangle in atlas pixels.
    pub region: TextureRegion,
    /// Screen position of the quad's top-left corner.
    pub pos: Vec2,
    /// Uniform scale applied to the region size (1.0 = no resampling).
    pub scale: f32,
    /// RGBA tint.
    pub color: [f32; 4],
    /// Distance-field range in atlas pixels; `0` for coverage bitmaps.
    pub distance_range: f32,
}

impl GlyphQuad {
    /// On-screen size.
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.region.width as f32, self.region.height as f32) * self.scale
    }
}

/// Receives textured-quad draws.
pub trait GlyphSink {
    fn draw_glyph(&mut self, texture: &AtlasTexture, quad: GlyphQuad);
}

/// A recorded draw call.
#[derive(Clone, Debug)]
pub struct RecordedQuad {
    pub texture_id: u64,
    pub texture_revision: u64,
    pub quad: GlyphQuad,
}

/// Sink that stores every draw in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub quads: Vec<RecordedQuad>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    pub fn clear(&mut self) {
        self.quads.clear();
    }
}

impl GlyphSink for RecordingSink {
    fn draw_glyph(&mut self, texture: &AtlasTexture, quad: GlyphQuad) {
        self.quads.push(RecordedQuad {
            texture_id: texture.id(),
            texture_revision: texture.revision(),
            quad,
        });
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderMethod;

    fn quad(width: u32, height: u32, scale: f32) -> GlyphQuad {
        GlyphQuad {
            region: TextureRegion {
                left: 0,
                top: 0,
                width,
                height,
            },
            pos: Vec2::new(3.0, 4.0),
            scale,
            color: [1.0; 4],
            distance_range: 0.0,
        }
    }

    #[test]
    fn test_quad_size_scales_region() {
        assert_eq!(quad(10, 20, 0.5).size(), Vec2::new(5.0, 10.0));
        assert_eq!(quad(0, 20, 2.0).size(), Vec2::new(0.0, 40.0));
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let texture = AtlasTexture::new(RenderMethod::Bitmap);
        let mut sink = RecordingSink::new();
        assert!(sink.is_empty());

        sink.draw_glyph(&texture, quad(1, 1, 1.0));
        sink.draw_glyph(&texture, quad(2, 2, 1.0));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.quads[1].quad.region.width, 2);
        assert_eq!(sink.quads[0].texture_id, texture.id());
        assert_eq!(sink.quads[0].texture_revision, 0);

        sink.clear();
        assert!(sink.is_empty());
    }
}
