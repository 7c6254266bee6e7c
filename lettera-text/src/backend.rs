//! The font collaborator: shaping, metrics and glyph rasterization.
//!
//! [`crate::face::OpenTypeFace`] is the production implementation. The
//! distance-field renders have default implementations built on
//! [`FontBackend::outline`], so a backend only has to supply outlines to
//! support SDF and MSDF.

use crate::distance;
use crate::glyph::{FaceProperties, GlyphIndex, GlyphInfo, RawGlyph, RenderedGlyph};
use crate::outline::Outline;
use crate::renderer::RenderMethod;

/// A parsed font face at a fixed pixel size.
///
/// Every render method must be a pure function of its inputs: identical
/// calls return identical results, which is what makes caching sound.
pub trait FontBackend {
    /// Face-wide metrics at the configured pixel size.
    fn properties(&self) -> &FaceProperties;

    /// Shape `text` left to right. Glyph index `0` marks a character the
    /// face cannot display; `cluster` is a byte offset into `text`.
    fn shape(&self, text: &str) -> Vec<RawGlyph>;

    /// Advance and ascender for `glyph`, plus its bitmap placement.
    fn glyph_info(&self, glyph: GlyphIndex) -> GlyphInfo;

    /// Anti-aliased coverage bitmap. `None` on rasterization failure.
    fn render_bitmap(&self, glyph: GlyphIndex) -> Option<RenderedGlyph>;

    /// Outline in pixels, y up, origin on the pen. `None` when the face
    /// cannot produce one; an empty outline is a blank glyph.
    fn outline(&self, glyph: GlyphIndex) -> Option<Outline>;

    fn render_sdf(&self, glyph: GlyphIndex, buffer: i32) -> Option<RenderedGlyph> {
        render_field(self, glyph, buffer, RenderMethod::Sdf)
    }

    fn render_msdf(&self, glyph: GlyphIndex, buffer: i32) -> Option<RenderedGlyph> {
        render_field(self, glyph, buffer, RenderMethod::Msdf)
    }
}

fn render_field<B: FontBackend + ?Sized>(
    face: &B,
    glyph: GlyphIndex,
    buffer: i32,
    method: RenderMethod,
) -> Option<RenderedGlyph> {
    let outline = face.outline(glyph)?;
    let info = distance::field_info(face.glyph_info(glyph), &outline, buffer);
    let image = match method {
        RenderMethod::Msdf => distance::render_msdf(&outline, &info),
        _ => distance::render_sdf(&outline, &info),
    };
    Some(RenderedGlyph {
        method,
        glyph_index: glyph,
        image,
        info,
    })
}

// ===================================================================
// Tests
// ===================================================================
