//! GlyphShaper: string to glyph clusters through the font collaborator.

use crate::backend::FontBackend;
use crate::glyph::{GlyphCluster, GlyphIndex};

/// Shape `text` against `face` alone. Every cluster has `fallback_index == 0`.
pub fn shape(face: &dyn FontBackend, text: &str) -> Vec<GlyphCluster> {
    face.shape(text)
        .into_iter()
        .map(|g| GlyphCluster::new(g.glyph_index, 0, g.cluster as usize))
        .collect()
}

/// Glyph index `face` maps `ch` to, or `0` when shaping does not yield
/// exactly one glyph (missing, or decomposed into several).
pub fn glyph_index_of(face: &dyn FontBackend, ch: &str) -> GlyphIndex {
    match face.shape(ch).as_slice() {
        [only] => only.glyph_index,
        _ => 0,
    }
}

/// Whether `face` displays `ch` with exactly one glyph.
pub fn has_glyph(face: &dyn FontBackend, ch: &str) -> bool {
    glyph_index_of(face, ch) != 0
}

// ===================================================================
// Tests
// ===================================================================
