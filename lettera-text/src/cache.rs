//! GlyphCache: rendered glyphs packed into one growable atlas.
//!
//! ```text
//!   clusters ──► prerender ──► miss? ──► GlyphRenderer ──► GlyphAtlas::pack
//!                   │                                           │
//!                   │         entries: glyph → AtlasEntry  ◄────┘
//!                   ▼
//!             dirty? ──► AtlasTexture::upload   (at most once per call)
//! ```
//!
//! The cache only grows. Glyph `0` (the missing-glyph box) is rendered on
//! first use so layout always has something to draw for unknown glyphs.
//! The layout half of the cache lives in [`crate::layout`].

use std::collections::HashMap;

use crate::atlas::{GlyphAtlas, TextureRegion};
use crate::backend::FontBackend;
use crate::config::FontConfig;
use crate::glyph::{is_control_at, GlyphCluster, GlyphIndex, GlyphInfo};
use crate::renderer::{GlyphRenderer, RenderMethod};
use crate::shaper;
use crate::texture::AtlasTexture;

/// A packed glyph: where it sits in the atlas and how to place it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasEntry {
    pub glyph_index: GlyphIndex,
    pub region: TextureRegion,
    pub info: GlyphInfo,
}

pub struct GlyphCache {
    renderer: GlyphRenderer,
    atlas: GlyphAtlas,
    entries: HashMap<GlyphIndex, AtlasEntry>,
    texture: AtlasTexture,
}

impl GlyphCache {
    pub fn new(method: RenderMethod, buffer_width: i32, atlas_width: u32) -> Self {
        Self {
            renderer: GlyphRenderer::new(method, buffer_width),
            atlas: GlyphAtlas::new(atlas_width),
            entries: HashMap::new(),
            texture: AtlasTexture::new(method),
        }
    }

    pub fn from_config(config: &FontConfig) -> Self {
        Self::new(config.method, config.buffer_width, config.atlas_width)
    }

    /// Make sure every glyph in `clusters` (shaped from `text` by `face`)
    /// is packed, then upload the atlas once if anything changed.
    ///
    /// Missing-glyph clusters on control characters are skipped. Returns
    /// `false` if a glyph failed to render or pack; glyphs packed before
    /// the failure stay cached.
    pub fn prerender(&mut self, face: &dyn FontBackend, text: &str, clusters: &[GlyphCluster]) -> bool {
        let mut ok = true;

        if self.entries.is_empty() {
            ok = self.cache_glyph(face, 0);
        }

        if ok {
            for cluster in clusters {
                if cluster.is_missing() && is_control_at(text, cluster.pos) {
                    continue;
                }
                if self.entries.contains_key(&cluster.glyph_index) {
                    continue;
                }
                if !self.cache_glyph(face, cluster.glyph_index) {
                    ok = false;
                    break;
                }
            }
        }

        if self.atlas.is_dirty() {
            self.texture.upload(self.atlas.snapshot());
            self.atlas.mark_clean();
        }
        ok
    }

    /// Shape `text` against `face` alone and prerender the result.
    pub fn preload(&mut self, face: &dyn FontBackend, text: &str) -> bool {
        let clusters = shaper::shape(face, text);
        self.prerender(face, text, &clusters)
    }

    fn cache_glyph(&mut self, face: &dyn FontBackend, glyph: GlyphIndex) -> bool {
        let Some(rendered) = self.renderer.render(face, glyph) else {
            log::warn!("GlyphCache: failed to render glyph {glyph} ({})", self.renderer.method());
            return false;
        };
        let Some(region) = self.atlas.pack(&rendered.image) else {
            log::warn!(
                "GlyphCache: no atlas space for glyph {glyph} ({}x{})",
                rendered.image.width,
                rendered.image.height
            );
            return false;
        };
        self.entries.insert(
            glyph,
            AtlasEntry {
                glyph_index: glyph,
                region,
                info: rendered.info,
            },
        );
        true
    }

    pub fn method(&self) -> RenderMethod {
        self.renderer.method()
    }

    /// Distance-field margin for glyphs rendered from now on.
    pub fn buffer_width(&self) -> i32 {
        self.renderer.buffer()
    }

    /// Set the distance-field margin (clamped to ≥ 0). Already cached
    /// glyphs keep the margin they were rendered with.
    pub fn set_buffer_width(&mut self, width: i32) {
        self.renderer.set_buffer(width);
    }

    pub fn texture(&self) -> &AtlasTexture {
        &self.texture
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn entry(&self, glyph: GlyphIndex) -> Option<&AtlasEntry> {
        self.entries.get(&glyph)
    }

    pub fn entries(&self) -> impl Iterator<Item = &AtlasEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `glyph`, or the missing-glyph entry.
    pub(crate) fn lookup(&self, glyph: GlyphIndex) -> Option<AtlasEntry> {
        self.entries
            .get(&glyph)
            .or_else(|| self.entries.get(&0))
            .copied()
    }
}

// ===================================================================
// Tests
// ===================================================================
