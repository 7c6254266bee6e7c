//! Font handles: a face, its glyph cache and its fallback list.
//!
//! [`Font`] is the owning, reference-counted handle; [`WeakFont`] is the
//! non-owning reference stored in fallback lists, so two fonts can fall
//! back on each other without keeping each other alive. Every use of a
//! fallback upgrades it first; an expired one is skipped.
//!
//! Fonts are single-threaded (`Rc`/`RefCell`): one thread drives layout
//! and rendering for a given font.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::rc::{Rc, Weak};

use glam::Vec2;

use crate::backend::FontBackend;
use crate::cache::GlyphCache;
use crate::canvas::GlyphSink;
use crate::config::FontConfig;
use crate::error::FontError;
use crate::face::OpenTypeFace;
use crate::fallback::{FallbackProvider, FallbackResolver};
use crate::glyph::{char_at, Anchor, FaceProperties, GlyphCluster, GlyphIndex, GlyphInfo, TextRect, TextStyle};
use crate::layout::Pen;
use crate::renderer::RenderMethod;
use crate::shaper;
use crate::texture::AtlasTexture;

struct FontData {
    backend: Box<dyn FontBackend>,
    cache: RefCell<GlyphCache>,
    fallbacks: RefCell<Vec<WeakFont>>,
}

/// Owning font handle. Cloning shares the same face and cache.
#[derive(Clone)]
pub struct Font(Rc<FontData>);

/// Non-owning font reference.
#[derive(Clone, Default)]
pub struct WeakFont(Weak<FontData>);

impl WeakFont {
    /// The font, if it is still alive.
    pub fn upgrade(&self) -> Option<Font> {
        self.0.upgrade().map(Font)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(font) => write!(f, "WeakFont({})", font.properties().family_name),
            None => f.write_str("WeakFont(<expired>)"),
        }
    }
}

impl FallbackProvider for Vec<WeakFont> {
    fn fallback_count(&self) -> usize {
        self.len()
    }

    fn shape_with(&self, index: usize, text: &str) -> Option<Vec<GlyphCluster>> {
        let font = self.get(index)?.upgrade()?;
        Some(shaper::shape(font.backend(), text))
    }
}

impl Font {
    /// Wrap a backend with a cache configured by `config`.
    pub fn new(backend: impl FontBackend + 'static, config: &FontConfig) -> Self {
        Self(Rc::new(FontData {
            backend: Box::new(backend),
            cache: RefCell::new(GlyphCache::from_config(config)),
            fallbacks: RefCell::new(Vec::new()),
        }))
    }

    /// Parse face `index` of an in-memory font file.
    pub fn from_bytes(data: Vec<u8>, index: u32, config: &FontConfig) -> Result<Self, FontError> {
        Ok(Self::new(OpenTypeFace::from_bytes(data, index, config)?, config))
    }

    /// Load the first face of a font file.
    pub fn load(path: impl AsRef<Path>, config: &FontConfig) -> Result<Self, FontError> {
        Ok(Self::new(OpenTypeFace::from_path(path, 0, config)?, config))
    }

    pub fn downgrade(&self) -> WeakFont {
        WeakFont(Rc::downgrade(&self.0))
    }

    /// Whether both handles refer to the same font.
    pub fn ptr_eq(&self, other: &Font) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn backend(&self) -> &dyn FontBackend {
        self.0.backend.as_ref()
    }

    pub fn properties(&self) -> &FaceProperties {
        self.0.backend.properties()
    }

    pub fn method(&self) -> RenderMethod {
        self.0.cache.borrow().method()
    }

    // ---------------------------------------------------------------
    // Fallbacks
    // ---------------------------------------------------------------

    /// Append `fallback` to the fallback list. A font can't fall back on
    /// itself.
    pub fn add_fallback(&self, fallback: &Font) -> bool {
        if self.ptr_eq(fallback) {
            log::warn!("Font: ignoring attempt to add a font as its own fallback");
            return false;
        }
        self.0.fallbacks.borrow_mut().push(fallback.downgrade());
        true
    }

    /// Number of registered fallbacks, including expired ones.
    pub fn fallback_count(&self) -> usize {
        self.0.fallbacks.borrow().len()
    }

    /// Fallback at `index` (0-based), if still alive.
    pub fn fallback(&self, index: usize) -> Option<Font> {
        self.0.fallbacks.borrow().get(index)?.upgrade()
    }

    // ---------------------------------------------------------------
    // Glyph queries
    // ---------------------------------------------------------------

    pub fn has_glyph(&self, ch: &str) -> bool {
        shaper::has_glyph(self.backend(), ch)
    }

    pub fn glyph_index(&self, ch: &str) -> GlyphIndex {
        shaper::glyph_index_of(self.backend(), ch)
    }

    pub fn glyph_info(&self, glyph: GlyphIndex) -> GlyphInfo {
        self.0.backend.glyph_info(glyph)
    }

    /// Shape `text`, filling gaps from the fallbacks when `recursive`.
    pub fn clusters(&self, text: &str, recursive: bool) -> Vec<GlyphCluster> {
        let fallbacks = self.0.fallbacks.borrow();
        FallbackResolver::new(&*fallbacks).resolve(self.backend(), text, recursive)
    }

    // ---------------------------------------------------------------
    // Cache
    // ---------------------------------------------------------------

    /// Render every glyph of `text` (primary face only) into the atlas.
    pub fn preload(&self, text: &str) -> bool {
        self.0.cache.borrow_mut().preload(self.backend(), text)
    }

    /// Current atlas texture.
    pub fn texture(&self) -> AtlasTexture {
        self.0.cache.borrow().texture().clone()
    }

    /// Number of cached glyphs.
    pub fn cached_glyphs(&self) -> usize {
        self.0.cache.borrow().len()
    }

    pub fn buffer_width(&self) -> i32 {
        self.0.cache.borrow().buffer_width()
    }

    pub fn set_buffer_width(&self, width: i32) {
        self.0.cache.borrow_mut().set_buffer_width(width);
    }

    // ---------------------------------------------------------------
    // Layout
    // ---------------------------------------------------------------

    /// Draw `text` with `pos` at the top-left of the first line.
    pub fn draw(&self, text: &str, pos: Vec2, style: &TextStyle, sink: &mut dyn GlyphSink) -> TextRect {
        self.layout(text, pos, style, Anchor::TopLeft, Some(sink))
    }

    /// Draw `text` with `pos` on the first line's baseline.
    pub fn draw_base(&self, text: &str, pos: Vec2, style: &TextStyle, sink: &mut dyn GlyphSink) -> TextRect {
        self.layout(text, pos, style, Anchor::Baseline, Some(sink))
    }

    pub fn region(&self, text: &str, pos: Vec2, style: &TextStyle) -> TextRect {
        self.layout(text, pos, style, Anchor::TopLeft, None)
    }

    pub fn region_base(&self, text: &str, pos: Vec2, style: &TextStyle) -> TextRect {
        self.layout(text, pos, style, Anchor::Baseline, None)
    }

    fn layout(
        &self,
        text: &str,
        pos: Vec2,
        style: &TextStyle,
        anchor: Anchor,
        sink: Option<&mut dyn GlyphSink>,
    ) -> TextRect {
        let clusters = self.clusters(text, true);
        if clusters.iter().all(|c| c.fallback_index == 0) {
            return self
                .0
                .cache
                .borrow_mut()
                .layout(self.backend(), text, &clusters, pos, style, anchor, sink);
        }
        self.layout_mixed(text, &clusters, pos, style, anchor, sink)
    }

    /// Layout for clusters drawn from more than one font.
    ///
    /// Each cache is prerendered once up front, then the clusters are
    /// walked with a baseline pen so faces with different ascenders line up.
    fn layout_mixed(
        &self,
        text: &str,
        clusters: &[GlyphCluster],
        pos: Vec2,
        style: &TextStyle,
        anchor: Anchor,
        mut sink: Option<&mut dyn GlyphSink>,
    ) -> TextRect {
        let mut by_font: BTreeMap<u32, Vec<GlyphCluster>> = BTreeMap::new();
        for c in clusters {
            by_font.entry(c.fallback_index).or_default().push(*c);
        }

        // Clusters whose fallback expired draw as the primary missing glyph.
        let mut fonts: BTreeMap<u32, Font> = BTreeMap::new();
        for &index in by_font.keys().filter(|&&i| i > 0) {
            if let Some(font) = self.fallback(index as usize - 1) {
                fonts.insert(index, font);
            }
        }

        let primary = by_font.remove(&0).unwrap_or_default();
        if !self.0.cache.borrow_mut().prerender(self.backend(), text, &primary) {
            return TextRect::ZERO;
        }
        for (index, font) in &fonts {
            let own = by_font.get(index).map(Vec::as_slice).unwrap_or_default();
            if !font.0.cache.borrow_mut().prerender(font.backend(), text, own) {
                return TextRect::ZERO;
            }
        }

        let props = self.properties();
        let mut pen = Pen::new(pos, props, style);
        if anchor == Anchor::TopLeft {
            pen.pos.y += props.ascender * pen.scale;
        }

        for cluster in clusters {
            if cluster.fallback_index == 0 && char_at(text, cluster.pos).is_some_and(|ch| pen.control(ch)) {
                continue;
            }
            let rect = match fonts.get(&cluster.fallback_index) {
                Some(font) => font.0.cache.borrow_mut().layout_cluster(
                    font.backend(),
                    text,
                    cluster,
                    pen.pos,
                    style,
                    Anchor::Baseline,
                    sink.as_mut().map(|s| &mut **s as &mut dyn GlyphSink),
                ),
                None => {
                    let own = if cluster.fallback_index == 0 {
                        *cluster
                    } else {
                        GlyphCluster::new(0, 0, cluster.pos)
                    };
                    self.0.cache.borrow_mut().layout_cluster(
                        self.backend(),
                        text,
                        &own,
                        pen.pos,
                        style,
                        Anchor::Baseline,
                        sink.as_mut().map(|s| &mut **s as &mut dyn GlyphSink),
                    )
                }
            };
            pen.advance(rect.width);
        }

        pen.rect(anchor, props, style)
    }
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = self.properties();
        f.debug_struct("Font")
            .field("family", &props.family_name)
            .field("style", &props.style_name)
            .field("pixel_size", &props.pixel_size)
            .field("method", &self.method())
            .field("fallbacks", &self.fallback_count())
            .finish()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingSink;
    use crate::test_support::MockFace;

    fn latin() -> Font {
        Font::new(MockFace::latin(), &FontConfig::default())
    }

    fn greek() -> Font {
        Font::new(MockFace::new("λμ"), &FontConfig::default())
    }

    #[test]
    fn test_add_fallback_rejects_self() {
        let font = latin();
        assert!(!font.add_fallback(&font.clone()));
        assert_eq!(font.fallback_count(), 0);

        let other = greek();
        assert!(font.add_fallback(&other));
        assert_eq!(font.fallback_count(), 1);
        assert!(font.fallback(0).unwrap().ptr_eq(&other));
        assert!(font.fallback(1).is_none());
    }

    #[test]
    fn test_fallback_is_weak() {
        let font = latin();
        {
            let other = greek();
            font.add_fallback(&other);
            assert!(font.fallback(0).is_some());
        }
        // Dropped: still counted, no longer reachable.
        assert_eq!(font.fallback_count(), 1);
        assert!(font.fallback(0).is_none());
    }

    #[test]
    fn test_mutual_fallbacks_release() {
        let a = latin();
        let b = greek();
        assert!(a.add_fallback(&b));
        assert!(b.add_fallback(&a));
        let weak_a = a.downgrade();
        drop(a);
        assert!(!weak_a.is_alive());
        assert_eq!(b.fallback_count(), 1);
        assert!(b.fallback(0).is_none());
    }

    #[test]
    fn test_clusters_with_fallback() {
        let font = latin();
        let greek = greek();
        font.add_fallback(&greek);

        let clusters = font.clusters("aλb", true);
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[1].fallback_index, 1);
        assert_eq!(clusters[1].glyph_index, greek.glyph_index("λ"));

        let plain = font.clusters("aλb", false);
        assert!(plain[1].is_missing());
    }

    #[test]
    fn test_dead_fallback_skipped() {
        let font = latin();
        let greek = greek();
        {
            let dead = Font::new(MockFace::new("λ"), &FontConfig::default());
            font.add_fallback(&dead);
        }
        font.add_fallback(&greek);
        let clusters = font.clusters("λ", true);
        assert_eq!(clusters[0].fallback_index, 2);
    }

    #[test]
    fn test_glyph_queries() {
        let font = latin();
        assert!(font.has_glyph("A"));
        assert!(!font.has_glyph("λ"));
        assert_ne!(font.glyph_index("A"), 0);
        let info = font.glyph_info(font.glyph_index("A"));
        assert_eq!(info.x_advance, 10.0);
    }

    #[test]
    fn test_preload_and_texture() {
        let font = latin();
        assert!(font.preload("Hello"));
        // Missing glyph + H e l o.
        assert_eq!(font.cached_glyphs(), 5);
        let tex = font.texture();
        assert_eq!(tex.revision(), 1);
        assert!(font.preload("Hello"));
        assert_eq!(font.texture().revision(), 1);
    }

    #[test]
    fn test_buffer_width_roundtrip() {
        let font = Font::new(MockFace::latin(), &FontConfig::new(16, RenderMethod::Msdf));
        assert_eq!(font.buffer_width(), 4);
        font.set_buffer_width(-1);
        assert_eq!(font.buffer_width(), 0);
        assert_eq!(font.method(), RenderMethod::Msdf);
    }

    #[test]
    fn test_draw_without_fallbacks_matches_cache() {
        let font = latin();
        let style = TextStyle::new(16.0);
        let mut sink = RecordingSink::new();
        let rect = font.draw("AB\nC", Vec2::ZERO, &style, &mut sink);
        assert_eq!(rect, TextRect::new(Vec2::ZERO, 20.0, 40.0));
        assert_eq!(sink.len(), 3);
        assert_eq!(font.region("AB\nC", Vec2::ZERO, &style), rect);
    }

    #[test]
    fn test_mixed_draw_uses_both_atlases() {
        let font = latin();
        let greek = greek();
        font.add_fallback(&greek);

        let style = TextStyle::new(16.0);
        let mut sink = RecordingSink::new();
        let rect = font.draw("aλb", Vec2::new(10.0, 0.0), &style, &mut sink);

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.quads[0].texture_id, font.texture().id());
        assert_eq!(sink.quads[1].texture_id, greek.texture().id());
        assert_eq!(sink.quads[2].texture_id, font.texture().id());
        assert_eq!(rect, TextRect::new(Vec2::new(10.0, 0.0), 30.0, 20.0));
        // Same baseline: all glyphs are 10px tall boxes on it.
        assert!(sink.quads.iter().all(|q| q.quad.pos.y == 6.0));
        assert_eq!(font.region("aλb", Vec2::new(10.0, 0.0), &style), rect);
    }

    #[test]
    fn test_mixed_draw_alternating_fonts_share_sink() {
        let font = latin();
        let greek = greek();
        font.add_fallback(&greek);

        let mut sink = RecordingSink::new();
        let rect = font.draw("λaμbλ", Vec2::ZERO, &TextStyle::new(16.0), &mut sink);

        let ids: Vec<u64> = sink.quads.iter().map(|q| q.texture_id).collect();
        let (p, g) = (font.texture().id(), greek.texture().id());
        assert_eq!(ids, vec![g, p, g, p, g]);
        let xs: Vec<f32> = sink.quads.iter().map(|q| q.quad.pos.x).collect();
        assert_eq!(xs, vec![1.0, 11.0, 21.0, 31.0, 41.0]);
        assert_eq!(rect.width, 50.0);
    }

    #[test]
    fn test_mixed_draw_line_breaks() {
        let font = latin();
        let greek = greek();
        font.add_fallback(&greek);
        let style = TextStyle::new(16.0);
        let rect = font.region_base("λ\nab", Vec2::new(0.0, 16.0), &style);
        assert_eq!(rect, TextRect::new(Vec2::ZERO, 20.0, 40.0));
    }

    #[test]
    fn test_mixed_draw_scaled_fallback() {
        let font = latin();
        let mut face = MockFace::new("λ");
        face.set_pixel_size(32);
        let big = Font::new(face, &FontConfig::default());
        font.add_fallback(&big);

        // At 16px the 32px fallback draws at half scale.
        let mut sink = RecordingSink::new();
        let rect = font.draw("aλ", Vec2::ZERO, &TextStyle::new(16.0), &mut sink);
        assert_eq!(sink.quads[1].quad.scale, 0.5);
        assert_eq!(rect.width, 15.0);
    }

    #[test]
    fn test_failed_fallback_render_is_zero_rect() {
        let font = latin();
        let mut face = MockFace::new("λ");
        let lambda = face.glyph_for('λ');
        face.fail_glyph(lambda);
        let greek = Font::new(face, &FontConfig::default());
        font.add_fallback(&greek);
        assert_eq!(font.region("aλ", Vec2::ZERO, &TextStyle::new(16.0)), TextRect::ZERO);
    }
}
