//! Text layout: walks clusters with a pen and issues quads from the cache.
//!
//! Every operation prerenders first; if that fails the result is
//! [`TextRect::ZERO`] and nothing is drawn. Drawing and measuring share one
//! routine, so `region` always agrees with `draw`.
//!
//! - `\n` moves the pen to the start of the next line.
//! - `\t` advances by the face's tab width.
//! - Other control characters are skipped.

use glam::Vec2;

use crate::backend::FontBackend;
use crate::cache::{AtlasEntry, GlyphCache};
use crate::canvas::{GlyphQuad, GlyphSink};
use crate::glyph::{char_at, Anchor, FaceProperties, GlyphCluster, TextRect, TextStyle};

/// Pen state for one layout pass.
pub(crate) struct Pen {
    origin: Vec2,
    pub(crate) pos: Vec2,
    line_count: u32,
    x_max: f32,
    pub(crate) scale: f32,
    line_advance: f32,
    tab_advance: f32,
}

impl Pen {
    pub(crate) fn new(origin: Vec2, props: &FaceProperties, style: &TextStyle) -> Self {
        let scale = style.size / props.pixel_size.max(1) as f32;
        Self {
            origin,
            pos: origin,
            line_count: 1,
            x_max: origin.x,
            scale,
            line_advance: style.line_height_scale * props.height() * scale,
            tab_advance: props.tab_width * scale,
        }
    }

    /// Apply `ch` if it is a control character. Returns whether it was.
    pub(crate) fn control(&mut self, ch: char) -> bool {
        match ch {
            '\n' => {
                self.pos.x = self.origin.x;
                self.pos.y += self.line_advance;
                self.line_count += 1;
            }
            '\t' => self.pos.x += self.tab_advance,
            c if c.is_control() => {}
            _ => return false,
        }
        self.x_max = self.x_max.max(self.pos.x);
        true
    }

    /// Move right by `width` pixels (already scaled).
    pub(crate) fn advance(&mut self, width: f32) {
        self.pos.x += width;
        self.x_max = self.x_max.max(self.pos.x);
    }

    pub(crate) fn line_count(&self) -> u32 {
        self.line_count
    }

    /// Bounding rectangle of everything laid out so far.
    pub(crate) fn rect(&self, anchor: Anchor, props: &FaceProperties, style: &TextStyle) -> TextRect {
        let top_left = match anchor {
            Anchor::TopLeft => self.origin,
            Anchor::Baseline => self.origin - Vec2::new(0.0, props.ascender * self.scale),
        };
        TextRect::new(
            top_left,
            self.x_max - self.origin.x,
            self.line_count as f32 * props.height() * self.scale * style.line_height_scale,
        )
    }
}

impl GlyphCache {
    /// Draw with `pos` at the top-left of the first line.
    pub fn draw(
        &mut self,
        face: &dyn FontBackend,
        text: &str,
        clusters: &[GlyphCluster],
        pos: Vec2,
        style: &TextStyle,
        sink: &mut dyn GlyphSink,
    ) -> TextRect {
        self.layout(face, text, clusters, pos, style, Anchor::TopLeft, Some(sink))
    }

    /// Draw with `pos` on the first line's baseline.
    pub fn draw_base(
        &mut self,
        face: &dyn FontBackend,
        text: &str,
        clusters: &[GlyphCluster],
        pos: Vec2,
        style: &TextStyle,
        sink: &mut dyn GlyphSink,
    ) -> TextRect {
        self.layout(face, text, clusters, pos, style, Anchor::Baseline, Some(sink))
    }

    /// Measure what [`GlyphCache::draw`] would cover.
    pub fn region(
        &mut self,
        face: &dyn FontBackend,
        text: &str,
        clusters: &[GlyphCluster],
        pos: Vec2,
        style: &TextStyle,
    ) -> TextRect {
        self.layout(face, text, clusters, pos, style, Anchor::TopLeft, None)
    }

    /// Measure what [`GlyphCache::draw_base`] would cover.
    pub fn region_base(
        &mut self,
        face: &dyn FontBackend,
        text: &str,
        clusters: &[GlyphCluster],
        pos: Vec2,
        style: &TextStyle,
    ) -> TextRect {
        self.layout(face, text, clusters, pos, style, Anchor::Baseline, None)
    }

    /// Draw one already-resolved cluster, top-left anchored. No control
    /// character handling.
    pub fn draw_fallback(
        &mut self,
        face: &dyn FontBackend,
        text: &str,
        cluster: &GlyphCluster,
        pos: Vec2,
        style: &TextStyle,
        sink: &mut dyn GlyphSink,
    ) -> TextRect {
        self.layout_cluster(face, text, cluster, pos, style, Anchor::TopLeft, Some(sink))
    }

    /// Draw one already-resolved cluster, baseline anchored.
    pub fn draw_base_fallback(
        &mut self,
        face: &dyn FontBackend,
        text: &str,
        cluster: &GlyphCluster,
        pos: Vec2,
        style: &TextStyle,
        sink: &mut dyn GlyphSink,
    ) -> TextRect {
        self.layout_cluster(face, text, cluster, pos, style, Anchor::Baseline, Some(sink))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn layout(
        &mut self,
        face: &dyn FontBackend,
        text: &str,
        clusters: &[GlyphCluster],
        pos: Vec2,
        style: &TextStyle,
        anchor: Anchor,
        mut sink: Option<&mut dyn GlyphSink>,
    ) -> TextRect {
        if !self.prerender(face, text, clusters) {
            return TextRect::ZERO;
        }

        let props = face.properties();
        let mut pen = Pen::new(pos, props, style);

        for cluster in clusters {
            if char_at(text, cluster.pos).is_some_and(|ch| pen.control(ch)) {
                continue;
            }
            let Some(entry) = self.lookup(cluster.glyph_index) else {
                continue;
            };
            if let Some(sink) = sink.as_deref_mut() {
                self.emit(sink, &entry, pen.pos, anchor, pen.scale, style);
            }
            pen.advance(entry.info.x_advance * pen.scale);
        }

        pen.rect(anchor, props, style)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn layout_cluster(
        &mut self,
        face: &dyn FontBackend,
        text: &str,
        cluster: &GlyphCluster,
        pos: Vec2,
        style: &TextStyle,
        anchor: Anchor,
        sink: Option<&mut dyn GlyphSink>,
    ) -> TextRect {
        if !self.prerender(face, text, std::slice::from_ref(cluster)) {
            return TextRect::ZERO;
        }

        let props = face.properties();
        let mut pen = Pen::new(pos, props, style);
        if let Some(entry) = self.lookup(cluster.glyph_index) {
            if let Some(sink) = sink {
                self.emit(sink, &entry, pen.pos, anchor, pen.scale, style);
            }
            pen.advance(entry.info.x_advance * pen.scale);
        }
        pen.rect(anchor, props, style)
    }

    fn emit(
        &self,
        sink: &mut dyn GlyphSink,
        entry: &AtlasEntry,
        pen: Vec2,
        anchor: Anchor,
        scale: f32,
        style: &TextStyle,
    ) {
        if entry.region.is_empty() {
            return;
        }
        let offset = match anchor {
            Anchor::TopLeft => entry.info.offset(scale),
            Anchor::Baseline => entry.info.base(scale),
        };
        let distance_range = if self.method().is_distance_field() {
            entry.info.buffer.max(1) as f32
        } else {
            0.0
        };
        sink.draw_glyph(
            self.texture(),
            GlyphQuad {
                region: entry.region,
                pos: pen + offset,
                scale,
                color: style.color,
                distance_range,
            },
        );
    }
}

// ===================================================================
// Tests
// ===================================================================
