//! OpenType face: the production [`FontBackend`].
//!
//! Shaping, metrics and outlines come from `rustybuzz` (and the
//! `ttf_parser` it re-exports); bitmaps are rasterized by `swash`.
//! The face keeps the raw font bytes and re-borrows a parsed view per call,
//! so it owns no self-referential state. Shape plans don't borrow the face
//! and are built once per script.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rustybuzz::ttf_parser::{name_id, GlyphId};
use rustybuzz::{Direction, Script, ShapePlan, UnicodeBuffer};
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::Format;
use swash::FontRef;

use crate::backend::FontBackend;
use crate::config::FontConfig;
use crate::error::FontError;
use crate::glyph::{FaceProperties, GlyphImage, GlyphIndex, GlyphInfo, RawGlyph, RenderedGlyph};
use crate::outline::{Outline, OutlineCollector};
use crate::renderer::RenderMethod;

/// Number of space advances a tab spans.
const TAB_SPACES: f32 = 4.0;

pub struct OpenTypeFace {
    data: Arc<Vec<u8>>,
    index: u32,
    properties: FaceProperties,
    features: Vec<rustybuzz::Feature>,
    /// Font units to pixels.
    scale: f32,
    /// Keyed by the script guessed for the shaped text; `None` for text
    /// with no script of its own (digits, punctuation, spaces).
    plans: RefCell<HashMap<Option<Script>, ShapePlan>>,
    scale_context: RefCell<ScaleContext>,
}

impl OpenTypeFace {
    /// Parse face `index` of `data` for rendering at the configured size.
    pub fn from_bytes(data: Vec<u8>, index: u32, config: &FontConfig) -> Result<Self, FontError> {
        let face = rustybuzz::Face::from_slice(&data, index).ok_or(FontError::InvalidFont { index })?;
        if FontRef::from_index(&data, index as usize).is_none() {
            return Err(FontError::InvalidFont { index });
        }

        let pixel_size = config.clamped_pixel_size();
        let units_per_em = u16::try_from(face.units_per_em()).unwrap_or(0);
        let scale = pixel_size as f32 / units_per_em.max(1) as f32;

        let space_advance = face
            .glyph_index(' ')
            .and_then(|g| face.glyph_hor_advance(g))
            .map(|a| a as f32 * scale)
            .unwrap_or(pixel_size as f32 * 0.25);

        let properties = FaceProperties {
            family_name: face_name(&face, name_id::FAMILY),
            style_name: face_name(&face, name_id::SUBFAMILY),
            pixel_size,
            ascender: face.ascender() as f32 * scale,
            descender: -(face.descender() as f32) * scale,
            tab_width: space_advance * TAB_SPACES,
            units_per_em,
        };

        log::info!(
            "OpenTypeFace: loaded {} {} at {}px ({} glyphs)",
            properties.family_name,
            properties.style_name,
            pixel_size,
            face.number_of_glyphs(),
        );

        Ok(Self {
            data: Arc::new(data),
            index,
            properties,
            features: config.shaping_features(),
            scale,
            plans: RefCell::new(HashMap::new()),
            scale_context: RefCell::new(ScaleContext::new()),
        })
    }

    /// Read and parse a font file.
    pub fn from_path(path: impl AsRef<Path>, index: u32, config: &FontConfig) -> Result<Self, FontError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data, index, config)
    }

    /// Raw font file bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Face index within a collection file.
    pub fn index(&self) -> u32 {
        self.index
    }

    fn parsed(&self) -> Option<rustybuzz::Face<'_>> {
        rustybuzz::Face::from_slice(&self.data, self.index)
    }

    /// Metrics without image placement.
    fn base_info(&self, face: &rustybuzz::Face<'_>, glyph: GlyphIndex, id: GlyphId) -> GlyphInfo {
        GlyphInfo {
            glyph_index: glyph,
            ascender: self.properties.ascender,
            descender: self.properties.descender,
            x_advance: face.glyph_hor_advance(id).unwrap_or(0) as f32 * self.scale,
            ..Default::default()
        }
    }
}

impl FontBackend for OpenTypeFace {
    fn properties(&self) -> &FaceProperties {
        &self.properties
    }

    fn shape(&self, text: &str) -> Vec<RawGlyph> {
        let Some(face) = self.parsed() else {
            return Vec::new();
        };
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_direction(Direction::LeftToRight);
        buffer.guess_segment_properties();
        let script = Some(buffer.script()).filter(|s| *s != rustybuzz::script::UNKNOWN);

        let mut plans = self.plans.borrow_mut();
        let plan = plans
            .entry(script)
            .or_insert_with(|| ShapePlan::new(&face, Direction::LeftToRight, script, None, &self.features));
        let glyphs = rustybuzz::shape_with_plan(&face, plan, buffer);
        glyphs
            .glyph_infos()
            .iter()
            .map(|info| RawGlyph {
                glyph_index: info.glyph_id,
                cluster: info.cluster,
            })
            .collect()
    }

    fn glyph_info(&self, glyph: GlyphIndex) -> GlyphInfo {
        let (Some(face), Ok(id)) = (self.parsed(), u16::try_from(glyph)) else {
            return GlyphInfo {
                glyph_index: glyph,
                ..Default::default()
            };
        };
        let id = GlyphId(id);
        let mut info = self.base_info(&face, glyph, id);
        if let Some(rect) = face.glyph_bounding_box(id) {
            let left = (rect.x_min as f32 * self.scale).floor() as i32;
            let bottom = (rect.y_min as f32 * self.scale).floor() as i32;
            let right = (rect.x_max as f32 * self.scale).ceil() as i32;
            let top = (rect.y_max as f32 * self.scale).ceil() as i32;
            info.left = left;
            info.top = top;
            info.width = (right - left).max(0) as u32;
            info.height = (top - bottom).max(0) as u32;
        }
        info
    }

    fn render_bitmap(&self, glyph: GlyphIndex) -> Option<RenderedGlyph> {
        let face = self.parsed()?;
        let id = u16::try_from(glyph).ok()?;
        if id >= face.number_of_glyphs() {
            return None;
        }
        let base = self.base_info(&face, glyph, GlyphId(id));

        let font = FontRef::from_index(&self.data, self.index as usize)?;
        let mut context = self.scale_context.borrow_mut();
        let mut scaler = context
            .builder(font)
            .size(self.properties.pixel_size as f32)
            .hint(true)
            .build();

        let rendered = Render::new(&[
            Source::ColorOutline(0),
            Source::ColorBitmap(StrikeWith::BestFit),
            Source::Outline,
        ])
        .format(Format::Alpha)
        .render(&mut scaler, id);

        let Some(rendered) = rendered else {
            // Blank glyphs (space) have no outline to render.
            if face.glyph_bounding_box(GlyphId(id)).is_none() {
                return Some(RenderedGlyph {
                    method: RenderMethod::Bitmap,
                    glyph_index: glyph,
                    image: GlyphImage::default(),
                    info: base,
                });
            }
            log::warn!("OpenTypeFace: failed to rasterize glyph {glyph}");
            return None;
        };

        let p = rendered.placement;
        let image = match rendered.content {
            Content::Mask => GlyphImage::from_alpha(p.width, p.height, &rendered.data),
            Content::Color | Content::SubpixelMask => GlyphImage {
                width: p.width,
                height: p.height,
                data: rendered.data,
            },
        };

        Some(RenderedGlyph {
            method: RenderMethod::Bitmap,
            glyph_index: glyph,
            image,
            info: GlyphInfo {
                left: p.left,
                top: p.top,
                width: p.width,
                height: p.height,
                ..base
            },
        })
    }

    fn outline(&self, glyph: GlyphIndex) -> Option<Outline> {
        let face = self.parsed()?;
        let id = u16::try_from(glyph).ok()?;
        if id >= face.number_of_glyphs() {
            return None;
        }
        let mut collector = OutlineCollector::new(self.scale);
        match face.outline_glyph(GlyphId(id), &mut collector) {
            Some(_) => Some(collector.finish()),
            None => Some(Outline::default()),
        }
    }
}

fn face_name(face: &rustybuzz::Face<'_>, id: u16) -> String {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == id && n.is_unicode())
        .find_map(|n| n.to_string())
        .unwrap_or_default()
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use font_kit::family_name::FamilyName;
    use font_kit::handle::Handle;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    /// Any sans-serif face installed on the machine.
    fn system_face(config: &FontConfig) -> Option<OpenTypeFace> {
        let handle = SystemSource::new()
            .select_best_match(&[FamilyName::SansSerif], &Properties::new())
            .ok()?;
        match handle {
            Handle::Path { path, font_index } => OpenTypeFace::from_path(path, font_index, config).ok(),
            Handle::Memory { bytes, font_index } => {
                OpenTypeFace::from_bytes(bytes.to_vec(), font_index, config).ok()
            }
        }
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        let err = OpenTypeFace::from_bytes(vec![0u8; 16], 0, &FontConfig::default());
        assert!(matches!(err, Err(FontError::InvalidFont { index: 0 })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = OpenTypeFace::from_path("/no/such/font.otf", 0, &FontConfig::default());
        assert!(matches!(err, Err(FontError::Io(_))));
    }

    #[test]
    fn test_system_face_metrics() {
        // No fonts installed: nothing to check.
        let Some(face) = system_face(&FontConfig::default()) else {
            return;
        };
        let props = face.properties();
        assert_eq!(props.pixel_size, 32);
        assert!(props.ascender > 0.0);
        assert!(props.height() > 0.0);
        assert!(props.tab_width > 0.0);
        // OpenType allows 16..=16384 units per em.
        assert!((16..=16384).contains(&props.units_per_em), "{}", props.units_per_em);
    }

    #[test]
    fn test_system_face_shaping() {
        let Some(face) = system_face(&FontConfig::default()) else {
            return;
        };
        let glyphs = face.shape("Hi");
        assert_eq!(glyphs.len(), 2);
        assert!(glyphs.iter().all(|g| g.glyph_index != 0));
        assert_eq!(glyphs[0].cluster, 0);
        assert_eq!(glyphs[1].cluster, 1);
        assert!(face.shape("").is_empty());
    }

    #[test]
    fn test_shape_plan_reused_per_script() {
        let Some(face) = system_face(&FontConfig::default()) else {
            return;
        };
        let first = face.shape("Hi");
        assert_eq!(face.shape("Hello").len(), 5);
        assert_eq!(face.plans.borrow().len(), 1);
        assert_eq!(face.shape("Hi"), first);

        face.shape("λ");
        assert_eq!(face.plans.borrow().len(), 2);
    }

    #[test]
    fn test_system_face_renders_all_methods() {
        let Some(face) = system_face(&FontConfig::default()) else {
            return;
        };
        let h = face.shape("H")[0].glyph_index;

        let bitmap = face.render_bitmap(h).unwrap();
        assert!(!bitmap.image.is_empty());
        assert!(bitmap.info.x_advance > 0.0);

        let sdf = face.render_sdf(h, 3).unwrap();
        assert_eq!(sdf.image.width, sdf.info.width + 6);

        let outline = face.outline(h).unwrap();
        assert!(!outline.is_empty());
    }

    #[test]
    fn test_system_face_space_is_blank() {
        let Some(face) = system_face(&FontConfig::default()) else {
            return;
        };
        let space = face.shape(" ")[0].glyph_index;
        let bitmap = face.render_bitmap(space).unwrap();
        assert!(bitmap.image.is_empty());
        assert!(bitmap.info.x_advance > 0.0);
        assert!(face.outline(space).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_glyph() {
        let Some(face) = system_face(&FontConfig::default()) else {
            return;
        };
        assert!(face.render_bitmap(u32::MAX).is_none());
        assert!(face.outline(u32::MAX).is_none());
    }
}
