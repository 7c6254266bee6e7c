//! Deterministic in-memory font for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use rustybuzz::ttf_parser::OutlineBuilder;

use crate::backend::FontBackend;
use crate::glyph::{FaceProperties, GlyphImage, GlyphIndex, GlyphInfo, RawGlyph, RenderedGlyph};
use crate::outline::{Outline, OutlineCollector};
use crate::renderer::RenderMethod;

pub(crate) const LATIN: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 ";

/// Box size and advance of one mock glyph.
#[derive(Clone, Copy, Debug)]
struct MockGlyph {
    width: u32,
    height: u32,
    advance: f32,
}

/// A face whose glyphs are solid boxes sitting on the baseline.
///
/// Glyph `n` covers `(1, 0)..(1 + width, height)`. Ascender 16, descender 4,
/// pixel size 16, so line height is 20 at scale 1.
pub(crate) struct MockFace {
    properties: FaceProperties,
    chars: HashMap<char, GlyphIndex>,
    /// Sequences shaped into the listed glyphs, all at the sequence start.
    sequences: Vec<(String, Vec<GlyphIndex>)>,
    glyphs: HashMap<GlyphIndex, MockGlyph>,
    failing: HashSet<GlyphIndex>,
    next_glyph: GlyphIndex,
    shape_calls: Cell<usize>,
    shaped: RefCell<Vec<String>>,
}

impl MockFace {
    /// A face covering `chars`, glyph ids assigned in order starting at 1.
    pub(crate) fn new(chars: &str) -> Self {
        let mut face = Self {
            properties: FaceProperties {
                family_name: "Mock".into(),
                style_name: "Regular".into(),
                pixel_size: 16,
                ascender: 16.0,
                descender: 4.0,
                tab_width: 20.0,
                units_per_em: 1000,
            },
            chars: HashMap::new(),
            sequences: Vec::new(),
            glyphs: HashMap::new(),
            failing: HashSet::new(),
            next_glyph: 1,
            shape_calls: Cell::new(0),
            shaped: RefCell::new(Vec::new()),
        };
        // Missing-glyph box.
        face.glyphs.insert(
            0,
            MockGlyph {
                width: 6,
                height: 10,
                advance: 8.0,
            },
        );
        for ch in chars.chars() {
            face.add_char(ch);
        }
        face
    }

    pub(crate) fn latin() -> Self {
        Self::new(LATIN)
    }

    pub(crate) fn add_char(&mut self, ch: char) -> GlyphIndex {
        if let Some(&g) = self.chars.get(&ch) {
            return g;
        }
        let g = self.next_glyph;
        self.next_glyph += 1;
        let glyph = if ch == ' ' {
            MockGlyph {
                width: 0,
                height: 0,
                advance: 5.0,
            }
        } else {
            MockGlyph {
                width: 8,
                height: 10,
                advance: 10.0,
            }
        };
        self.chars.insert(ch, g);
        self.glyphs.insert(g, glyph);
        g
    }

    /// Shape `seq` into a single new glyph (a ligature). Returns its index.
    pub(crate) fn add_ligature(&mut self, seq: &str) -> GlyphIndex {
        let g = self.next_glyph;
        self.next_glyph += 1;
        self.glyphs.insert(
            g,
            MockGlyph {
                width: 14,
                height: 10,
                advance: 16.0,
            },
        );
        self.sequences.push((seq.to_string(), vec![g]));
        g
    }

    /// Shape `seq` into the given glyphs, all sharing the sequence's cluster.
    pub(crate) fn add_sequence(&mut self, seq: &str, glyphs: Vec<GlyphIndex>) {
        self.sequences.push((seq.to_string(), glyphs));
    }

    pub(crate) fn glyph_for(&self, ch: char) -> GlyphIndex {
        self.chars[&ch]
    }

    pub(crate) fn set_glyph_size(&mut self, glyph: GlyphIndex, width: u32, height: u32) {
        if let Some(g) = self.glyphs.get_mut(&glyph) {
            g.width = width;
            g.height = height;
        }
    }

    pub(crate) fn set_advance(&mut self, glyph: GlyphIndex, advance: f32) {
        if let Some(g) = self.glyphs.get_mut(&glyph) {
            g.advance = advance;
        }
    }

    pub(crate) fn set_pixel_size(&mut self, pixel_size: u32) {
        self.properties.pixel_size = pixel_size;
    }

    /// Make every render of `glyph` fail.
    pub(crate) fn fail_glyph(&mut self, glyph: GlyphIndex) {
        self.failing.insert(glyph);
    }

    pub(crate) fn shape_calls(&self) -> usize {
        self.shape_calls.get()
    }

    /// Every string passed to `shape`, in call order.
    pub(crate) fn shaped_texts(&self) -> Vec<String> {
        self.shaped.borrow().clone()
    }

    fn renderable(&self, glyph: GlyphIndex) -> Option<MockGlyph> {
        if self.failing.contains(&glyph) {
            return None;
        }
        self.glyphs.get(&glyph).copied()
    }
}

impl FontBackend for MockFace {
    fn properties(&self) -> &FaceProperties {
        &self.properties
    }

    fn shape(&self, text: &str) -> Vec<RawGlyph> {
        self.shape_calls.set(self.shape_calls.get() + 1);
        self.shaped.borrow_mut().push(text.to_string());

        let mut out = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let rest = &text[pos..];
            if let Some((seq, glyphs)) = self.sequences.iter().find(|(seq, _)| rest.starts_with(seq.as_str())) {
                out.extend(glyphs.iter().map(|&g| RawGlyph {
                    glyph_index: g,
                    cluster: pos as u32,
                }));
                pos += seq.len();
                continue;
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            out.push(RawGlyph {
                glyph_index: self.chars.get(&ch).copied().unwrap_or(0),
                cluster: pos as u32,
            });
            pos += ch.len_utf8();
        }
        out
    }

    fn glyph_info(&self, glyph: GlyphIndex) -> GlyphInfo {
        let mut info = GlyphInfo {
            glyph_index: glyph,
            ascender: self.properties.ascender,
            descender: self.properties.descender,
            ..Default::default()
        };
        if let Some(g) = self.glyphs.get(&glyph) {
            info.x_advance = g.advance;
            if g.width > 0 && g.height > 0 {
                info.left = 1;
                info.top = g.height as i32;
                info.width = g.width;
                info.height = g.height;
            }
        }
        info
    }

    fn render_bitmap(&self, glyph: GlyphIndex) -> Option<RenderedGlyph> {
        let g = self.renderable(glyph)?;
        let mask = vec![255u8; (g.width * g.height) as usize];
        Some(RenderedGlyph {
            method: RenderMethod::Bitmap,
            glyph_index: glyph,
            image: GlyphImage::from_alpha(g.width, g.height, &mask),
            info: self.glyph_info(glyph),
        })
    }

    fn outline(&self, glyph: GlyphIndex) -> Option<Outline> {
        let g = self.renderable(glyph)?;
        if g.width == 0 || g.height == 0 {
            return Some(Outline::default());
        }
        let (x0, x1, y1) = (1.0, 1.0 + g.width as f32, g.height as f32);
        let mut b = OutlineCollector::new(1.0);
        b.move_to(x0, 0.0);
        b.line_to(x1, 0.0);
        b.line_to(x1, y1);
        b.line_to(x0, y1);
        b.close();
        Some(b.finish())
    }
}
