//! Collects glyph draws into per-atlas runs of GPU instances.
//!
//! [`GlyphBatch`] is the [`GlyphSink`] handed to `Font::draw`. Consecutive
//! glyphs from the same atlas share a run; switching atlas starts a new one,
//! so overlapping text keeps its draw order. UVs are computed at
//! [`GlyphBatch::instances`] time against the newest revision of each atlas
//! seen during the frame, which matters when an atlas grew between draws.

use std::collections::HashMap;
use std::ops::Range;

use lettera_text::{AtlasTexture, GlyphQuad, GlyphSink};

use crate::vertex::TextInstance;

/// A range of instances that all sample one atlas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawRun {
    pub texture_id: u64,
    pub instances: Range<u32>,
}

#[derive(Default)]
pub struct GlyphBatch {
    quads: Vec<(u64, GlyphQuad)>,
    textures: HashMap<u64, AtlasTexture>,
}

impl GlyphBatch {
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
        self.textures.clear();
    }

    /// Newest revision of every atlas referenced by this batch.
    pub fn textures(&self) -> impl Iterator<Item = &AtlasTexture> {
        self.textures.values()
    }

    pub fn texture(&self, id: u64) -> Option<&AtlasTexture> {
        self.textures.get(&id)
    }

    /// Instance data in draw order.
    pub fn instances(&self) -> Vec<TextInstance> {
        self.quads
            .iter()
            .filter_map(|(id, quad)| {
                let texture = self.textures.get(id)?;
                Some(TextInstance::from_quad(quad, texture.uv(&quad.region), texture.method()))
            })
            .collect()
    }

    /// Consecutive same-atlas ranges over [`GlyphBatch::instances`].
    pub fn runs(&self) -> Vec<DrawRun> {
        let mut runs: Vec<DrawRun> = Vec::new();
        for (i, (id, _)) in self.quads.iter().enumerate() {
            let i = i as u32;
            match runs.last_mut() {
                Some(run) if run.texture_id == *id => run.instances.end = i + 1,
                _ => runs.push(DrawRun {
                    texture_id: *id,
                    instances: i..i + 1,
                }),
            }
        }
        runs
    }
}

impl GlyphSink for GlyphBatch {
    fn draw_glyph(&mut self, texture: &AtlasTexture, quad: GlyphQuad) {
        let newer = self
            .textures
            .get(&texture.id())
            .map_or(true, |known| known.revision() < texture.revision());
        if newer {
            self.textures.insert(texture.id(), texture.clone());
        }
        self.quads.push((texture.id(), quad));
    }
}

// ===================================================================
// Tests
// ===================================================================
