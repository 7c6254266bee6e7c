//! FallbackResolver: fills missing glyphs from an ordered list of
//! fallback fonts.
//!
//! ```text
//!   primary shape ──► scan for gaps (glyph 0, same cluster position)
//!                          │
//!                          ▼
//!          for each gap: fallback 1 ─► fallback 2 ─► ... (first full hit wins)
//!                          │
//!                          ▼
//!            splice hit (fallback_index = N) or keep the gap as-is
//! ```
//!
//! Fallbacks are shaped non-recursively, so work is bounded by
//! `gaps × fallbacks` shaping calls.

use crate::backend::FontBackend;
use crate::glyph::{is_control_at, GlyphCluster};
use crate::shaper;

/// Ordered access to fallback fonts.
pub trait FallbackProvider {
    /// Number of registered fallbacks, live or expired.
    fn fallback_count(&self) -> usize;

    /// Shape `text` with fallback `index` (0-based) alone. `None` when that
    /// fallback has been released.
    fn shape_with(&self, index: usize, text: &str) -> Option<Vec<GlyphCluster>>;
}

/// No fallbacks at all.
impl FallbackProvider for () {
    fn fallback_count(&self) -> usize {
        0
    }

    fn shape_with(&self, _index: usize, _text: &str) -> Option<Vec<GlyphCluster>> {
        None
    }
}

pub struct FallbackResolver<'a> {
    provider: &'a dyn FallbackProvider,
}

impl<'a> FallbackResolver<'a> {
    pub fn new(provider: &'a dyn FallbackProvider) -> Self {
        Self { provider }
    }

    /// Shape `text` with `primary`, then (if `recursive`) replace each gap
    /// with the first fallback that resolves all of it.
    pub fn resolve(&self, primary: &dyn FontBackend, text: &str, recursive: bool) -> Vec<GlyphCluster> {
        let clusters = shaper::shape(primary, text);
        if !recursive || self.provider.fallback_count() == 0 {
            return clusters;
        }
        self.fill_gaps(text, clusters)
    }

    /// Replace resolvable gaps in `clusters` (shaped from `text`).
    pub fn fill_gaps(&self, text: &str, clusters: Vec<GlyphCluster>) -> Vec<GlyphCluster> {
        if !clusters.iter().any(GlyphCluster::is_missing) {
            return clusters;
        }

        let mut out = Vec::with_capacity(clusters.len());
        let mut i = 0;
        while i < clusters.len() {
            let start = clusters[i];
            if !start.is_missing() || is_control_at(text, start.pos) {
                out.push(start);
                i += 1;
                continue;
            }

            let mut end = i + 1;
            while end < clusters.len() && clusters[end].pos == start.pos {
                end += 1;
            }
            let span_end = clusters
                .get(end)
                .map_or(text.len(), |next| next.pos)
                .min(text.len());

            let found = text
                .get(start.pos..span_end)
                .filter(|gap| !gap.is_empty())
                .and_then(|gap| self.find(gap));

            match found {
                Some(resolved) => out.extend(resolved.into_iter().map(|c| {
                    GlyphCluster::new(c.glyph_index, c.fallback_index, start.pos + c.pos)
                })),
                None => out.extend_from_slice(&clusters[i..end]),
            }
            i = end;
        }
        out
    }

    /// First fallback that shapes `gap` with no missing glyph.
    fn find(&self, gap: &str) -> Option<Vec<GlyphCluster>> {
        (0..self.provider.fallback_count()).find_map(|index| {
            let shaped = self.provider.shape_with(index, gap)?;
            if shaped.is_empty() || shaped.iter().any(GlyphCluster::is_missing) {
                return None;
            }
            let fallback_index = index as u32 + 1;
            Some(
                shaped
                    .into_iter()
                    .map(|c| GlyphCluster { fallback_index, ..c })
                    .collect(),
            )
        })
    }
}

// ===================================================================
// Tests
// ===================================================================
