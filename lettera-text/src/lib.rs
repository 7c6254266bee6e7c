//! # lettera-text
//!
//! Glyph caching and text layout for a 2D renderer. Shapes text against a
//! font (with fallback fonts for glyphs it lacks), renders glyphs as plain
//! bitmaps or signed distance fields, packs them into a growable atlas and
//! emits positioned quads for a GPU backend to draw.
//!
//! ## Architecture
//!
//! ```text
//! Font ──► FallbackResolver ──► Vec<GlyphCluster> (glyph, font, byte pos)
//!   │                                 │
//!   │                                 ▼
//!   │          GlyphCache::prerender ─► GlyphRenderer (bitmap / SDF / MSDF)
//!   │                                 │
//!   │                                 ▼
//!   │                       GlyphAtlas (shelf packing) ─► AtlasTexture
//!   ▼
//! draw / region ──► Pen layout ──► GlyphSink::draw_glyph(GlyphQuad) ──► TextRect
//! ```
//!
//! - **`face`**: OpenType backend (`rustybuzz` shaping, `swash` rasterization).
//! - **`fallback`**: cluster-level fallback resolution across fonts.
//! - **`distance`**: SDF / MSDF generation from glyph outlines.
//! - **`cache`** / **`layout`**: glyph cache and the draw / region operations.
//! - **`registry`**: system font discovery and fallback chains via `font-kit`.

pub mod atlas;
pub mod backend;
pub mod cache;
pub mod canvas;
pub mod config;
pub mod distance;
pub mod error;
pub mod face;
pub mod fallback;
pub mod font;
pub mod glyph;
pub mod layout;
pub mod outline;
pub mod registry;
pub mod renderer;
pub mod shaper;
pub mod texture;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for ergonomic use.
pub use atlas::{GlyphAtlas, TextureRegion};
pub use backend::FontBackend;
pub use cache::{AtlasEntry, GlyphCache};
pub use canvas::{GlyphQuad, GlyphSink, RecordedQuad, RecordingSink};
pub use config::FontConfig;
pub use error::FontError;
pub use face::OpenTypeFace;
pub use fallback::{FallbackProvider, FallbackResolver};
pub use font::{Font, WeakFont};
pub use glyph::{
    Anchor, FaceProperties, GlyphCluster, GlyphImage, GlyphIndex, GlyphInfo, RawGlyph, RenderedGlyph, TextRect,
    TextStyle,
};
pub use outline::Outline;
pub use registry::{FontChain, FontDescriptor, FontRegistry, FontStyle};
pub use renderer::{GlyphRenderer, RenderMethod};
pub use texture::AtlasTexture;
