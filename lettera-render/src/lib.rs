//! # lettera-render
//!
//! GPU backend for `lettera-text`, built on `wgpu`.
//!
//! ## Architecture
//!
//! ```text
//!  Font::draw(text, pos, style, &mut batch)
//!       │
//!       ▼
//!  GlyphBatch (GlyphSink)           ◀─── quads grouped into per-atlas runs
//!       │
//!       ▼
//!  TextRenderer.prepare(batch)      ◀─── uploads changed atlases + instances
//!       │
//!       ▼
//!  TextRenderer.render_to_surface() ◀─── one draw call per run
//! ```
//!
//! ## Crate modules
//!
//! - [`context`]: GPU device/queue/surface initialisation
//! - [`vertex`]: vertex, instance, and camera data types
//! - [`batch`]: glyph sink that builds instance data
//! - [`pipelines`]: the glyph render pipeline and atlas textures
//! - [`renderer`]: frame orchestration

pub mod batch;
pub mod context;
pub mod pipelines;
pub mod renderer;
pub mod vertex;

// Re-exports for convenience
pub use batch::{DrawRun, GlyphBatch};
pub use context::{GpuContext, GpuError};
pub use renderer::{FrameStats, RenderError, TextRenderer};
pub use vertex::{CameraUniform, QuadVertex, TextInstance};
