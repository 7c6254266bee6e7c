//! High-level renderer: uploads a frame's glyph batch and draws it.

use thiserror::Error;
use wgpu::{
    Color, CommandEncoderDescriptor, LoadOp, Operations, RenderPassColorAttachment, RenderPassDescriptor, StoreOp,
    TextureViewDescriptor,
};

use crate::batch::GlyphBatch;
use crate::context::GpuContext;
use crate::pipelines::text::TextPipeline;
use crate::vertex::CameraUniform;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("No surface configured (headless mode)")]
    NoSurface,
}

/// Frame statistics returned after each render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Glyph instances drawn.
    pub glyph_count: u32,
    /// One per run of glyphs sharing an atlas.
    pub draw_calls: u32,
}

/// Draws [`GlyphBatch`]es.
///
/// # Usage
///
/// ```ignore
/// let mut renderer = TextRenderer::new(&gpu);
/// let mut batch = GlyphBatch::new();
/// font.draw("Hello", Vec2::new(10.0, 10.0), &style, &mut batch);
/// renderer.prepare(&gpu, &batch, &CameraUniform::identity(800.0, 600.0));
/// let stats = renderer.render_to_surface(&gpu)?;
/// ```
pub struct TextRenderer {
    pipeline: TextPipeline,
    clear_color: Color,
    quad_uploaded: bool,
}

impl TextRenderer {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            pipeline: TextPipeline::new(&gpu.device, gpu.surface_format),
            clear_color: Color {
                r: 0.12,
                g: 0.12,
                b: 0.13,
                a: 1.0,
            },
            quad_uploaded: false,
        }
    }

    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.clear_color = Color { r, g, b, a };
    }

    /// Upload atlases, instances and camera for this frame, then release
    /// atlases no recent frame referenced. Returns the number of atlases that
    /// had to be (re-)uploaded.
    pub fn prepare(&mut self, gpu: &GpuContext, batch: &GlyphBatch, camera: &CameraUniform) -> usize {
        if !self.quad_uploaded {
            self.pipeline.upload_quad(&gpu.queue);
            self.quad_uploaded = true;
        }

        let mut uploads = 0;
        for texture in batch.textures() {
            if self.pipeline.upload_atlas(&gpu.device, &gpu.queue, texture) {
                uploads += 1;
            }
        }

        self.pipeline
            .upload_instances(&gpu.queue, &batch.instances(), &batch.runs());
        self.pipeline.upload_camera(&gpu.queue, camera);
        self.pipeline.evict_idle_atlases();
        uploads
    }

    /// Render to the window surface.
    pub fn render_to_surface(&self, gpu: &GpuContext) -> Result<FrameStats, RenderError> {
        let surface = gpu.surface.as_ref().ok_or(RenderError::NoSurface)?;
        let output = surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        let stats = self.encode(gpu, &view, "lettera_frame");
        output.present();
        Ok(stats)
    }

    /// Render to an off-screen texture (headless mode).
    pub fn render_to_texture(&self, gpu: &GpuContext, target_view: &wgpu::TextureView) -> FrameStats {
        self.encode(gpu, target_view, "lettera_offscreen")
    }

    fn encode(&self, gpu: &GpuContext, view: &wgpu::TextureView, label: &str) -> FrameStats {
        let mut encoder = gpu.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some(&format!("{label}_encoder")),
        });

        let draw_calls = {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some(&format!("{label}_pass")),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.pipeline.draw(&mut pass)
        };

        gpu.queue.submit(std::iter::once(encoder.finish()));

        FrameStats {
            glyph_count: self.pipeline.instance_count(),
            draw_calls,
        }
    }

    /// Access the text pipeline (for advanced usage).
    pub fn pipeline(&self) -> &TextPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut TextPipeline {
        &mut self.pipeline
    }
}

// ===================================================================
// Tests
// ===================================================================
