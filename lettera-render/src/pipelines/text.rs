//! Text render pipeline: instanced rendering of textured glyph quads.
//!
//! Uses a shared unit quad with per-instance glyph data (position, size,
//! UV region, color, decode params). Every glyph atlas gets its own GPU
//! texture and bind group; one draw call is issued per [`DrawRun`].
//! Atlases no frame has referenced for [`ATLAS_IDLE_FRAMES`] frames are
//! dropped from the GPU.

use std::collections::HashMap;

use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, BlendState, Buffer, BufferBindingType, BufferDescriptor,
    BufferUsages, ColorTargetState, ColorWrites, Device, Extent3d, FilterMode, FragmentState, FrontFace,
    IndexFormat, MultisampleState, PipelineCompilationOptions, PipelineLayoutDescriptor, PolygonMode,
    PrimitiveState, PrimitiveTopology, Queue, RenderPass, RenderPipeline, RenderPipelineDescriptor, Sampler,
    SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor, ShaderStages, Texture, TextureDescriptor,
    TextureDimension, TextureFormat, TextureSampleType, TextureUsages, TextureViewDimension, VertexState,
};

use lettera_text::AtlasTexture;

use crate::batch::DrawRun;
use crate::vertex::{CameraUniform, QuadVertex, TextInstance};

/// Maximum glyph instances per frame.
pub const MAX_TEXT_INSTANCES: usize = 65_536;

/// Frames an atlas may go unreferenced before its GPU copy is released.
pub const ATLAS_IDLE_FRAMES: u64 = 120;

/// Atlas texels are stored linearly; distance fields must not be
/// gamma-decoded.
const ATLAS_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// GPU copy of one glyph atlas.
struct GpuAtlas {
    texture: Texture,
    bind_group: BindGroup,
    revision: u64,
    width: u32,
    height: u32,
    /// Frame the atlas was last referenced in.
    last_used: u64,
}

/// Owns the wgpu pipeline, buffers, atlas textures and bind groups for text.
pub struct TextPipeline {
    pipeline: RenderPipeline,

    // Geometry (shared unit quad).
    vertex_buffer: Buffer,
    index_buffer: Buffer,

    // Instancing.
    instance_buffer: Buffer,
    instance_count: u32,
    runs: Vec<DrawRun>,

    // Camera.
    camera_buffer: Buffer,
    camera_bind_group: BindGroup,

    // Atlases, keyed by `AtlasTexture::id`.
    atlas_bgl: BindGroupLayout,
    sampler: Sampler,
    atlases: HashMap<u64, GpuAtlas>,
    frame: u64,
}

impl TextPipeline {
    pub fn new(device: &Device, surface_format: TextureFormat) -> Self {
        // ── Shader ──────────────────────────────────────────────
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("text_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/text.wgsl").into()),
        });

        // ── Camera bind group layout (group 0) ──────────────────
        let camera_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text_camera_bgl"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // ── Atlas bind group layout (group 1) ───────────────────
        let atlas_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text_atlas_bgl"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // ── Pipeline ────────────────────────────────────────────
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("text_pipeline_layout"),
            bind_group_layouts: &[&camera_bgl, &atlas_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[QuadVertex::layout(), TextInstance::layout()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ── Buffers ─────────────────────────────────────────────
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_quad_vb"),
            size: std::mem::size_of::<[QuadVertex; 4]>() as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_quad_ib"),
            size: std::mem::size_of::<[u16; 6]>() as u64,
            usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let instance_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_instances"),
            size: (MAX_TEXT_INSTANCES * std::mem::size_of::<TextInstance>()) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_camera_ub"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("text_camera_bg"),
            layout: &camera_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("glyph_atlas_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            instance_count: 0,
            runs: Vec::new(),
            camera_buffer,
            camera_bind_group,
            atlas_bgl,
            sampler,
            atlases: HashMap::new(),
            frame: 0,
        }
    }

    // ───────────────────── Upload ─────────────────────────────────

    /// Upload the static quad geometry. Call once after creation.
    pub fn upload_quad(&self, queue: &Queue) {
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&QuadVertex::VERTICES));
        queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&QuadVertex::INDICES));
    }

    /// Upload this frame's instances and the runs that draw them. Instances
    /// past [`MAX_TEXT_INSTANCES`] are dropped.
    pub fn upload_instances(&mut self, queue: &Queue, instances: &[TextInstance], runs: &[DrawRun]) -> u32 {
        let count = instances.len().min(MAX_TEXT_INSTANCES);
        if count < instances.len() {
            log::warn!(
                "TextPipeline: {} glyphs exceed the {} instance limit",
                instances.len(),
                MAX_TEXT_INSTANCES
            );
        }

        self.runs.clear();
        self.instance_count = count as u32;
        if count == 0 {
            return 0;
        }

        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances[..count]));
        for run in runs {
            let end = run.instances.end.min(self.instance_count);
            if run.instances.start < end {
                self.runs.push(DrawRun {
                    texture_id: run.texture_id,
                    instances: run.instances.start..end,
                });
            }
        }
        self.instance_count
    }

    pub fn upload_camera(&self, queue: &Queue, camera: &CameraUniform) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));
    }

    /// Mirror `atlas` on the GPU if this revision hasn't been uploaded yet.
    /// Returns whether anything was written.
    pub fn upload_atlas(&mut self, device: &Device, queue: &Queue, atlas: &AtlasTexture) -> bool {
        if atlas.is_empty() {
            return false;
        }
        let (width, height) = (atlas.width(), atlas.height());

        let frame = self.frame;
        let stale = match self.atlases.get_mut(&atlas.id()) {
            Some(gpu) if gpu.revision == atlas.revision() => {
                gpu.last_used = frame;
                return false;
            }
            Some(gpu) => gpu.width != width || gpu.height != height,
            None => true,
        };
        if stale {
            let gpu = self.create_atlas(device, width, height);
            self.atlases.insert(atlas.id(), gpu);
            log::debug!("TextPipeline: atlas {} texture {}x{}", atlas.id(), width, height);
        }
        let Some(gpu) = self.atlases.get_mut(&atlas.id()) else {
            return false;
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas.image().data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4), // RGBA = 4 bytes per pixel
                rows_per_image: Some(height),
            },
            Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        gpu.revision = atlas.revision();
        gpu.last_used = frame;
        true
    }

    /// Drop the GPU copy of an atlas whose font is gone.
    pub fn release_atlas(&mut self, id: u64) -> bool {
        self.atlases.remove(&id).is_some()
    }

    /// Close the current frame: release atlases idle for
    /// [`ATLAS_IDLE_FRAMES`] frames and start counting the next one.
    /// Returns how many were released.
    pub fn evict_idle_atlases(&mut self) -> usize {
        let frame = self.frame;
        let before = self.atlases.len();
        self.atlases.retain(|id, gpu| {
            let keep = !is_idle(gpu.last_used, frame);
            if !keep {
                log::debug!("TextPipeline: releasing idle atlas {id}");
            }
            keep
        });
        self.frame += 1;
        before - self.atlases.len()
    }

    fn create_atlas(&self, device: &Device, width: u32, height: u32) -> GpuAtlas {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("glyph_atlas"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: ATLAS_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("text_atlas_bg"),
            layout: &self.atlas_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        GpuAtlas {
            texture,
            bind_group,
            revision: 0,
            width,
            height,
            last_used: self.frame,
        }
    }

    // ───────────────────── Draw ───────────────────────────────────

    /// Record one draw call per run. Returns the number of draw calls.
    pub fn draw<'a>(&'a self, pass: &mut RenderPass<'a>) -> u32 {
        if self.instance_count == 0 {
            return 0;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint16);

        let mut calls = 0;
        for run in &self.runs {
            let Some(atlas) = self.atlases.get(&run.texture_id) else {
                continue;
            };
            pass.set_bind_group(1, &atlas.bind_group, &[]);
            pass.draw_indexed(0..6, 0, run.instances.clone());
            calls += 1;
        }
        calls
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Number of runs that have an uploaded atlas to draw with.
    pub fn draw_call_count(&self) -> u32 {
        self.runs.iter().filter(|run| self.atlases.contains_key(&run.texture_id)).count() as u32
    }

    pub fn atlas_count(&self) -> usize {
        self.atlases.len()
    }

    /// Revision of the GPU copy of atlas `id`, if there is one.
    pub fn atlas_revision(&self, id: u64) -> Option<u64> {
        self.atlases.get(&id).map(|gpu| gpu.revision)
    }
}

/// Whether an atlas last referenced in `last_used` has sat out enough frames.
fn is_idle(last_used: u64, frame: u64) -> bool {
    frame.saturating_sub(last_used) >= ATLAS_IDLE_FRAMES
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GpuContext;

    #[test]
    fn test_idle_threshold() {
        assert!(!is_idle(10, 10));
        assert!(!is_idle(10, 10 + ATLAS_IDLE_FRAMES - 1));
        assert!(is_idle(10, 10 + ATLAS_IDLE_FRAMES));
        // Touched after the frame being closed.
        assert!(!is_idle(12, 10));
    }

    #[test]
    fn test_empty_atlas_not_uploaded() {
        if let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) {
            let mut pipeline = TextPipeline::new(&gpu.device, gpu.surface_format);
            let atlas = AtlasTexture::new(lettera_text::RenderMethod::Bitmap);
            assert!(!pipeline.upload_atlas(&gpu.device, &gpu.queue, &atlas));
            assert_eq!(pipeline.atlas_count(), 0);
            assert!(!pipeline.release_atlas(atlas.id()));
            assert_eq!(pipeline.evict_idle_atlases(), 0);
        }
    }
}
