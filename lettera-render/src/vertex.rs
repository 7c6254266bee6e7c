//! GPU vertex and instance data types for glyph rendering.
//!
//! All types derive `bytemuck::Pod` + `Zeroable` for zero-copy upload
//! to GPU buffers.

use bytemuck::{Pod, Zeroable};
use lettera_text::{GlyphQuad, RenderMethod};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

// ───────────────────────────────────────────────────────────────────
// Vertex (unit quad)
// ───────────────────────────────────────────────────────────────────

/// A single vertex of the unit quad (0,0)→(1,1).
///
/// The quad is shared across all glyph instances; per-instance data comes
/// from [`TextInstance`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    /// Position in [0, 1] space.
    pub position: [f32; 2],
}

impl QuadVertex {
    pub const VERTICES: [QuadVertex; 4] = [
        QuadVertex { position: [0.0, 0.0] }, // top-left
        QuadVertex { position: [1.0, 0.0] }, // top-right
        QuadVertex { position: [0.0, 1.0] }, // bottom-left
        QuadVertex { position: [1.0, 1.0] }, // bottom-right
    ];

    pub const INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(0) = corner
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x2,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Instance data
// ───────────────────────────────────────────────────────────────────

/// How the fragment shader decodes atlas texels.
pub fn shader_mode(method: RenderMethod) -> f32 {
    match method {
        RenderMethod::Bitmap => 0.0,
        RenderMethod::Sdf => 1.0,
        RenderMethod::Msdf => 2.0,
    }
}

/// Per-instance data for a single glyph quad.
///
/// 64 bytes per instance: 10,000 glyphs take 640 KB of GPU memory.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TextInstance {
    /// Screen position of the glyph quad top-left.
    pub position: [f32; 2],
    /// Width and height on screen in pixels.
    pub size: [f32; 2],
    /// Atlas UV top-left.
    pub uv_min: [f32; 2],
    /// Atlas UV bottom-right.
    pub uv_max: [f32; 2],
    /// RGBA text color, each channel in [0.0, 1.0].
    pub color: [f32; 4],
    /// `[mode, distance range, texels per pixel, 0]`; see `shaders/text.wgsl`.
    pub params: [f32; 4],
}

impl TextInstance {
    /// Instance for `quad`, sampling `uv` (`[u_min, v_min, u_max, v_max]`).
    pub fn from_quad(quad: &GlyphQuad, uv: [f32; 4], method: RenderMethod) -> Self {
        let size = quad.size();
        let texels_per_pixel = if quad.scale > 0.0 { 1.0 / quad.scale } else { 1.0 };
        Self {
            position: quad.pos.to_array(),
            size: size.to_array(),
            uv_min: [uv[0], uv[1]],
            uv_max: [uv[2], uv[3]],
            color: quad.color,
            params: [shader_mode(method), quad.distance_range, texels_per_pixel, 0.0],
        }
    }

    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(1) = position
            VertexAttribute {
                offset: 0,
                shader_location: 1,
                format: VertexFormat::Float32x2,
            },
            // location(2) = size
            VertexAttribute {
                offset: 8,
                shader_location: 2,
                format: VertexFormat::Float32x2,
            },
            // location(3) = uv_min
            VertexAttribute {
                offset: 16,
                shader_location: 3,
                format: VertexFormat::Float32x2,
            },
            // location(4) = uv_max
            VertexAttribute {
                offset: 24,
                shader_location: 4,
                format: VertexFormat::Float32x2,
            },
            // location(5) = color
            VertexAttribute {
                offset: 32,
                shader_location: 5,
                format: VertexFormat::Float32x4,
            },
            // location(6) = params
            VertexAttribute {
                offset: 48,
                shader_location: 6,
                format: VertexFormat::Float32x4,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<TextInstance>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Camera uniform
// ───────────────────────────────────────────────────────────────────

/// Camera/viewport uniform sent to the GPU once per frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    /// 4×4 orthographic projection matrix (column-major).
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Orthographic projection for a `width × height` pixel viewport with
    /// pan and zoom. (0,0) maps to the top-left; Y grows downward.
    pub fn orthographic(width: f32, height: f32, pan_x: f32, pan_y: f32, zoom: f32) -> Self {
        // ndc_x = (x - pan_x) * (2 * zoom / width) - 1
        // ndc_y = 1 - (y - pan_y) * (2 * zoom / height)
        let sx = 2.0 * zoom / width;
        let sy = -2.0 * zoom / height;
        let tx = -pan_x * sx - 1.0;
        let ty = -pan_y * sy + 1.0;

        Self {
            view_proj: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [tx, ty, 0.0, 1.0],
            ],
        }
    }

    /// 1px = 1 unit, no pan, no zoom.
    pub fn identity(width: f32, height: f32) -> Self {
        Self::orthographic(width, height, 0.0, 0.0, 1.0)
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use lettera_text::TextureRegion;

    fn project(cam: &CameraUniform, x: f32, y: f32) -> (f32, f32) {
        let vp = cam.view_proj;
        (
            x * vp[0][0] + y * vp[1][0] + vp[3][0],
            x * vp[0][1] + y * vp[1][1] + vp[3][1],
        )
    }

    fn quad(scale: f32, distance_range: f32) -> GlyphQuad {
        GlyphQuad {
            region: TextureRegion {
                left: 4,
                top: 8,
                width: 10,
                height: 20,
            },
            pos: Vec2::new(100.0, 50.0),
            scale,
            color: [1.0, 0.5, 0.0, 1.0],
            distance_range,
        }
    }

    #[test]
    fn test_sizes() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 8);
        assert_eq!(std::mem::size_of::<TextInstance>(), 64);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
    }

    #[test]
    fn test_camera_identity_corners() {
        let cam = CameraUniform::identity(800.0, 600.0);
        let (x, y) = project(&cam, 0.0, 0.0);
        assert!((x + 1.0).abs() < 1e-5 && (y - 1.0).abs() < 1e-5, "top-left -> ({x}, {y})");
        let (x, y) = project(&cam, 800.0, 600.0);
        assert!((x - 1.0).abs() < 1e-5 && (y + 1.0).abs() < 1e-5, "bottom-right -> ({x}, {y})");
        let (x, y) = project(&cam, 400.0, 300.0);
        assert!(x.abs() < 1e-5 && y.abs() < 1e-5, "center -> ({x}, {y})");
    }

    #[test]
    fn test_camera_zoom_and_pan() {
        let zoomed = CameraUniform::orthographic(800.0, 600.0, 0.0, 0.0, 2.0);
        let (x, y) = project(&zoomed, 400.0, 300.0);
        assert!((x - 1.0).abs() < 1e-5 && (y + 1.0).abs() < 1e-5);

        let panned = CameraUniform::orthographic(800.0, 600.0, 100.0, 50.0, 1.0);
        let (x, y) = project(&panned, 100.0, 50.0);
        assert!((x + 1.0).abs() < 1e-5 && (y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_instance_from_bitmap_quad() {
        let inst = TextInstance::from_quad(&quad(0.5, 0.0), [0.1, 0.2, 0.3, 0.4], RenderMethod::Bitmap);
        assert_eq!(inst.position, [100.0, 50.0]);
        assert_eq!(inst.size, [5.0, 10.0]);
        assert_eq!(inst.uv_min, [0.1, 0.2]);
        assert_eq!(inst.uv_max, [0.3, 0.4]);
        assert_eq!(inst.color, [1.0, 0.5, 0.0, 1.0]);
        assert_eq!(inst.params, [0.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_instance_from_distance_field_quad() {
        let sdf = TextInstance::from_quad(&quad(2.0, 3.0), [0.0; 4], RenderMethod::Sdf);
        assert_eq!(sdf.params, [1.0, 3.0, 0.5, 0.0]);

        let msdf = TextInstance::from_quad(&quad(1.0, 4.0), [0.0; 4], RenderMethod::Msdf);
        assert_eq!(msdf.params[0], 2.0);
        assert_eq!(msdf.params[1], 4.0);
    }

    #[test]
    fn test_layouts() {
        let quad = QuadVertex::layout();
        assert_eq!(quad.attributes.len(), 1);
        assert_eq!(quad.step_mode, VertexStepMode::Vertex);

        let inst = TextInstance::layout();
        let locations: Vec<u32> = inst.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(inst.attributes[5].offset, 48);
        assert_eq!(inst.array_stride, 64);
        assert_eq!(inst.step_mode, VertexStepMode::Instance);
    }

    #[test]
    fn test_instance_bytemuck_cast() {
        let inst = TextInstance::from_quad(&quad(1.0, 3.0), [0.1, 0.2, 0.9, 0.8], RenderMethod::Sdf);
        let bytes = bytemuck::bytes_of(&inst);
        assert_eq!(bytes.len(), 64);
        let back: &TextInstance = bytemuck::from_bytes(bytes);
        assert_eq!(*back, inst);
    }
}
