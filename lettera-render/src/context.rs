//! Device, queue and (optionally) a window surface for the text renderer.
//!
//! Headless contexts draw into textures from [`GpuContext::create_render_target`];
//! windowed contexts present glyph frames to a surface picked by
//! [`pick_surface_format`].

use thiserror::Error;
use wgpu::{
    Adapter, CompositeAlphaMode, Device, DeviceDescriptor, Instance, InstanceDescriptor, PresentMode, Queue,
    RequestAdapterOptions, Surface, SurfaceConfiguration, TextureFormat, TextureUsages,
};

/// Render target format when there is no surface to ask.
pub const HEADLESS_FORMAT: TextureFormat = TextureFormat::Bgra8UnormSrgb;

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Surface supports no texture formats")]
    NoSurfaceFormat,
}

pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub adapter: Adapter,
    /// `None` for headless contexts.
    pub surface: Option<Surface<'static>>,
    pub surface_config: Option<SurfaceConfiguration>,
    /// Color format glyph frames are rendered in.
    pub surface_format: TextureFormat,
}

impl GpuContext {
    /// Off-screen context for tests, benches and text-to-image rendering.
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = Instance::new(&InstanceDescriptor::default());
        let (adapter, device, queue) = request_gpu(&instance, None, "lettera_headless").await?;

        Ok(Self {
            device,
            queue,
            adapter,
            surface: None,
            surface_config: None,
            surface_format: HEADLESS_FORMAT,
        })
    }

    /// Context presenting to `window`, which must outlive it.
    pub async fn new_with_surface<W>(window: W, width: u32, height: u32) -> Result<Self, GpuError>
    where
        W: wgpu::WasmNotSendSync + Into<wgpu::SurfaceTarget<'static>>,
    {
        let instance = Instance::new(&InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| GpuError::Surface(e.to_string()))?;
        let (adapter, device, queue) = request_gpu(&instance, Some(&surface), "lettera_windowed").await?;

        let caps = surface.get_capabilities(&adapter);
        let format = pick_surface_format(&caps.formats).ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(CompositeAlphaMode::Auto);

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::info!("GpuContext: surface {}x{} {:?}", config.width, config.height, format);

        Ok(Self {
            device,
            queue,
            adapter,
            surface: Some(surface),
            surface_format: format,
            surface_config: Some(config),
        })
    }

    /// Reconfigure the surface for a new window size. Zero sizes (minimized
    /// windows) and headless contexts are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (Some(surface), Some(config)) = (&self.surface, &mut self.surface_config) else {
            return;
        };
        if width == 0 || height == 0 || (config.width, config.height) == (width, height) {
            return;
        }
        config.width = width;
        config.height = height;
        surface.configure(&self.device, config);
    }

    /// Off-screen color target in [`GpuContext::surface_format`]; sizes are
    /// at least 1.
    pub fn create_render_target(&self, width: u32, height: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lettera_render_target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.surface_format,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// `(0, 0)` when headless.
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_config
            .as_ref()
            .map_or((0, 0), |c| (c.width, c.height))
    }
}

/// First sRGB format the surface offers, else its first format.
pub fn pick_surface_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| formats.first())
        .copied()
}

async fn request_gpu(
    instance: &Instance,
    surface: Option<&Surface<'_>>,
    label: &str,
) -> Result<(Adapter, Device, Queue), GpuError> {
    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(GpuError::NoAdapter)?;

    let (device, queue) = adapter
        .request_device(
            &DeviceDescriptor {
                label: Some(label),
                ..Default::default()
            },
            None,
        )
        .await?;
    log::debug!("GpuContext: {label} on {}", adapter.get_info().name);
    Ok((adapter, device, queue))
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(GpuError::NoAdapter.to_string(), "No suitable GPU adapter found");
        assert_eq!(GpuError::Surface("lost".into()).to_string(), "Surface error: lost");
        assert_eq!(
            GpuError::NoSurfaceFormat.to_string(),
            "Surface supports no texture formats"
        );
    }

    #[test]
    fn test_pick_surface_format() {
        let formats = [TextureFormat::Bgra8Unorm, TextureFormat::Rgba8UnormSrgb];
        assert_eq!(pick_surface_format(&formats), Some(TextureFormat::Rgba8UnormSrgb));
        assert_eq!(
            pick_surface_format(&[TextureFormat::Rgba16Float]),
            Some(TextureFormat::Rgba16Float)
        );
        assert_eq!(pick_surface_format(&[]), None);
    }

    #[test]
    fn test_render_target_size() {
        if let Ok(ctx) = pollster::block_on(GpuContext::new_headless()) {
            let target = ctx.create_render_target(320, 0);
            assert_eq!((target.width(), target.height()), (320, 1));
            assert_eq!(target.format(), HEADLESS_FORMAT);
        }
    }

    #[test]
    fn test_headless_context() {
        // No adapter on this machine: nothing to check.
        if let Ok(mut ctx) = pollster::block_on(GpuContext::new_headless()) {
            assert!(ctx.surface.is_none());
            assert!(ctx.surface_config.is_none());
            ctx.resize(640, 480);
            assert_eq!(ctx.surface_size(), (0, 0));
        }
    }
}
