//! GPU renderer using wgpu.
//!
//! Owns the surface and device and drives the particle renderer once per frame.

use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use lumen_common::LumenResult;
use lumen_kernel::{ParticleRenderer, ParticleSystem, ParticleSystemConfig};
use tracing::{debug, info, warn};
use winit::{dpi::PhysicalSize, window::Window};

/// Background colour behind the particles.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.03,
    b: 0.06,
    a: 1.0,
};

/// Main renderer that manages GPU resources and rendering.
pub struct Renderer {
    /// wgpu surface for presenting to the window
    surface: wgpu::Surface<'static>,
    /// wgpu device for GPU operations
    device: wgpu::Device,
    /// wgpu queue for submitting commands
    queue: wgpu::Queue,
    /// Surface configuration
    config: wgpu::SurfaceConfiguration,
    /// Particle pipeline and resources
    particles: ParticleRenderer,
    /// Frame counter
    frame_count: u64,
}

impl Renderer {
    /// Creates a new renderer for the given window.
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: wgpu::Dx12Compiler::Fxc,
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        let surface = instance
            .create_surface(window)
            .context("Failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to find a suitable GPU adapter")?;

        info!("Using GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Lumen Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("Failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("Surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let particles = ParticleRenderer::new(&device, surface_format);

        info!("Renderer initialized ({:?})", surface_format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            particles,
            frame_count: 0,
        })
    }

    /// Builds a particle system whose resources live on this device.
    pub fn create_particle_system(
        &mut self,
        config: &ParticleSystemConfig,
    ) -> LumenResult<ParticleSystem> {
        let mut backend = self.particles.backend(&self.device, &self.queue);
        ParticleSystem::new(config, &mut backend)
    }

    /// Frees a particle system's texture and mesh.
    pub fn release_particle_system(&mut self, system: ParticleSystem) {
        let mut backend = self.particles.backend(&self.device, &self.queue);
        system.release(&mut backend);
    }

    /// Resizes the renderer to match the new window size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Renders one frame of `system` from `view_proj` looking along
    /// `view_direction`. Returns the number of particles drawn.
    pub fn render(
        &mut self,
        system: &ParticleSystem,
        view_proj: Mat4,
        view_direction: Vec3,
        scale: Vec3,
    ) -> Result<usize> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(0);
            },
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Surface timed out, skipping frame");
                return Ok(0);
            },
            Err(e) => return Err(e).context("Failed to get surface texture"),
        };

        self.particles.begin_frame();
        let drawn = system
            .render(&mut self.particles, view_direction, scale)
            .context("Failed to record particle draws")?;
        self.particles.prepare(&self.device, &self.queue, view_proj);

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.particles.draw(&mut render_pass);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.frame_count += 1;
        Ok(drawn)
    }

    /// Frames presented so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
