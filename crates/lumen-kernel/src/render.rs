//! wgpu particle rendering.
//!
//! [`ParticleRenderer`] owns the textured-quad pipeline plus every texture and
//! vertex buffer handed out to particle systems. Rendering happens in two
//! phases: during the frame a particle system records uniform uploads and
//! draws through the [`ParticleShader`] impl, then [`ParticleRenderer::prepare`]
//! writes the recorded state to GPU buffers and [`ParticleRenderer::draw`]
//! replays it into a render pass.
//!
//! Each recorded draw gets its own slot in a model-matrix uniform buffer that
//! is bound with a dynamic offset, so one frame can hold any number of draws.

use std::collections::HashMap;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use lumen_common::{GpuError, LumenError};
use tracing::{debug, info, trace};
use wgpu::{util::DeviceExt, Device, Queue};

use crate::quad::QuadVertex;
use crate::shader::{
    MeshHandle, ParticleBackend, ParticleShader, TextureHandle, Uniform, UniformValue,
};
use crate::texture_loader::{load_texture_rgba, TextureImage};

/// Model-matrix slots allocated up front.
pub const INITIAL_MODEL_CAPACITY: u32 = 1024;

/// Size of one model matrix in the uniform buffer.
const MODEL_SIZE: u64 = std::mem::size_of::<ModelUniform>() as u64;

/// WGSL shader for textured particle quads.
pub const PARTICLE_SHADER: &str = r#"
struct Params {
    view_proj: mat4x4<f32>,
    visibility: f32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(1) @binding(0) var particle_texture: texture_2d<f32>;
@group(1) @binding(1) var particle_sampler: sampler;
@group(2) @binding(0) var<uniform> model: mat4x4<f32>;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = params.view_proj * model * vec4<f32>(vertex.position, 0.0, 1.0);
    // Image rows start at the top; quad v starts at the bottom
    out.uv = vec2<f32>(vertex.uv.x, 1.0 - vertex.uv.y);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(particle_texture, particle_sampler, input.uv);
    return vec4<f32>(color.rgb, color.a * params.visibility);
}
"#;

/// Per-frame shader parameters (group 0).
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ParticleParams {
    /// Camera view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Alpha factor applied to the sampled texture.
    pub visibility: f32,
    /// Padding to the WGSL struct size.
    _padding: [f32; 3],
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            visibility: 1.0,
            _padding: [0.0; 3],
        }
    }
}

/// Per-draw model matrix (group 2, dynamic offset).
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelUniform {
    /// Column-major model matrix.
    pub model: [[f32; 4]; 4],
}

impl From<Mat4> for ModelUniform {
    fn from(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

/// Rounds `size` up to a multiple of `alignment`.
#[must_use]
pub const fn align_to(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

/// Rejects values of the wrong kind for a uniform slot.
pub fn check_uniform(uniform: Uniform, value: &UniformValue) -> Result<(), GpuError> {
    let accepted = matches!(
        (uniform, value),
        (Uniform::Visibility, UniformValue::Float(_))
            | (Uniform::Model, UniformValue::Mat4(_))
            | (Uniform::ParticleTexture, UniformValue::Int(_))
            | (Uniform::ParticleTexture, UniformValue::Texture { .. })
    );

    if accepted {
        Ok(())
    } else {
        Err(GpuError::UniformMismatch {
            uniform: uniform.name(),
            value: value.kind(),
        })
    }
}

/// One draw recorded during the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedDraw {
    /// Vertex buffer to draw.
    pub mesh: MeshHandle,
    /// Texture bound for the draw.
    pub texture: TextureHandle,
    /// Vertices to draw.
    pub vertex_count: u32,
    /// Slot in the model buffer.
    pub model_slot: u32,
}

/// CPU-side uniform state and draw list for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    visibility: f32,
    texture: Option<TextureHandle>,
    model: Mat4,
    models: Vec<ModelUniform>,
    draws: Vec<RecordedDraw>,
}

impl FrameRecorder {
    /// Drops recorded draws. Uniform state is kept, like a bound program.
    pub fn clear(&mut self) {
        self.models.clear();
        self.draws.clear();
    }

    /// Applies a uniform upload.
    pub fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) -> Result<(), GpuError> {
        check_uniform(uniform, &value)?;
        match value {
            UniformValue::Float(visibility) => self.visibility = visibility,
            UniformValue::Mat4(model) => self.model = model,
            UniformValue::Texture { texture, .. } => self.texture = Some(texture),
            // A bare unit index keeps whatever texture is already bound.
            UniformValue::Int(_) => {},
        }
        Ok(())
    }

    /// Records a draw with the current texture and model matrix.
    pub fn record_draw(&mut self, mesh: MeshHandle, vertex_count: u32) -> Result<(), GpuError> {
        let texture = self.texture.ok_or(GpuError::MissingTexture)?;
        let model_slot = self.models.len() as u32;
        self.models.push(self.model.into());
        self.draws.push(RecordedDraw {
            mesh,
            texture,
            vertex_count,
            model_slot,
        });
        Ok(())
    }

    /// Last uploaded visibility.
    #[must_use]
    pub const fn visibility(&self) -> f32 {
        self.visibility
    }

    /// Currently bound texture.
    #[must_use]
    pub const fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Draws recorded since the last clear.
    #[must_use]
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Model matrices recorded since the last clear, one per draw.
    #[must_use]
    pub fn models(&self) -> &[ModelUniform] {
        &self.models
    }
}

/// Texture plus the bind group sampling it.
struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Static vertex buffer.
struct GpuMesh {
    buffer: wgpu::Buffer,
}

/// Textured particle quad renderer and resource registry.
pub struct ParticleRenderer {
    /// Render pipeline
    pipeline: wgpu::RenderPipeline,
    /// Texture + sampler layout (group 1)
    texture_layout: wgpu::BindGroupLayout,
    /// Model matrix layout (group 2)
    model_layout: wgpu::BindGroupLayout,
    /// Params uniform buffer
    params_buffer: wgpu::Buffer,
    /// Params bind group (group 0)
    params_bind_group: wgpu::BindGroup,
    /// Shared sampler for particle textures
    sampler: wgpu::Sampler,
    /// Model matrix buffer
    model_buffer: wgpu::Buffer,
    /// Model bind group (group 2)
    model_bind_group: wgpu::BindGroup,
    /// Model slots the buffer can hold
    model_capacity: u32,
    /// Byte distance between model slots
    model_stride: u64,
    /// Loaded textures by handle
    textures: HashMap<u32, GpuTexture>,
    /// Vertex buffers by handle
    meshes: HashMap<u32, GpuMesh>,
    /// Next handle value
    next_id: u32,
    /// Recorded frame state
    frame: FrameRecorder,
}

impl ParticleRenderer {
    /// Creates the particle pipeline for the given surface format.
    pub fn new(device: &Device, surface_format: wgpu::TextureFormat) -> Self {
        info!("Creating particle renderer for {:?}", surface_format);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(PARTICLE_SHADER.into()),
        });

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Params Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Model Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(MODEL_SIZE),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&params_layout, &texture_layout, &model_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Params Buffer"),
            contents: bytemuck::bytes_of(&ParticleParams::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Params Bind Group"),
            layout: &params_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Particle Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let model_stride = align_to(
            MODEL_SIZE,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let (model_buffer, model_bind_group) =
            create_model_buffer(device, &model_layout, INITIAL_MODEL_CAPACITY, model_stride);

        info!("Particle renderer created (model stride {} bytes)", model_stride);

        Self {
            pipeline,
            texture_layout,
            model_layout,
            params_buffer,
            params_bind_group,
            sampler,
            model_buffer,
            model_bind_group,
            model_capacity: INITIAL_MODEL_CAPACITY,
            model_stride,
            textures: HashMap::new(),
            meshes: HashMap::new(),
            next_id: 1,
            frame: FrameRecorder::default(),
        }
    }

    /// Borrows the renderer as a resource backend for particle systems.
    pub fn backend<'a>(&'a mut self, device: &'a Device, queue: &'a Queue) -> GpuBackend<'a> {
        GpuBackend {
            device,
            queue,
            renderer: self,
        }
    }

    /// Starts recording a new frame.
    pub fn begin_frame(&mut self) {
        self.frame.clear();
    }

    /// Uploads the recorded frame state.
    ///
    /// Must run before [`Self::draw`] and outside of any render pass.
    pub fn prepare(&mut self, device: &Device, queue: &Queue, view_proj: Mat4) {
        let params = ParticleParams {
            view_proj: view_proj.to_cols_array_2d(),
            visibility: self.frame.visibility(),
            _padding: [0.0; 3],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let models = self.frame.models();
        if models.is_empty() {
            return;
        }

        let needed = models.len() as u32;
        if needed > self.model_capacity {
            let capacity = needed.next_power_of_two();
            let (buffer, bind_group) =
                create_model_buffer(device, &self.model_layout, capacity, self.model_stride);
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
            self.model_capacity = capacity;
            debug!("Grew particle model buffer to {} slots", capacity);
        }

        let stride = self.model_stride as usize;
        let mut staging = vec![0u8; stride * models.len()];
        for (slot, model) in staging.chunks_exact_mut(stride).zip(models) {
            slot[..MODEL_SIZE as usize].copy_from_slice(bytemuck::bytes_of(model));
        }
        queue.write_buffer(&self.model_buffer, 0, &staging);

        trace!("Prepared {} particle draws", models.len());
    }

    /// Replays the recorded draws into `render_pass`.
    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        if self.frame.draws().is_empty() {
            return;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.params_bind_group, &[]);

        let mut bound_texture = None;
        for draw in self.frame.draws() {
            let (Some(texture), Some(mesh)) = (
                self.textures.get(&draw.texture.raw()),
                self.meshes.get(&draw.mesh.raw()),
            ) else {
                continue;
            };

            if bound_texture != Some(draw.texture) {
                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                bound_texture = Some(draw.texture);
            }

            let offset = u64::from(draw.model_slot) * self.model_stride;
            render_pass.set_bind_group(2, &self.model_bind_group, &[offset as u32]);
            render_pass.set_vertex_buffer(0, mesh.buffer.slice(..));
            render_pass.draw(0..draw.vertex_count, 0..1);
        }
    }

    /// Draws recorded in the current frame.
    #[must_use]
    pub fn recorded_draws(&self) -> usize {
        self.frame.draws().len()
    }

    /// Number of live textures.
    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of live vertex buffers.
    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    fn upload_texture(
        &mut self,
        device: &Device,
        queue: &Queue,
        image: &TextureImage,
        label: &str,
    ) -> Result<TextureHandle, GpuError> {
        let max = device.limits().max_texture_dimension_2d;
        if image.width > max || image.height > max {
            return Err(GpuError::TextureUpload(format!(
                "{label}: {}x{} exceeds the {max} pixel limit",
                image.width, image.height
            )));
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(image.bytes_per_row()),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let id = self.allocate_id();
        self.textures.insert(
            id,
            GpuTexture {
                _texture: texture,
                bind_group,
            },
        );

        Ok(TextureHandle::new(id))
    }
}

impl ParticleShader for ParticleRenderer {
    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) -> Result<(), GpuError> {
        if let UniformValue::Texture { texture, .. } = value {
            if !self.textures.contains_key(&texture.raw()) {
                return Err(GpuError::UnknownTexture(texture.raw()));
            }
        }
        self.frame.set_uniform(uniform, value)
    }

    fn draw_quad(&mut self, mesh: MeshHandle, vertex_count: u32) -> Result<(), GpuError> {
        if !self.meshes.contains_key(&mesh.raw()) {
            return Err(GpuError::UnknownMesh(mesh.raw()));
        }
        self.frame.record_draw(mesh, vertex_count)
    }
}

impl std::fmt::Debug for ParticleRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleRenderer")
            .field("textures", &self.textures.len())
            .field("meshes", &self.meshes.len())
            .field("model_capacity", &self.model_capacity)
            .field("recorded_draws", &self.frame.draws().len())
            .finish_non_exhaustive()
    }
}

/// [`ParticleBackend`] that creates resources on a wgpu device.
pub struct GpuBackend<'a> {
    device: &'a Device,
    queue: &'a Queue,
    renderer: &'a mut ParticleRenderer,
}

impl ParticleBackend for GpuBackend<'_> {
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, LumenError> {
        let image = load_texture_rgba(path)?;
        let label = path.display().to_string();
        let handle = self
            .renderer
            .upload_texture(self.device, self.queue, &image, &label)?;

        info!(
            "Uploaded particle texture {} ({}x{}) as #{}",
            label,
            image.width,
            image.height,
            handle.raw()
        );
        Ok(handle)
    }

    fn create_quad_mesh(&mut self, vertices: &[QuadVertex]) -> Result<MeshHandle, GpuError> {
        if vertices.is_empty() {
            return Err(GpuError::BufferAlloc("vertex data is empty".to_string()));
        }

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Quad Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let id = self.renderer.allocate_id();
        self.renderer.meshes.insert(id, GpuMesh { buffer });
        debug!("Created quad mesh #{} ({} vertices)", id, vertices.len());

        Ok(MeshHandle::new(id))
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if self.renderer.textures.remove(&texture.raw()).is_some() {
            debug!("Released particle texture #{}", texture.raw());
        }
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        if let Some(gpu_mesh) = self.renderer.meshes.remove(&mesh.raw()) {
            gpu_mesh.buffer.destroy();
            debug!("Released quad mesh #{}", mesh.raw());
        }
    }
}

/// Allocates the model buffer and its dynamic-offset bind group.
fn create_model_buffer(
    device: &Device,
    layout: &wgpu::BindGroupLayout,
    capacity: u32,
    stride: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Particle Model Buffer"),
        size: stride * u64::from(capacity),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Particle Model Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(MODEL_SIZE),
            }),
        }],
    });

    (buffer, bind_group)
}
