//! Collaborator interfaces used by the particle system.
//!
//! The particle system never talks to a graphics API directly. It asks a
//! [`ParticleBackend`] for its texture and quad mesh once at construction, and
//! renders through a [`ParticleShader`] that accepts uniform uploads and draw
//! calls on an already bound program.

use std::path::Path;

use glam::Mat4;
use lumen_common::{GpuError, LumenError};

use crate::quad::QuadVertex;

/// Opaque handle to a backend texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u32);

impl TextureHandle {
    /// Creates a new texture handle.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Opaque handle to a backend vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(u32);

impl MeshHandle {
    /// Creates a new mesh handle.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Uniform slots written by the particle system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    /// Global alpha factor.
    Visibility,
    /// Sampler bound to the particle texture.
    ParticleTexture,
    /// Per-particle model matrix.
    Model,
}

impl Uniform {
    /// Name of the uniform in shader source.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Visibility => "visibility",
            Self::ParticleTexture => "particleTexture",
            Self::Model => "model",
        }
    }

    /// Resolves a shader uniform name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "visibility" => Some(Self::Visibility),
            "particleTexture" => Some(Self::ParticleTexture),
            "model" => Some(Self::Model),
            _ => None,
        }
    }
}

/// Value uploaded to a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer uniform.
    Int(i32),
    /// Float uniform.
    Float(f32),
    /// 4x4 matrix uniform.
    Mat4(Mat4),
    /// Texture bound to texture unit `unit`.
    Texture {
        /// Texture unit index.
        unit: u32,
        /// Texture to bind.
        texture: TextureHandle,
    },
}

impl UniformValue {
    /// Short name of the value kind, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Mat4(_) => "mat4",
            Self::Texture { .. } => "texture",
        }
    }
}

/// Creates the resources a particle system owns.
pub trait ParticleBackend {
    /// Loads an image file into a 2D texture.
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, LumenError>;

    /// Uploads a static vertex buffer.
    fn create_quad_mesh(&mut self, vertices: &[QuadVertex]) -> Result<MeshHandle, GpuError>;

    /// Frees a texture. Unknown handles are ignored.
    fn release_texture(&mut self, texture: TextureHandle);

    /// Frees a vertex buffer. Unknown handles are ignored.
    fn release_mesh(&mut self, mesh: MeshHandle);
}

/// A bound shader program accepting uniform uploads and draws.
pub trait ParticleShader {
    /// Uploads a uniform value.
    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) -> Result<(), GpuError>;

    /// Draws `vertex_count` vertices of `mesh` as triangles with current uniforms.
    fn draw_quad(&mut self, mesh: MeshHandle, vertex_count: u32) -> Result<(), GpuError>;
}
