//! Shared quad geometry drawn for every particle.

use bytemuck::{Pod, Zeroable};

/// Number of vertices in the particle quad (two triangles).
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Quad vertex: 2D position and texture coordinates.
/// Layout: 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct QuadVertex {
    /// Position in quad space (-1..1).
    pub position: [f32; 2],
    /// Texture coordinates (0..1).
    pub uv: [f32; 2],
}

impl QuadVertex {
    /// Creates a new vertex.
    #[must_use]
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
        }
    }

    /// Vertex buffer layout: position at location 0, uv at location 1.
    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Two counter-clockwise triangles covering [-1, 1] in X and Y.
pub const PARTICLE_QUAD: [QuadVertex; QUAD_VERTEX_COUNT as usize] = [
    QuadVertex::new(-1.0, 1.0, 0.0, 1.0),
    QuadVertex::new(-1.0, -1.0, 0.0, 0.0),
    QuadVertex::new(1.0, -1.0, 1.0, 0.0),
    QuadVertex::new(-1.0, 1.0, 0.0, 1.0),
    QuadVertex::new(1.0, -1.0, 1.0, 0.0),
    QuadVertex::new(1.0, 1.0, 1.0, 1.0),
];
