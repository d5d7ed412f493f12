//! # Lumen Kernel
//!
//! Fixed-pool particle simulation and its wgpu renderer.
//!
//! This crate provides:
//! - A particle pool that is allocated once and respawns expired particles in place
//! - Fixed-step kinematics (velocity, gravity, fading life)
//! - Area or fixed-point spawning driven by a pluggable random source
//! - Optional Y-axis billboarding of the shared textured quad
//! - A wgpu backend that loads textures, owns vertex buffers and replays draws
//!
//! ## Architecture
//!
//! [`ParticleSystem`] knows nothing about wgpu. It acquires its texture and
//! quad through a [`ParticleBackend`] and draws through a [`ParticleShader`].
//! [`ParticleRenderer`] implements both sides for wgpu: draws are recorded
//! while the system renders, then uploaded in [`ParticleRenderer::prepare`] and
//! replayed in [`ParticleRenderer::draw`].
//!
//! ## Ticks
//!
//! [`ParticleSystem::update`] advances exactly one tick. It does not look at
//! wall-clock time, so simulation speed follows the caller's tick rate.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod billboard;
pub mod config;
pub mod particle;
pub mod particles;
pub mod quad;
pub mod render;
pub mod shader;
pub mod spawn;
pub mod texture_loader;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::billboard::*;
    pub use crate::config::*;
    pub use crate::particle::*;
    pub use crate::particles::*;
    pub use crate::quad::*;
    pub use crate::render::*;
    pub use crate::shader::*;
    pub use crate::spawn::*;
    pub use crate::texture_loader::*;
}

pub use prelude::*;
