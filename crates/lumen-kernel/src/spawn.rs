//! Spawn rules shared by construction and respawn.
//!
//! A particle is (re)seeded from a [`SpawnTemplate`]: its life resets to the
//! template life, a fresh fade rate is drawn, its position is placed at the
//! origin or jittered inside the offset box, and its velocity is reset. Random
//! draws go through [`SpawnRng`] so tests can pin them.

use glam::Vec3;

use crate::particle::Particle;

/// Smallest fade rate a particle can draw.
pub const FADE_MIN: f32 = 0.003;

/// Number of distinct fade rates.
pub const FADE_STEPS: u32 = 100;

/// Spacing between consecutive fade rates.
pub const FADE_STEP: f32 = 0.001;

/// Source of the random values used when spawning.
pub trait SpawnRng {
    /// Draws a fade rate in `[FADE_MIN, FADE_MIN + FADE_STEPS * FADE_STEP)`.
    fn fade(&mut self) -> f32;

    /// Draws an integer-valued offset in `[0, extent)`.
    ///
    /// `extent` is the truncated axis extent and is always positive.
    fn jitter(&mut self, extent: u32) -> f32;
}

/// Default [`SpawnRng`] backed by `fastrand`.
#[derive(Debug, Clone)]
pub struct FastRandSpawner {
    rng: fastrand::Rng,
}

impl FastRandSpawner {
    /// Creates a spawner seeded from the global generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Creates a deterministic spawner.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for FastRandSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl SpawnRng for FastRandSpawner {
    fn fade(&mut self) -> f32 {
        self.rng.u32(0..FADE_STEPS) as f32 * FADE_STEP + FADE_MIN
    }

    fn jitter(&mut self, extent: u32) -> f32 {
        self.rng.u32(0..extent) as f32
    }
}

/// Template values copied into every spawned particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnTemplate {
    /// Spawn anchor.
    pub origin: Vec3,
    /// Per-axis extent of the spawn box (ignored when `fixed_point`).
    pub offset: Vec3,
    /// Spawn exactly at `origin`.
    pub fixed_point: bool,
    /// Initial velocity.
    pub velocity: Vec3,
    /// Constant gravity.
    pub gravity: Vec3,
    /// Life assigned on every spawn.
    pub life: f32,
}

impl SpawnTemplate {
    /// Seeds a fresh particle, including its gravity, and marks it active.
    pub fn spawn<R: SpawnRng + ?Sized>(&self, particle: &mut Particle, rng: &mut R) {
        self.respawn(particle, rng);
        particle.gravity = self.gravity;
        particle.active = true;
    }

    /// Resets life, fade, position and velocity in place.
    ///
    /// Gravity and the active flag are left alone.
    pub fn respawn<R: SpawnRng + ?Sized>(&self, particle: &mut Particle, rng: &mut R) {
        particle.life = self.life;
        particle.fade = rng.fade();
        particle.position = self.spawn_position(rng);
        particle.velocity = self.velocity;
    }

    /// Picks a spawn position according to the fixed/area rule.
    pub fn spawn_position<R: SpawnRng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        if self.fixed_point {
            return self.origin;
        }

        Vec3::new(
            self.origin.x + axis_jitter(self.offset.x, rng),
            self.origin.y + axis_jitter(self.offset.y, rng),
            self.origin.z + axis_jitter(self.offset.z, rng),
        )
    }
}

/// Integer jitter along one axis; extents that truncate to zero or below add nothing.
fn axis_jitter<R: SpawnRng + ?Sized>(extent: f32, rng: &mut R) -> f32 {
    let bound = extent.trunc();
    if bound >= 1.0 {
        rng.jitter(bound.min(u32::MAX as f32) as u32)
    } else {
        0.0
    }
}
