//! A single simulated particle.

use glam::Vec3;

/// One slot of a particle pool.
///
/// Particles have no identity beyond their index in the pool. They are never
/// removed; when `life` runs out the owning system respawns them in place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    /// Whether the particle is updated and drawn.
    pub active: bool,
    /// Position relative to the system's render anchor.
    pub position: Vec3,
    /// Displacement rate per tick (before the slowdown divisor).
    pub velocity: Vec3,
    /// Added to `velocity` every tick.
    pub gravity: Vec3,
    /// Remaining life; respawn happens once this drops below zero.
    pub life: f32,
    /// Amount subtracted from `life` every tick.
    pub fade: f32,
}

impl Particle {
    /// Advances the particle by one tick.
    ///
    /// Position moves by `velocity / step_divisor`, then gravity is accumulated
    /// into velocity and life decays by `fade`. Returns `true` when the particle
    /// has expired and must be respawned.
    pub fn advance(&mut self, step_divisor: f32) -> bool {
        self.position += self.velocity / step_divisor;
        self.velocity += self.gravity;
        self.life -= self.fade;
        self.is_expired()
    }

    /// Whether life has dropped below zero.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.life < 0.0
    }
}
