//! Particle system configuration.

use std::path::PathBuf;

use glam::Vec3;
use lumen_common::{LumenError, LumenResult};
use serde::{Deserialize, Serialize};

use crate::spawn::SpawnTemplate;

/// Pool size used when the configured count is not positive.
pub const DEFAULT_PARTICLE_COUNT: usize = 1000;

/// Default alpha factor.
pub const DEFAULT_VISIBILITY: f32 = 0.1;

/// Default render-space translation added to every particle.
pub const DEFAULT_ANCHOR: Vec3 = Vec3::new(-2.5, 0.0, -20.0);

/// Construction parameters for a [`ParticleSystem`](crate::ParticleSystem).
///
/// The defaults describe rain falling from a 30x1x30 box above the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSystemConfig {
    /// Image mapped onto every particle quad.
    pub texture_path: PathBuf,
    /// Pool size; zero or negative means [`DEFAULT_PARTICLE_COUNT`].
    pub count: i32,
    /// Spawn every particle exactly at `origin`.
    pub fixed_position: bool,
    /// Rotate quads about Y towards the viewer.
    pub billboarding: bool,
    /// Initial velocity.
    pub velocity: Vec3,
    /// Constant per-tick acceleration.
    pub gravity: Vec3,
    /// Life assigned on spawn.
    pub life: f32,
    /// Spawn anchor.
    pub origin: Vec3,
    /// Spawn box extents, truncated to integers per axis.
    pub offset: Vec3,
    /// Alpha factor forwarded to the shader.
    pub visibility: f32,
    /// Render-space translation added to every particle.
    pub anchor: Vec3,
    /// Scales the per-tick position divisor (`slowdown * 1000`).
    pub slowdown: f32,
}

impl Default for ParticleSystemConfig {
    fn default() -> Self {
        Self {
            texture_path: PathBuf::from("assets/textures/raindrop.png"),
            count: DEFAULT_PARTICLE_COUNT as i32,
            fixed_position: false,
            billboarding: true,
            velocity: Vec3::new(0.0, -100.0, 0.0),
            gravity: Vec3::new(0.0, -1.0, 0.0),
            life: 1.0,
            origin: Vec3::new(0.0, 5.0, 0.0),
            offset: Vec3::new(30.0, 1.0, 30.0),
            visibility: DEFAULT_VISIBILITY,
            anchor: DEFAULT_ANCHOR,
            slowdown: 1.0,
        }
    }
}

impl ParticleSystemConfig {
    /// Creates a config for the given texture with rain defaults.
    #[must_use]
    pub fn new(texture_path: impl Into<PathBuf>) -> Self {
        Self {
            texture_path: texture_path.into(),
            ..Default::default()
        }
    }

    /// Sets the pool size.
    #[must_use]
    pub fn with_count(mut self, count: i32) -> Self {
        self.count = count;
        self
    }

    /// Spawns from a single point instead of an area.
    #[must_use]
    pub fn with_fixed_position(mut self, fixed: bool) -> Self {
        self.fixed_position = fixed;
        self
    }

    /// Enables or disables billboarding.
    #[must_use]
    pub fn with_billboarding(mut self, enabled: bool) -> Self {
        self.billboarding = enabled;
        self
    }

    /// Sets the initial velocity and gravity.
    #[must_use]
    pub fn with_motion(mut self, velocity: Vec3, gravity: Vec3) -> Self {
        self.velocity = velocity;
        self.gravity = gravity;
        self
    }

    /// Sets the spawn life.
    #[must_use]
    pub fn with_life(mut self, life: f32) -> Self {
        self.life = life;
        self
    }

    /// Sets the spawn origin and area extents.
    #[must_use]
    pub fn with_area(mut self, origin: Vec3, offset: Vec3) -> Self {
        self.origin = origin;
        self.offset = offset;
        self
    }

    /// Sets the alpha factor.
    #[must_use]
    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the render anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Vec3) -> Self {
        self.anchor = anchor;
        self
    }

    /// Pool size after applying the default for non-positive counts.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        if self.count <= 0 {
            DEFAULT_PARTICLE_COUNT
        } else {
            self.count as usize
        }
    }

    /// Divisor applied to velocity when integrating position.
    #[must_use]
    pub fn step_divisor(&self) -> f32 {
        self.slowdown * 1000.0
    }

    /// Spawn template derived from this config.
    #[must_use]
    pub fn spawn_template(&self) -> SpawnTemplate {
        SpawnTemplate {
            origin: self.origin,
            offset: self.offset,
            fixed_point: self.fixed_position,
            velocity: self.velocity,
            gravity: self.gravity,
            life: self.life,
        }
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> LumenResult<()> {
        let vectors = [
            ("velocity", self.velocity),
            ("gravity", self.gravity),
            ("origin", self.origin),
            ("offset", self.offset),
            ("anchor", self.anchor),
        ];
        for (name, value) in vectors {
            if !value.is_finite() {
                return Err(LumenError::Config(format!("{name} must be finite, got {value}")));
            }
        }

        if !(self.life.is_finite() && self.life > 0.0) {
            return Err(LumenError::Config(format!(
                "life must be positive, got {}",
                self.life
            )));
        }
        if !(self.slowdown.is_finite() && self.slowdown > 0.0) {
            return Err(LumenError::Config(format!(
                "slowdown must be positive, got {}",
                self.slowdown
            )));
        }
        if !(0.0..=1.0).contains(&self.visibility) {
            return Err(LumenError::Config(format!(
                "visibility must be within [0, 1], got {}",
                self.visibility
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rain_defaults() {
        let config = ParticleSystemConfig::default();
        assert_eq!(config.resolved_count(), 1000);
        assert!(!config.fixed_position);
        assert!(config.billboarding);
        assert_eq!(config.velocity, Vec3::new(0.0, -100.0, 0.0));
        assert_eq!(config.offset, Vec3::new(30.0, 1.0, 30.0));
        assert!((config.visibility - 0.1).abs() < f32::EPSILON);
        assert!((config.step_divisor() - 1000.0).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_count_defaults() {
        assert_eq!(ParticleSystemConfig::default().with_count(0).resolved_count(), 1000);
        assert_eq!(ParticleSystemConfig::default().with_count(-5).resolved_count(), 1000);
        assert_eq!(ParticleSystemConfig::default().with_count(7).resolved_count(), 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ParticleSystemConfig::default().with_life(0.0);
        assert!(matches!(config.validate(), Err(LumenError::Config(_))));

        let config = ParticleSystemConfig::default().with_visibility(1.5);
        assert!(config.validate().is_err());

        let config =
            ParticleSystemConfig::default().with_motion(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ZERO);
        assert!(config.validate().is_err());

        let mut config = ParticleSystemConfig::default();
        config.slowdown = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_partial_override() {
        let config: ParticleSystemConfig = toml::from_str(
            r#"
            texture_path = "snow.png"
            count = 250
            fixed_position = true
            velocity = [0.0, -5.0, 0.0]
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.texture_path, PathBuf::from("snow.png"));
        assert_eq!(config.resolved_count(), 250);
        assert!(config.fixed_position);
        assert_eq!(config.velocity, Vec3::new(0.0, -5.0, 0.0));
        // Untouched fields keep their defaults
        assert_eq!(config.gravity, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_spawn_template_copies_fields() {
        let config = ParticleSystemConfig::new("a.png")
            .with_fixed_position(true)
            .with_area(Vec3::ONE, Vec3::splat(4.0))
            .with_life(2.0);
        let template = config.spawn_template();
        assert!(template.fixed_point);
        assert_eq!(template.origin, Vec3::ONE);
        assert_eq!(template.offset, Vec3::splat(4.0));
        assert!((template.life - 2.0).abs() < f32::EPSILON);
    }
}
