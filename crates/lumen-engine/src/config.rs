//! Demo configuration.
//!
//! Window, pacing, camera and particle parameters, loaded from `lumen.toml` in
//! the working directory. Missing or unreadable files fall back to defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glam::Vec3;
use lumen_kernel::ParticleSystemConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "lumen.toml";

/// Initial camera placement and steering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Eye position
    pub position: Vec3,
    /// Heading in degrees; 0 looks down -Z
    pub yaw_degrees: f32,
    /// Elevation in degrees
    pub pitch_degrees: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Turn rate in degrees per second
    pub turn_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(12.5, 3.0, 25.0),
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
            fov_degrees: 45.0,
            turn_speed: 60.0,
        }
    }
}

/// Demo configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Window Settings ===
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// Enable VSync
    pub vsync: bool,
    /// Target frames per second (when VSync is off)
    pub target_fps: u32,

    // === Simulation ===
    /// Particle ticks per second
    pub tick_rate: u32,
    /// Per-axis scale applied to every particle quad
    pub particle_scale: Vec3,
    /// Seconds between FPS log lines (0 = never)
    pub fps_log_interval: f32,

    /// Camera settings
    pub camera: CameraConfig,
    /// Particle system settings
    pub particles: ParticleSystemConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            vsync: true,
            target_fps: 60,

            tick_rate: 60,
            particle_scale: Vec3::new(0.02, 0.1, 0.02),
            fps_log_interval: 5.0,

            camera: CameraConfig::default(),
            particles: ParticleSystemConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `lumen.toml` in the working directory.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    #[allow(dead_code)]
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Default configuration file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Clamp configuration values to sensible ranges.
    ///
    /// Particle parameters are checked separately when the system is built.
    pub fn validate(&mut self) {
        self.window_width = self.window_width.clamp(320, 7680);
        self.window_height = self.window_height.clamp(240, 4320);
        self.target_fps = self.target_fps.clamp(15, 240);
        self.tick_rate = self.tick_rate.clamp(1, 1000);
        self.fps_log_interval = self.fps_log_interval.max(0.0);

        if !self.particle_scale.is_finite() || self.particle_scale.cmple(Vec3::ZERO).any() {
            warn!(
                "Invalid particle scale {}, using default",
                self.particle_scale
            );
            self.particle_scale = Self::default().particle_scale;
        }

        self.camera.pitch_degrees = self.camera.pitch_degrees.clamp(-89.0, 89.0);
        self.camera.fov_degrees = self.camera.fov_degrees.clamp(10.0, 120.0);
        self.camera.turn_speed = self.camera.turn_speed.clamp(1.0, 720.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.window_width, 1280);
        assert_eq!(config.tick_rate, 60);
        assert!(config.vsync);
        assert_eq!(config.particles.resolved_count(), 1000);
        assert!(config.particles.billboarding);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.window_width = 100;
        config.tick_rate = 0;
        config.particle_scale = Vec3::new(0.1, -1.0, 0.1);
        config.camera.pitch_degrees = 120.0;

        config.validate();

        assert_eq!(config.window_width, 320);
        assert_eq!(config.tick_rate, 1);
        assert_eq!(config.particle_scale, Vec3::new(0.02, 0.1, 0.02));
        assert!((config.camera.pitch_degrees - 89.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("lumen.toml");

        let mut config = EngineConfig::default();
        config.tick_rate = 120;
        config.vsync = false;
        config.particles = config
            .particles
            .with_count(64)
            .with_fixed_position(true)
            .with_billboarding(false);

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/lumen.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("lumen.toml");
        fs::write(&config_path, "tick_rate = \"fast\"").expect("write config");

        let config = EngineConfig::load_from(&config_path);
        assert_eq!(config.tick_rate, 60);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..").join(CONFIG_FILE);
        let contents = fs::read_to_string(path).expect("read shipped config");
        let config: EngineConfig = toml::from_str(&contents).expect("valid toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_particle_section_overrides() {
        let config: EngineConfig = toml::from_str(
            r#"
            tick_rate = 30

            [particles]
            count = 200
            texture_path = "assets/textures/snow.png"
            gravity = [0.0, -0.2, 0.0]
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.particles.resolved_count(), 200);
        assert_eq!(config.particles.gravity, Vec3::new(0.0, -0.2, 0.0));
        assert_eq!(config.particles.velocity, Vec3::new(0.0, -100.0, 0.0));
        assert_eq!(config.window_width, 1280);
    }
}
