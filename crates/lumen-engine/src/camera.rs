//! Yaw/pitch camera for viewing the particle volume.

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Pitch limit in radians, short of straight up/down.
const MAX_PITCH: f32 = 89.0 * std::f32::consts::PI / 180.0;

const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

/// Perspective camera that turns in place.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Eye position
    pub position: Vec3,
    /// Heading in radians; 0 looks down -Z
    yaw: f32,
    /// Elevation in radians
    pitch: f32,
    /// Vertical field of view in radians
    fov_y: f32,
    /// Turn rate in radians per second
    turn_speed: f32,
    /// Viewport width / height
    aspect: f32,
}

impl Camera {
    /// Creates a camera from config for a viewport of `width` x `height`.
    #[must_use]
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: config.position,
            yaw: config.yaw_degrees.to_radians(),
            pitch: 0.0,
            fov_y: config.fov_degrees.to_radians(),
            turn_speed: config.turn_speed.to_radians(),
            aspect: 1.0,
        };
        camera.set_pitch(config.pitch_degrees.to_radians());
        camera.set_viewport(width, height);
        camera
    }

    /// Updates the aspect ratio. Zero-sized viewports are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Turns by `yaw_axis` / `pitch_axis` (each -1..=1) for `dt` seconds.
    pub fn turn(&mut self, yaw_axis: f32, pitch_axis: f32, dt: f32) {
        let step = self.turn_speed * dt;
        self.yaw = (self.yaw + yaw_axis * step).rem_euclid(std::f32::consts::TAU);
        self.set_pitch(self.pitch + pitch_axis * step);
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Unit view direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
    }

    /// Combined projection and view matrix.
    #[must_use]
    pub fn view_proj(&self) -> Mat4 {
        let projection = Mat4::perspective_rh(self.fov_y, self.aspect, NEAR_PLANE, FAR_PLANE);
        let view = Mat4::look_to_rh(self.position, self.forward(), Vec3::Y);
        projection * view
    }

    /// Heading in radians.
    #[must_use]
    #[allow(dead_code)]
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Elevation in radians.
    #[must_use]
    #[allow(dead_code)]
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }
}
