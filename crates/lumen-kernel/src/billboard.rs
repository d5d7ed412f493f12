//! Billboard orientation and per-particle model transforms.

use glam::{Mat4, Vec3};

/// Direction a particle quad faces before any rotation.
pub const QUAD_FACING: Vec3 = Vec3::Z;

/// Yaw that turns a quad towards the viewer.
///
/// This is the angle between the quad's default facing axis and the view
/// direction. Only yaw is corrected; pitch is not, so the quad is an
/// approximate Y-axis billboard. A zero-length direction yields 0.
#[must_use]
pub fn billboard_angle(view_direction: Vec3) -> f32 {
    match view_direction.try_normalize() {
        Some(dir) => QUAD_FACING.dot(dir).clamp(-1.0, 1.0).acos(),
        None => 0.0,
    }
}

/// Builds `translate(anchor + position) * scale(scale) * [rotate_y(angle)]`.
#[must_use]
pub fn model_matrix(anchor: Vec3, position: Vec3, scale: Vec3, yaw: Option<f32>) -> Mat4 {
    let model = Mat4::from_translation(anchor + position) * Mat4::from_scale(scale);
    match yaw {
        Some(angle) => model * Mat4::from_rotation_y(angle),
        None => model,
    }
}
