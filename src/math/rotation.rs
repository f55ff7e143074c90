//! Rotation helpers using the engine convention: left-handed, +Y up, +Z forward,
//! Euler angles in degrees applied Z, then X, then Y.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World axis a rotation step turns about
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Right,
    Up,
    Forward,
}

impl Axis {
    pub fn vector(self) -> Vec3 {
        match self {
            Axis::Right => Vec3::X,
            Axis::Up => Vec3::Y,
            Axis::Forward => Vec3::Z,
        }
    }
}

/// Quaternion for engine-style Euler angles (degrees)
pub fn euler_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// Engine-style Euler angles (degrees, each in [0, 360)) for a rotation
pub fn quat_to_euler(rotation: Quat) -> Vec3 {
    let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(x, y, z).map(|a| a.to_degrees().rem_euclid(360.0))
}

/// Rotates `rotation` about a world-space axis
pub fn rotate_world(rotation: Quat, axis: Vec3, degrees: f32) -> Quat {
    (Quat::from_axis_angle(axis.normalize(), degrees.to_radians()) * rotation).normalize()
}

/// Rotates `rotation` about one of its own local axes
pub fn rotate_local(rotation: Quat, axis: Vec3, degrees: f32) -> Quat {
    (rotation * Quat::from_axis_angle(axis.normalize(), degrees.to_radians())).normalize()
}

/// Wraps an angle into (-180, 180] and rounds to two decimals
pub fn wrap_angle(angle: f32) -> f32 {
    let mut angle = angle.rem_euclid(360.0);
    if angle > 180.0 {
        angle -= 360.0;
    }
    let rounded = (angle * 100.0).round() / 100.0;
    if rounded == -180.0 {
        180.0
    } else {
        rounded + 0.0
    }
}

/// Applies a world-axis rotation to an Euler triple and returns the wrapped result.
///
/// Used for hand-tuning rotation overrides one axis at a time.
pub fn rotate_euler_world(euler: Vec3, axis: Axis, degrees: f32) -> Vec3 {
    let rotated = rotate_world(euler_to_quat(euler), axis.vector(), degrees);
    quat_to_euler(rotated).map(wrap_angle)
}
