use glam::{Quat, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::math::{rotate_local, rotate_world};
use crate::traits::CullingMask;

pub const NEAR_CLIP: f32 = 0.1;
pub const FAR_CLIP: f32 = 10.0;
pub const DEFAULT_FIELD_OF_VIEW: f32 = 60.0;
pub const DEFAULT_ORTHOGRAPHIC_SIZE: f32 = 1.0;

/// Camera lens; sizes are half-heights in world units, angles are vertical degrees
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Orthographic { size: f32 },
    Perspective { fov: f32 },
}

impl Projection {
    pub fn orthographic() -> Self {
        Projection::Orthographic {
            size: DEFAULT_ORTHOGRAPHIC_SIZE,
        }
    }

    pub fn perspective() -> Self {
        Projection::Perspective {
            fov: DEFAULT_FIELD_OF_VIEW,
        }
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self, Projection::Orthographic { .. })
    }
}

/// Stage camera: looks along its local +Z with +Y up
#[derive(Clone, Debug, PartialEq)]
pub struct StageCamera {
    pub position: Vec3,
    pub rotation: Quat,
    pub projection: Projection,
    /// Width over height of the output
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub culling_mask: CullingMask,
    /// Premultiplied clear color
    pub background: Vec4,
}

impl StageCamera {
    pub fn new(position: Vec3, projection: Projection, aspect: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            projection,
            aspect,
            near: NEAR_CLIP,
            far: FAR_CLIP,
            culling_mask: CullingMask::ALL,
            background: Vec4::ZERO,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn rotate_world(&mut self, axis: Vec3, degrees: f32) {
        self.rotation = rotate_world(self.rotation, axis, degrees);
    }

    pub fn rotate_local(&mut self, axis: Vec3, degrees: f32) {
        self.rotation = rotate_local(self.rotation, axis, degrees);
    }

    /// World point in camera space: x right, y up, z forward
    pub fn to_camera_space(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }

    /// Half of the visible height at `distance` along the view axis
    pub fn half_height_at(&self, distance: f32) -> f32 {
        match self.projection {
            Projection::Orthographic { size } => size,
            Projection::Perspective { fov } => distance * (fov.to_radians() * 0.5).tan(),
        }
    }

    /// Normalized device position (x, y in [-1, 1] when on screen) and view depth,
    /// or `None` for points closer than the near plane.
    pub fn project(&self, point: Vec3) -> Option<(Vec2, f32)> {
        let p = self.to_camera_space(point);
        if p.z < self.near {
            return None;
        }

        let half_height = self.half_height_at(p.z);
        let half_width = half_height * self.aspect;
        Some((Vec2::new(p.x / half_width, p.y / half_height), p.z))
    }
}

/// Converts a horizontal field of view to the vertical one for `aspect`, in degrees
pub fn horizontal_to_vertical_fov(horizontal: f32, aspect: f32) -> f32 {
    2.0 * ((horizontal.to_radians() * 0.5).tan() / aspect).atan().to_degrees()
}
