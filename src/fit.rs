//! Camera framing: choose the camera lens, view direction and pivot placement so a
//! point cloud fills the output with the requested padding.

use glam::{Quat, UVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::{horizontal_to_vertical_fov, Projection, StageCamera};
use crate::error::{StageError, StageResult};
use crate::math::Bounds;

/// Closest the object center may sit to the camera
pub const MIN_CAMERA_DISTANCE: f32 = 3.0;
pub const DEFAULT_FIT_ITERATIONS: usize = 2;
/// Closest a pixel-area scaled object is placed in front of the camera
pub const MIN_AREA_DISTANCE: f32 = 1.0;

/// Forward distances at or below this are treated as touching the camera plane
const PLANE_EPSILON: f32 = 1e-6;

/// Margin around the fitted object
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Padding {
    /// Fraction added to the tight fit, 0.1 = 10% larger frame
    Fraction(f32),
    /// Pixels kept free on each side, horizontally and vertically
    Pixels(Vec2),
}

impl Padding {
    /// Padding as a fraction for the given output resolution
    pub fn fraction(&self, resolution: UVec2) -> f32 {
        match *self {
            Padding::Fraction(f) => f.max(0.0),
            Padding::Pixels(margin) => {
                let res = resolution.as_vec2();
                let content = (res - margin * 2.0).max(Vec2::ONE);
                ((res / content).max_element() - 1.0).max(0.0)
            }
        }
    }
}

impl Default for Padding {
    fn default() -> Self {
        Padding::Pixels(Vec2::new(32.0, 32.0))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    pub iterations: usize,
    pub min_distance: f32,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_FIT_ITERATIONS,
            min_distance: MIN_CAMERA_DISTANCE,
        }
    }
}

/// Result of fitting a camera to an object
#[derive(Clone, Debug, PartialEq)]
pub struct Framing {
    /// Where the pivot must move so the object sits in front of the camera
    pub pivot_position: Vec3,
    pub camera_rotation: Quat,
    pub projection: Projection,
    /// Object bounds with the pivot at the origin
    pub bounds: Bounds,
}

/// Orthographic half-height fitting `bounds` into a frame of `aspect`
pub fn orthographic_size(bounds: &Bounds, aspect: f32, padding: f32) -> f32 {
    let size_x = bounds.extents.x.abs() / aspect;
    let size_y = bounds.extents.y.abs();
    size_x.max(size_y) * (1.0 + padding)
}

/// Distance from the camera at which the object center is placed
pub fn pivot_distance(near: f32, bounds: &Bounds, min_distance: f32) -> f32 {
    (near + bounds.size().z).max(min_distance)
}

/// Angular spread of `vertices` seen from the camera along `direction`, in degrees.
///
/// Each vertex contributes `atan(d_direction / d_forward)` where both distances are
/// measured from the planes through the camera position.
pub fn camera_angles(
    camera: &StageCamera,
    direction: Vec3,
    vertices: &[Vec3],
) -> StageResult<(f32, f32)> {
    if vertices.is_empty() {
        return Err(StageError::NoRenderers);
    }

    let forward = camera.forward();
    let mut tangent_min = f32::INFINITY;
    let mut tangent_max = f32::NEG_INFINITY;

    for &vertex in vertices {
        let offset = vertex - camera.position;
        let forward_distance = offset.dot(forward);
        if forward_distance <= PLANE_EPSILON {
            return Err(StageError::GeometryBehindCamera);
        }

        let tangent = offset.dot(direction) / forward_distance;
        tangent_min = tangent_min.min(tangent);
        tangent_max = tangent_max.max(tangent);
    }

    Ok((
        tangent_min.atan().to_degrees(),
        tangent_max.atan().to_degrees(),
    ))
}

/// Turns the camera towards the angular center of `vertices` and returns the vertical
/// field of view, in degrees and without padding, that just contains them.
///
/// Yaw and pitch corrections perturb each other, so both are alternated for
/// `iterations` rounds before the final measurement.
pub fn fit_perspective(
    camera: &mut StageCamera,
    vertices: &[Vec3],
    iterations: usize,
) -> StageResult<f32> {
    for _ in 0..iterations {
        let (min, max) = camera_angles(camera, camera.right(), vertices)?;
        camera.rotate_world(Vec3::Y, (min + max) / 2.0);

        let (min, max) = camera_angles(camera, -camera.up(), vertices)?;
        camera.rotate_local(Vec3::X, (min + max) / 2.0);
    }

    let (min_h, max_h) = camera_angles(camera, camera.right(), vertices)?;
    let (min_v, max_v) = camera_angles(camera, -camera.up(), vertices)?;

    let vertical = (-min_v).max(max_v) * 2.0;
    let horizontal = horizontal_to_vertical_fov((-min_h).max(max_h) * 2.0, camera.aspect);
    Ok(vertical.max(horizontal))
}

/// Fits `camera` to `points`, sampled with the pivot at the world origin.
///
/// The camera itself is left untouched; the returned [`Framing`] carries the new
/// projection, camera rotation and pivot position.
pub fn fit_camera(
    camera: &StageCamera,
    points: &[Vec3],
    padding: f32,
    settings: &FitSettings,
) -> StageResult<Framing> {
    let bounds = Bounds::from_points(points)?;
    if bounds.is_empty() {
        return Err(StageError::NoBounds);
    }

    let distance = pivot_distance(camera.near, &bounds, settings.min_distance);
    let pivot_position = camera.position - bounds.center + camera.forward() * distance;

    let mut fitted = camera.clone();
    let projection = match camera.projection {
        Projection::Orthographic { .. } => Projection::Orthographic {
            size: orthographic_size(&bounds, camera.aspect, padding),
        },
        Projection::Perspective { .. } => {
            let moved: Vec<Vec3> = points.iter().map(|&p| p + pivot_position).collect();
            let fov = fit_perspective(&mut fitted, &moved, settings.iterations)?;
            Projection::Perspective {
                fov: fov * (1.0 + padding),
            }
        }
    };

    Ok(Framing {
        pivot_position,
        camera_rotation: fitted.rotation,
        projection,
        bounds,
    })
}

/// Uniform scale and camera-space offset that fit `bounds` into `target_pixels` of a
/// frame whose visible half-height is `half_height` world units at the object.
///
/// `margin` is the world-space border left free on each axis. The offset centers the
/// scaled object on the view axis and pushes it past the near plane, but never closer
/// than [`MIN_AREA_DISTANCE`]. Only meaningful for orthographic cameras.
pub fn fit_to_pixel_area(
    bounds: &Bounds,
    half_height: f32,
    resolution_y: u32,
    target_pixels: Vec2,
    margin: f32,
    near: f32,
) -> StageResult<(f32, Vec3)> {
    if bounds.is_empty() {
        return Err(StageError::NoBounds);
    }

    let pixels_per_unit = resolution_y as f32 / (2.0 * half_height);
    let target_world = target_pixels / pixels_per_unit;
    let size = bounds.size();

    let scale_x = (target_world.x - margin) / size.x;
    let scale_y = (target_world.y - margin) / size.y;
    let scale = match (scale_x.is_finite(), scale_y.is_finite()) {
        (true, true) => scale_x.min(scale_y),
        (true, false) => scale_x,
        (false, true) => scale_y,
        (false, false) => return Err(StageError::NoBounds),
    };

    let scaled_size = size * scale;
    let scaled_center = bounds.center * scale;
    let distance = (scaled_size.z + near).max(MIN_AREA_DISTANCE);
    let offset = Vec3::new(-scaled_center.x, -scaled_center.y, distance);

    Ok((scale, offset))
}
