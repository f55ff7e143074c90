use glam::{Mat4, Vec3};

use crate::error::{StageError, StageResult};

/// Axis-aligned box stored as center and half-size
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Bounds {
    pub fn new(center: Vec3, extents: Vec3) -> Self {
        Self {
            center,
            extents: extents.abs(),
        }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }

    /// Smallest box containing every point, in the frame the points are expressed in.
    ///
    /// An empty slice means the sampled node had nothing to render.
    pub fn from_points(points: &[Vec3]) -> StageResult<Self> {
        let (first, rest) = points.split_first().ok_or(StageError::NoRenderers)?;

        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(min, max), &p| (min.min(p), max.max(p)));

        Ok(Self::from_min_max(min, max))
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    /// Full edge lengths
    pub fn size(&self) -> Vec3 {
        self.extents * 2.0
    }

    /// True when the box has no volume along every axis
    pub fn is_empty(&self) -> bool {
        self.extents == Vec3::ZERO
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
    }

    pub fn contains(&self, point: Vec3, epsilon: f32) -> bool {
        let d = (point - self.center).abs() - self.extents;
        d.max_element() <= epsilon
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min(), self.max());
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// Axis-aligned box of this box's corners after `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Bounds {
        let corners = self.corners().map(|c| matrix.transform_point3(c));
        let (min, max) = corners
            .iter()
            .skip(1)
            .fold((corners[0], corners[0]), |(min, max), &p| (min.min(p), max.max(p)));
        Bounds::from_min_max(min, max)
    }
}
