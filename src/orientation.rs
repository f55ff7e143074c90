//! Picks the pivot rotation that presents an object's most readable face to the camera.
//!
//! The decision tree runs once per object on the bounds sampled under an identity
//! pivot rotation. The same size always yields the same rotation.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{StageError, StageResult};
use crate::math::{rotate_world, Axis, Bounds};

/// Tunable ratios and angles of the decision tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationThresholds {
    /// Height below this fraction of both footprint sides marks an object as flat
    pub flat_ratio: f32,
    /// Side ratio below which a footprint counts as narrow
    pub narrow_ratio: f32,
    /// Side ratio below which a footprint counts as noticeably oblong
    pub oblong_ratio: f32,
    /// Relative difference under which two sides count as equal
    pub equal_tolerance: f32,
    pub flat_tilt: f32,
    pub flat_spin: f32,
    pub standing_tilt: f32,
    pub standing_yaw: f32,
    pub standing_roll: f32,
    pub elongated_roll: f32,
}

impl Default for OrientationThresholds {
    fn default() -> Self {
        Self {
            flat_ratio: 0.5,
            narrow_ratio: 0.5,
            oblong_ratio: 0.85,
            equal_tolerance: 0.01,
            flat_tilt: -80.0,
            flat_spin: 15.0,
            standing_tilt: -25.0,
            standing_yaw: 45.0,
            standing_roll: 25.0,
            elongated_roll: 45.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationStep {
    pub axis: Axis,
    pub degrees: f32,
}

impl RotationStep {
    pub fn new(axis: Axis, degrees: f32) -> Self {
        Self { axis, degrees }
    }
}

/// Which rule of the tree produced an orientation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Branch {
    Override,
    /// Case 0 keeps the original yaw
    Flat(u8),
    Standing(u8),
}

/// Sequence of world-axis rotations applied to an identity pivot
#[derive(Clone, Debug, PartialEq)]
pub struct Orientation {
    pub branch: Branch,
    pub steps: Vec<RotationStep>,
}

impl Orientation {
    /// Engine-style Euler angles expressed as the equivalent world-axis steps
    pub fn from_euler(euler: Vec3) -> Self {
        Self {
            branch: Branch::Override,
            steps: vec![
                RotationStep::new(Axis::Forward, euler.z),
                RotationStep::new(Axis::Right, euler.x),
                RotationStep::new(Axis::Up, euler.y),
            ],
        }
    }

    pub fn rotation(&self) -> Quat {
        self.steps.iter().fold(Quat::IDENTITY, |rotation, step| {
            rotate_world(rotation, step.axis.vector(), step.degrees)
        })
    }
}

/// Runs the decision tree on the full size of an object's bounds
pub fn classify(size: Vec3, t: &OrientationThresholds) -> Orientation {
    use Axis::{Forward, Right, Up};

    let step = RotationStep::new;
    let nearly_equal = |a: f32, b: f32| (a - b).abs() / b < t.equal_tolerance;

    if size.y < size.x * t.flat_ratio && size.y < size.z * t.flat_ratio {
        let (case, mut steps) = if size.z < size.x * t.narrow_ratio {
            (1, vec![step(Up, -45.0)])
        } else if size.z < size.x * t.oblong_ratio {
            (2, vec![step(Up, -90.0)])
        } else if size.x < size.z * t.narrow_ratio {
            (3, vec![step(Up, -45.0)])
        } else {
            (0, Vec::new())
        };
        steps.push(step(Right, t.flat_tilt));
        steps.push(step(Up, t.flat_spin));

        return Orientation {
            branch: Branch::Flat(case),
            steps,
        };
    }

    let (case, steps) = if size.x < size.z * t.oblong_ratio {
        (1, vec![step(Right, t.standing_tilt), step(Up, -t.standing_yaw)])
    } else if nearly_equal(size.y, size.x) && size.x < size.z * t.oblong_ratio {
        (2, vec![step(Right, t.standing_tilt), step(Up, t.standing_yaw)])
    } else if nearly_equal(size.y, size.z) && size.z < size.x * t.oblong_ratio {
        (3, vec![step(Forward, t.standing_roll), step(Up, -t.standing_yaw)])
    } else if size.y < size.x * t.narrow_ratio || size.x < size.y * t.narrow_ratio {
        (4, vec![step(Forward, t.elongated_roll), step(Right, t.standing_tilt)])
    } else {
        (5, vec![step(Right, t.standing_tilt)])
    };

    Orientation {
        branch: Branch::Standing(case),
        steps,
    }
}

/// Override table plus the heuristic fallback
#[derive(Clone, Debug, Default)]
pub struct OrientationSelector {
    overrides: HashMap<String, Vec3>,
    thresholds: OrientationThresholds,
}

impl OrientationSelector {
    pub fn new(overrides: HashMap<String, Vec3>, thresholds: OrientationThresholds) -> Self {
        Self {
            overrides,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &OrientationThresholds {
        &self.thresholds
    }

    pub fn override_for(&self, name: &str) -> Option<Vec3> {
        self.overrides.get(name).copied()
    }

    /// Chooses the orientation for `name`.
    ///
    /// `sample_bounds` is only invoked when no manual override exists for the name.
    pub fn select<F>(&self, name: &str, sample_bounds: F) -> StageResult<Orientation>
    where
        F: FnOnce() -> StageResult<Bounds>,
    {
        if let Some(euler) = self.override_for(name) {
            log::debug!("{name} uses manual rotation {euler}");
            return Ok(Orientation::from_euler(euler));
        }

        let bounds = sample_bounds()?;
        if bounds.is_empty() {
            return Err(StageError::NoBounds);
        }

        let orientation = classify(bounds.size(), &self.thresholds);
        for step in &orientation.steps {
            log::debug!(
                "{name} rotated {} {:?} | {:?}",
                step.degrees,
                step.axis,
                orientation.branch
            );
        }
        Ok(orientation)
    }
}
