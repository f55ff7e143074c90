use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::scene::NodeId;
use crate::error::StageResult;
use crate::math::Bounds;

/// Bitmask of renderable layers; bit `n` selects layer `n`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CullingMask(pub u32);

impl CullingMask {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    pub fn from_layers(layers: &[u8]) -> Self {
        Self(layers.iter().fold(0, |mask, &layer| mask | (1 << layer)))
    }

    pub fn includes(&self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for CullingMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Vertex extraction for a node subtree
pub trait GeometrySource {
    /// Positions of every renderable vertex under `node` whose layer is in `mask`.
    ///
    /// Vertices are expressed through `override_matrix` in place of the node's own
    /// local-to-world matrix when one is given, so callers can sample geometry in any
    /// reference frame without moving the node. Without an override they are in
    /// world space.
    fn vertices(&self, node: NodeId, mask: CullingMask, override_matrix: Option<Mat4>)
        -> Vec<Vec3>;

    /// Bounds of [`vertices`](Self::vertices); fails when nothing is renderable
    fn bounds(
        &self,
        node: NodeId,
        mask: CullingMask,
        override_matrix: Option<Mat4>,
    ) -> StageResult<Bounds> {
        Bounds::from_points(&self.vertices(node, mask, override_matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_culling_mask_layers() {
        let mask = CullingMask::from_layers(&[0, 3]);
        assert_eq!(mask.0, 0b1001);
        assert!(mask.includes(0));
        assert!(!mask.includes(1));
        assert!(mask.includes(3));
        assert!(!mask.includes(40));
        assert!(CullingMask::ALL.includes(31));
    }
}
