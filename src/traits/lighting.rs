use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::scene::NodeId;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Spot { angle: f32 },
    Point,
}

/// Light component attached to a scene node; it shines along the node's +Z
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    /// Linear RGB
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub enabled: bool,
}

impl Light {
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            range: f32::INFINITY,
            enabled: true,
        }
    }

    pub fn spot(color: Vec3, intensity: f32, angle: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Spot { angle },
            color,
            intensity,
            range,
            enabled: true,
        }
    }
}

/// Global lighting state of the host engine
pub trait LightingHost {
    /// Every node carrying a light component
    fn light_nodes(&self) -> Vec<NodeId>;

    fn light(&self, node: NodeId) -> Option<Light>;

    fn attach_light(&mut self, node: NodeId, light: Light);

    fn set_light_enabled(&mut self, node: NodeId, enabled: bool);

    fn ambient_light(&self) -> Vec3;

    fn set_ambient_light(&mut self, color: Vec3);
}
