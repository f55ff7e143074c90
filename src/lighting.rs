//! Stage light rig and the scoped guards used while rendering.

use std::ops::{Deref, DerefMut};

use glam::Vec3;

use crate::error::RenderError;
use crate::math::euler_to_quat;
use crate::traits::{
    Light, LightingHost, LocalTransform, NodeId, RenderBackend, RenderTargetId, SceneGraph,
};

/// Spot cone used by every fixture of the default rig
const SPOT_ANGLE: f32 = 80.0;
const SPOT_RANGE: f32 = 10.0;

/// A light placed relative to the rig root
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightFixture {
    pub name: &'static str,
    pub position: Vec3,
    /// Engine Euler angles in degrees
    pub euler: Vec3,
    pub light: Light,
}

/// Top light plus two angled fill lights in front of the object
pub fn default_rig() -> [LightFixture; 3] {
    [
        LightFixture {
            name: "SpotLight 1",
            position: Vec3::new(0.0, 3.0, 0.0),
            euler: Vec3::new(90.0, 0.0, 0.0),
            light: Light::spot(Vec3::ONE, 75.0, SPOT_ANGLE, SPOT_RANGE),
        },
        LightFixture {
            name: "SpotLight 2",
            position: Vec3::new(-2.7, 0.0, -2.7),
            euler: Vec3::new(0.0, 45.0, 0.0),
            light: Light::spot(Vec3::ONE, 50.0, SPOT_ANGLE, SPOT_RANGE),
        },
        LightFixture {
            name: "SpotLight 3",
            position: Vec3::new(2.7, 0.0, -2.7),
            euler: Vec3::new(0.0, -45.0, 0.0),
            light: Light::spot(Vec3::ONE, 30.0, SPOT_ANGLE, SPOT_RANGE),
        },
    ]
}

/// Creates the fixtures under `root`
pub fn build_rig<H>(host: &mut H, root: NodeId, fixtures: &[LightFixture]) -> Vec<NodeId>
where
    H: SceneGraph + LightingHost + ?Sized,
{
    fixtures
        .iter()
        .map(|fixture| {
            let node = host.create_node(fixture.name, Some(root));
            host.set_local_transform(
                node,
                LocalTransform {
                    position: fixture.position,
                    rotation: euler_to_quat(fixture.euler),
                    scale: Vec3::ONE,
                },
            );
            host.attach_light(node, fixture.light);
            node
        })
        .collect()
}

/// Turns off every enabled light outside `keep` and zeroes the ambient term.
///
/// Derefs to the host so rendering can continue through the guard; the previous
/// light and ambient state comes back when it drops.
pub struct IsolatedLights<'h, H: SceneGraph + LightingHost + ?Sized> {
    host: &'h mut H,
    disabled: Vec<NodeId>,
    ambient: Vec3,
    rig: NodeId,
}

impl<'h, H: SceneGraph + LightingHost + ?Sized> IsolatedLights<'h, H> {
    /// Isolates the lights under `keep` and activates `rig` for the guard's lifetime
    pub fn new(host: &'h mut H, keep: NodeId, rig: NodeId) -> Self {
        let mut disabled = Vec::new();
        for node in host.light_nodes() {
            if host.is_descendant_of(node, keep) {
                continue;
            }
            let enabled = host.light(node).is_some_and(|light| light.enabled);
            if enabled {
                host.set_light_enabled(node, false);
                disabled.push(node);
            }
        }

        let ambient = host.ambient_light();
        host.set_ambient_light(Vec3::ZERO);
        host.set_active(rig, true);

        log::debug!("isolated stage lights, {} foreign lights disabled", disabled.len());
        Self {
            host,
            disabled,
            ambient,
            rig,
        }
    }

    pub fn disabled(&self) -> &[NodeId] {
        &self.disabled
    }
}

impl<H: SceneGraph + LightingHost + ?Sized> Deref for IsolatedLights<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: SceneGraph + LightingHost + ?Sized> DerefMut for IsolatedLights<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: SceneGraph + LightingHost + ?Sized> Drop for IsolatedLights<'_, H> {
    fn drop(&mut self) {
        self.host.set_active(self.rig, false);
        for &node in &self.disabled {
            if self.host.contains(node) {
                self.host.set_light_enabled(node, true);
            }
        }
        self.host.set_ambient_light(self.ambient);
    }
}

/// Render target released back to the backend on drop
pub struct TemporaryTarget<'h, H: RenderBackend + ?Sized> {
    host: &'h mut H,
    target: RenderTargetId,
}

impl<'h, H: RenderBackend + ?Sized> TemporaryTarget<'h, H> {
    pub fn acquire(host: &'h mut H, width: u32, height: u32) -> Result<Self, RenderError> {
        let target = host.acquire_target(width, height)?;
        Ok(Self { host, target })
    }

    pub fn id(&self) -> RenderTargetId {
        self.target
    }
}

impl<H: RenderBackend + ?Sized> Deref for TemporaryTarget<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: RenderBackend + ?Sized> DerefMut for TemporaryTarget<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: RenderBackend + ?Sized> Drop for TemporaryTarget<'_, H> {
    fn drop(&mut self) {
        self.host.release_target(self.target);
    }
}
