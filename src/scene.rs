//! Arena-backed scene graph implementing every host trait, used by the command line
//! tool and the tests.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use log::{Level, LevelFilter};

use crate::camera::StageCamera;
use crate::error::RenderError;
use crate::frame::Frame;
use crate::renderer::{DrawItem, Mesh, Rasterizer, SceneLight};
use crate::traits::{
    CullingMask, GeometrySource, Light, LightingHost, LocalTransform, NodeId, RenderBackend,
    RenderTargetId, SceneGraph,
};

#[derive(Clone, Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: LocalTransform,
    active: bool,
    layer: u8,
    mesh: Option<Mesh>,
    light: Option<Light>,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            local: LocalTransform::IDENTITY,
            active: true,
            layer: 0,
            mesh: None,
            light: None,
        }
    }
}

pub struct MemoryScene {
    nodes: Vec<Option<Node>>,
    ambient: Vec3,
    targets: HashMap<u32, Frame>,
    next_target: u32,
    mesh_log_level: LevelFilter,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            ambient: Vec3::splat(0.2),
            targets: HashMap::new(),
            next_target: 0,
            mesh_log_level: LevelFilter::Off,
        }
    }

    /// Level at which per-node vertex extraction is reported
    pub fn set_mesh_log_level(&mut self, level: LevelFilter) {
        self.mesh_log_level = level;
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    /// Creates a node carrying `mesh`
    pub fn spawn_mesh(&mut self, name: &str, parent: Option<NodeId>, mesh: Mesh) -> NodeId {
        let id = self.create_node(name, parent);
        self.set_mesh(id, mesh);
        id
    }

    pub fn set_mesh(&mut self, node: NodeId, mesh: Mesh) {
        if let Some(n) = self.node_mut(node) {
            n.mesh = Some(mesh);
        }
    }

    pub fn mesh(&self, node: NodeId) -> Option<&Mesh> {
        self.node(node)?.mesh.as_ref()
    }

    pub fn set_layer(&mut self, node: NodeId, layer: u8) {
        if let Some(n) = self.node_mut(node) {
            n.layer = layer;
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[][..], |n| n.children.as_slice())
    }

    /// First live node named `name`
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.ids().find(|&id| self.name(id) == Some(name))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Removes `node` and its whole subtree
    pub fn despawn(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.get_mut(node.0 as usize).and_then(Option::take) else {
            return;
        };
        if let Some(parent) = removed.parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|&c| c != node);
        }
        for child in removed.children {
            self.despawn(child);
        }
    }

    /// Render targets acquired and not yet released
    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    fn roots(&self) -> Vec<NodeId> {
        self.ids().filter(|&id| self.parent(id).is_none()).collect()
    }

    fn collect_vertices(&self, id: NodeId, matrix: Mat4, mask: CullingMask, out: &mut Vec<Vec3>) {
        let Some(node) = self.node(id) else {
            return;
        };
        if !node.active {
            return;
        }

        if let Some(mesh) = &node.mesh {
            if mask.includes(node.layer) {
                if Level::Debug <= self.mesh_log_level {
                    log::debug!("{}: {} vertices", node.name, mesh.positions.len());
                }
                out.extend(mesh.positions.iter().map(|&p| matrix.transform_point3(p)));
            } else if Level::Debug <= self.mesh_log_level {
                log::debug!("{}: layer {} culled", node.name, node.layer);
            }
        }

        for &child in &node.children {
            if let Some(local) = self.local_transform(child) {
                self.collect_vertices(child, matrix * local.matrix(), mask, out);
            }
        }
    }

    fn collect_draws<'a>(
        &'a self,
        id: NodeId,
        parent: Mat4,
        mask: CullingMask,
        draws: &mut Vec<DrawItem<'a>>,
        lights: &mut Vec<SceneLight>,
    ) {
        let Some(node) = self.node(id) else {
            return;
        };
        if !node.active {
            return;
        }

        let matrix = parent * node.local.matrix();
        if let Some(mesh) = &node.mesh {
            if mask.includes(node.layer) {
                draws.push(DrawItem { matrix, mesh });
            }
        }
        if let Some(light) = node.light.filter(|l| l.enabled) {
            lights.push(SceneLight {
                position: matrix.transform_point3(Vec3::ZERO),
                direction: matrix.transform_vector3(Vec3::Z).normalize_or_zero(),
                light,
            });
        }

        for &child in &node.children {
            self.collect_draws(child, matrix, mask, draws, lights);
        }
    }
}

impl SceneGraph for MemoryScene {
    fn create_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = parent.filter(|&p| self.contains(p));
        self.nodes.push(Some(Node::new(name, parent)));
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.push(id);
        }
        id
    }

    fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.name.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        if !self.contains(node) {
            return;
        }
        let parent = parent.filter(|&p| self.contains(p));
        // refuse cycles
        if parent.is_some_and(|p| self.is_descendant_of(p, node)) {
            return;
        }

        if let Some(old) = self.parent(node).and_then(|p| self.node_mut(p)) {
            old.children.retain(|&c| c != node);
        }
        if let Some(new) = parent.and_then(|p| self.node_mut(p)) {
            new.children.push(node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = parent;
        }
    }

    fn local_transform(&self, node: NodeId) -> Option<LocalTransform> {
        self.node(node).map(|n| n.local)
    }

    fn set_local_transform(&mut self, node: NodeId, transform: LocalTransform) {
        if let Some(n) = self.node_mut(node) {
            n.local = transform;
        }
    }

    fn is_active(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|n| n.active)
    }

    fn set_active(&mut self, node: NodeId, active: bool) {
        if let Some(n) = self.node_mut(node) {
            n.active = active;
        }
    }
}

impl GeometrySource for MemoryScene {
    fn vertices(
        &self,
        node: NodeId,
        mask: CullingMask,
        override_matrix: Option<Mat4>,
    ) -> Vec<Vec3> {
        let base = override_matrix.unwrap_or_else(|| self.world_matrix(node));
        let mut out = Vec::new();
        self.collect_vertices(node, base, mask, &mut out);
        out
    }
}

impl LightingHost for MemoryScene {
    fn light_nodes(&self) -> Vec<NodeId> {
        self.ids()
            .filter(|&id| self.node(id).is_some_and(|n| n.light.is_some()))
            .collect()
    }

    fn light(&self, node: NodeId) -> Option<Light> {
        self.node(node)?.light
    }

    fn attach_light(&mut self, node: NodeId, light: Light) {
        if let Some(n) = self.node_mut(node) {
            n.light = Some(light);
        }
    }

    fn set_light_enabled(&mut self, node: NodeId, enabled: bool) {
        if let Some(light) = self.node_mut(node).and_then(|n| n.light.as_mut()) {
            light.enabled = enabled;
        }
    }

    fn ambient_light(&self) -> Vec3 {
        self.ambient
    }

    fn set_ambient_light(&mut self, color: Vec3) {
        self.ambient = color;
    }
}

impl RenderBackend for MemoryScene {
    fn acquire_target(&mut self, width: u32, height: u32) -> Result<RenderTargetId, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResolution { width, height });
        }
        let id = self.next_target;
        self.next_target += 1;
        self.targets.insert(id, Frame::new(width, height));
        Ok(RenderTargetId(id))
    }

    fn render(&mut self, camera: &StageCamera, target: RenderTargetId) -> Result<(), RenderError> {
        let (width, height) = self
            .targets
            .get(&target.0)
            .map(|f| (f.width, f.height))
            .ok_or(RenderError::UnknownTarget(target.0))?;

        let mut draws = Vec::new();
        let mut lights = Vec::new();
        for root in self.roots() {
            self.collect_draws(root, Mat4::IDENTITY, camera.culling_mask, &mut draws, &mut lights);
        }

        let frame = Rasterizer::new(width, height).render(camera, &draws, &lights, self.ambient);
        log::debug!(
            "rasterized {} meshes with {} lights into target {}",
            draws.len(),
            lights.len(),
            target.0
        );
        self.targets.insert(target.0, frame);
        Ok(())
    }

    fn read_pixels(&self, target: RenderTargetId) -> Result<Frame, RenderError> {
        self.targets
            .get(&target.0)
            .cloned()
            .ok_or(RenderError::UnknownTarget(target.0))
    }

    fn release_target(&mut self, target: RenderTargetId) {
        self.targets.remove(&target.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec4};

    #[test]
    fn test_reparent_keeps_local_transform() {
        let mut scene = MemoryScene::new();
        let a = scene.create_node("a", None);
        let b = scene.create_node("b", None);
        scene.set_local_transform(b, LocalTransform::from_position(Vec3::X));
        scene.set_parent(b, Some(a));
        assert_eq!(scene.local_transform(b).unwrap().position, Vec3::X);
        assert_eq!(scene.children(a), &[b]);
    }

    #[test]
    fn test_set_parent_rejects_cycle() {
        let mut scene = MemoryScene::new();
        let a = scene.create_node("a", None);
        let b = scene.create_node("b", Some(a));
        scene.set_parent(a, Some(b));
        assert_eq!(scene.parent(a), None);
    }

    #[test]
    fn test_vertices_use_override_matrix() {
        let mut scene = MemoryScene::new();
        let root = scene.create_node("root", None);
        scene.set_local_transform(root, LocalTransform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        let child = scene.spawn_mesh("child", Some(root), Mesh::cuboid(Vec3::ONE, Vec4::ONE));
        scene.set_local_transform(child, LocalTransform::from_position(Vec3::Y));

        let world = scene.bounds(root, CullingMask::ALL, None).unwrap();
        assert_eq!(world.center, Vec3::new(10.0, 1.0, 0.0));

        let local = scene
            .bounds(root, CullingMask::ALL, Some(Mat4::from_quat(Quat::IDENTITY)))
            .unwrap();
        assert_eq!(local.center, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_vertices_respect_mask_and_activity() {
        let mut scene = MemoryScene::new();
        let root = scene.create_node("root", None);
        let shown = scene.spawn_mesh("shown", Some(root), Mesh::cuboid(Vec3::ONE, Vec4::ONE));
        let hidden = scene.spawn_mesh("hidden", Some(root), Mesh::cuboid(Vec3::ONE, Vec4::ONE));
        scene.set_layer(hidden, 5);
        assert_eq!(scene.vertices(root, CullingMask::from_layers(&[0]), None).len(), 8);

        scene.set_active(shown, false);
        assert!(scene.vertices(root, CullingMask::from_layers(&[0]), None).is_empty());
    }

    #[test]
    fn test_despawn_removes_subtree() {
        let mut scene = MemoryScene::new();
        let root = scene.create_node("root", None);
        let child = scene.create_node("child", Some(root));
        scene.despawn(root);
        assert!(!scene.contains(root));
        assert!(!scene.contains(child));
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn test_render_targets_are_tracked() {
        let mut scene = MemoryScene::new();
        let target = scene.acquire_target(4, 4).unwrap();
        assert_eq!(scene.live_targets(), 1);
        scene.release_target(target);
        assert_eq!(scene.live_targets(), 0);
        assert_eq!(
            scene.read_pixels(target),
            Err(RenderError::UnknownTarget(target.0))
        );
        assert_eq!(
            scene.acquire_target(0, 4),
            Err(RenderError::InvalidResolution { width: 0, height: 4 })
        );
    }
}
