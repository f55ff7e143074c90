use glam::{Mat4, Quat, Vec3};

/// Handle to a node in the host's scene graph
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Position, rotation and scale of a node relative to its parent
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Transform hierarchy of the host engine
pub trait SceneGraph {
    /// Create an empty, active node
    fn create_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId;

    /// Whether the node still exists
    fn contains(&self, node: NodeId) -> bool;

    fn name(&self, node: NodeId) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Reparent a node, keeping its local transform unchanged
    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>);

    fn local_transform(&self, node: NodeId) -> Option<LocalTransform>;

    fn set_local_transform(&mut self, node: NodeId, transform: LocalTransform);

    fn is_active(&self, node: NodeId) -> bool;

    fn set_active(&mut self, node: NodeId, active: bool);

    /// Local-to-world matrix, composed through every ancestor
    fn world_matrix(&self, node: NodeId) -> Mat4 {
        let local = self
            .local_transform(node)
            .map(|t| t.matrix())
            .unwrap_or(Mat4::IDENTITY);

        match self.parent(node) {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    fn world_rotation(&self, node: NodeId) -> Quat {
        let local = self
            .local_transform(node)
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY);

        match self.parent(node) {
            Some(parent) => self.world_rotation(parent) * local,
            None => local,
        }
    }

    fn world_position(&self, node: NodeId) -> Vec3 {
        self.world_matrix(node).transform_point3(Vec3::ZERO)
    }

    fn set_world_position(&mut self, node: NodeId, position: Vec3) {
        let Some(mut local) = self.local_transform(node) else {
            return;
        };
        local.position = match self.parent(node) {
            Some(parent) => self.world_matrix(parent).inverse().transform_point3(position),
            None => position,
        };
        self.set_local_transform(node, local);
    }

    fn set_world_rotation(&mut self, node: NodeId, rotation: Quat) {
        let Some(mut local) = self.local_transform(node) else {
            return;
        };
        local.rotation = match self.parent(node) {
            Some(parent) => self.world_rotation(parent).inverse() * rotation,
            None => rotation,
        };
        self.set_local_transform(node, local);
    }

    /// True if `node` is `ancestor` or sits anywhere below it
    fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Active only if the node and all of its ancestors are active
    fn is_active_in_hierarchy(&self, node: NodeId) -> bool {
        self.is_active(node)
            && self
                .parent(node)
                .map_or(true, |parent| self.is_active_in_hierarchy(parent))
    }
}
