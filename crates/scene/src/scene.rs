use crate::geometry::{LineGeometry, MeshGeometry};
use crate::material::{DirectionalLight, LineBasicMaterial, PhongMaterial};
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::collections::BTreeMap;
use viewloop_common::{Color, NodeId};

/// Errors from scene graph construction.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("parent node {0:?} does not exist")]
    UnknownParent(NodeId),
}

/// Local transform of a node relative to its parent.
///
/// Rotation is stored as XYZ Euler angles in radians so animations can drive
/// one axis at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn quaternion(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        )
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quaternion(), self.position)
    }
}

/// What a node draws or emits.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure container; only its transform matters.
    Group,
    Mesh {
        geometry: MeshGeometry,
        material: PhongMaterial,
    },
    LineSegments {
        geometry: LineGeometry,
        material: LineBasicMaterial,
    },
    DirectionalLight(DirectionalLight),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Mesh { .. } => "mesh",
            NodeKind::LineSegments { .. } => "lines",
            NodeKind::DirectionalLight(_) => "light",
        }
    }
}

/// A scene graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub kind: NodeKind,
    pub transform: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            kind,
            transform: Transform::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn mesh(geometry: MeshGeometry, material: PhongMaterial) -> Self {
        Self::new(NodeKind::Mesh { geometry, material })
    }

    pub fn line_segments(geometry: LineGeometry, material: LineBasicMaterial) -> Self {
        Self::new(NodeKind::LineSegments { geometry, material })
    }

    pub fn directional_light(light: DirectionalLight) -> Self {
        Self::new(NodeKind::DirectionalLight(light))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Scene graph root. Nodes can be added but never removed.
///
/// Traversal follows insertion order: roots in the order they were added, each
/// node's children in the order they were attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: Color,
    nodes: BTreeMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            background: Color::BLACK,
            nodes: BTreeMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Add a node at the top level. Returns its id.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId::new();
        self.insert(id, None, node);
        self.roots.push(id);
        id
    }

    /// Attach a node under an existing parent.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId, SceneError> {
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return Err(SceneError::UnknownParent(parent));
        };
        let id = NodeId::new();
        parent_node.children.push(id);
        self.insert(id, Some(parent), node);
        Ok(id)
    }

    fn insert(&mut self, id: NodeId, parent: Option<NodeId>, mut node: Node) {
        node.parent = parent;
        node.children.clear();
        tracing::trace!(node = %id.short(), kind = node.kind.label(), "scene add");
        self.nodes.insert(id, node);
    }

    /// World matrix of a node: the product of its ancestors' local matrices.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(&id)?;
        let mut matrix = node.transform.matrix();
        while let Some(parent) = node.parent {
            node = self.nodes.get(&parent)?;
            matrix = node.transform.matrix() * matrix;
        }
        Some(matrix)
    }

    /// Depth-first traversal in insertion order, passing each node's world matrix.
    pub fn visit(&self, mut f: impl FnMut(NodeId, &Node, Mat4)) {
        let mut stack: Vec<(NodeId, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, Mat4::IDENTITY))
            .collect();

        while let Some((id, parent_matrix)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let world = parent_matrix * node.transform.matrix();
            f(id, node, world);
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    /// Every directional light with its world-space position.
    pub fn directional_lights(&self) -> Vec<(DirectionalLight, Vec3)> {
        let mut lights = Vec::new();
        self.visit(|_, node, world| {
            if let NodeKind::DirectionalLight(light) = &node.kind {
                lights.push((*light, world.transform_point3(Vec3::ZERO)));
            }
        });
        lights
    }
}
