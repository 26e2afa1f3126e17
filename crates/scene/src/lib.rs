//! Scene graph: the hierarchical collection of meshes, line segments, lights and groups.
//!
//! # Invariants
//! - Nodes are only ever added; there is no removal path.
//! - Traversal order is insertion order, independent of node ids.

pub mod geometry;
pub mod material;
pub mod scene;

pub use geometry::{BoxGeometry, LineGeometry, MeshGeometry, wireframe};
pub use material::{DirectionalLight, LineBasicMaterial, PhongMaterial};
pub use scene::{Node, NodeKind, Scene, SceneError, Transform};
