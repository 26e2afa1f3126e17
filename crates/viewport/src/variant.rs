use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use viewloop_common::{Color, NodeId};
use viewloop_scene::{
    BoxGeometry, LineBasicMaterial, Node, PhongMaterial, Scene, SceneError, wireframe,
};

/// Milliseconds to seconds; the rotating cube uses elapsed seconds as radians.
const MS_TO_SECONDS: f64 = 0.001;

/// Which sketch the viewer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// A blue Phong cube spinning about X and Y.
    #[default]
    RotatingCube,
    /// A static grey cube with a yellow wireframe, orbitable with the mouse.
    WireframeCube,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::RotatingCube, Variant::WireframeCube];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::RotatingCube => "rotating-cube",
            Variant::WireframeCube => "wireframe-cube",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Variant::RotatingCube => "viewloop: rotating cube",
            Variant::WireframeCube => "viewloop: wireframe cube",
        }
    }

    pub fn uses_orbit_controls(&self) -> bool {
        matches!(self, Variant::WireframeCube)
    }

    /// Add this variant's model to the scene. Returns the node that frame
    /// updates track.
    pub fn build_model(&self, scene: &mut Scene) -> Result<NodeId, SceneError> {
        match self {
            Variant::RotatingCube => {
                let geometry = BoxGeometry::new(1.0, 1.0, 1.0).build();
                let material = PhongMaterial::new(Color::from_hex(0x044a88));
                Ok(scene.add(Node::mesh(geometry, material).named("cube")))
            }
            Variant::WireframeCube => {
                let geometry = BoxGeometry::new(1.0, 1.0, 1.0)
                    .with_segments(2, 2, 2)
                    .build();
                let lines = wireframe(&geometry);

                let group = scene.add(Node::group().named("cube"));
                scene.add_child(
                    group,
                    Node::mesh(geometry, PhongMaterial::new(Color::from_hex(0x515151)))
                        .named("fill"),
                )?;
                scene.add_child(
                    group,
                    Node::line_segments(lines, LineBasicMaterial::new(Color::from_hex(0xffff00)))
                        .named("edges"),
                )?;
                Ok(group)
            }
        }
    }

    /// Apply the time-dependent part of a frame step to the tracked node.
    pub fn update(&self, scene: &mut Scene, tracked: NodeId, timestamp_ms: f64) {
        match self {
            Variant::RotatingCube => {
                let Some(node) = scene.get_mut(tracked) else {
                    return;
                };
                let angle = (timestamp_ms * MS_TO_SECONDS) as f32;
                node.transform.rotation.x = angle;
                node.transform.rotation.y = angle;
            }
            Variant::WireframeCube => {}
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
                format!("unknown variant '{s}', expected one of: {}", names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewloop_scene::NodeKind;

    #[test]
    fn parse_and_display() {
        for v in Variant::ALL {
            assert_eq!(v.to_string().parse::<Variant>(), Ok(v));
        }
        assert!("spinning".parse::<Variant>().is_err());
    }

    #[test]
    fn rotating_cube_is_single_mesh() {
        let mut scene = Scene::new();
        let cube = Variant::RotatingCube.build_model(&mut scene).unwrap();
        assert_eq!(scene.node_count(), 1);
        assert!(matches!(scene.get(cube).unwrap().kind, NodeKind::Mesh { .. }));
    }

    #[test]
    fn wireframe_cube_groups_fill_and_edges() {
        let mut scene = Scene::new();
        let group = Variant::WireframeCube.build_model(&mut scene).unwrap();
        let node = scene.get(group).unwrap();
        assert!(matches!(node.kind, NodeKind::Group));
        assert_eq!(node.children().len(), 2);

        let kinds: Vec<&str> = node
            .children()
            .iter()
            .map(|id| scene.get(*id).unwrap().kind.label())
            .collect();
        assert_eq!(kinds, vec!["mesh", "lines"]);
    }

    #[test]
    fn rotation_is_elapsed_seconds() {
        let mut scene = Scene::new();
        let cube = Variant::RotatingCube.build_model(&mut scene).unwrap();

        for t in [0.0, 16.7, 1000.0, 12_345.6] {
            Variant::RotatingCube.update(&mut scene, cube, t);
            let r = scene.get(cube).unwrap().transform.rotation;
            let expected = (t * 0.001) as f32;
            assert_eq!(r.x, expected);
            assert_eq!(r.y, expected);
            assert_eq!(r.z, 0.0);
        }
    }

    #[test]
    fn wireframe_update_is_noop() {
        let mut scene = Scene::new();
        let group = Variant::WireframeCube.build_model(&mut scene).unwrap();
        let before = scene.clone();
        Variant::WireframeCube.update(&mut scene, group, 5_000.0);
        assert_eq!(scene, before);
    }

    #[test]
    fn only_wireframe_orbits() {
        assert!(!Variant::RotatingCube.uses_orbit_controls());
        assert!(Variant::WireframeCube.uses_orbit_controls());
    }
}
