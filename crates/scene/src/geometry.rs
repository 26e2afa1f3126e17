use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Unindexed line list: every consecutive pair of points is one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGeometry {
    pub points: Vec<Vec3>,
}

impl LineGeometry {
    pub fn segment_count(&self) -> usize {
        self.points.len() / 2
    }
}

/// Axis-aligned box centered on the origin, each face split into a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometry {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub depth_segments: u32,
}

impl Default for BoxGeometry {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

impl BoxGeometry {
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth,
            width_segments: 1,
            height_segments: 1,
            depth_segments: 1,
        }
    }

    /// Segment counts below 1 are raised to 1.
    pub fn with_segments(mut self, width: u32, height: u32, depth: u32) -> Self {
        self.width_segments = width.max(1);
        self.height_segments = height.max(1);
        self.depth_segments = depth.max(1);
        self
    }

    /// Tessellate into six face grids with outward normals and CCW winding.
    pub fn build(&self) -> MeshGeometry {
        let mut mesh = MeshGeometry {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
        };
        let (w, h, d) = (self.width, self.height, self.depth);
        let (ws, hs, ds) = (
            self.width_segments.max(1),
            self.height_segments.max(1),
            self.depth_segments.max(1),
        );

        #[rustfmt::skip]
        let faces = [
            // (u, v, w, udir, vdir, plane width, plane height, depth, grid x, grid y)
            (2, 1, 0, -1.0, -1.0, d, h,  w, ds, hs), // +X
            (2, 1, 0,  1.0, -1.0, d, h, -w, ds, hs), // -X
            (0, 2, 1,  1.0,  1.0, w, d,  h, ws, ds), // +Y
            (0, 2, 1,  1.0, -1.0, w, d, -h, ws, ds), // -Y
            (0, 1, 2,  1.0, -1.0, w, h,  d, ws, hs), // +Z
            (0, 1, 2, -1.0, -1.0, w, h, -d, ws, hs), // -Z
        ];
        for (u, v, n, udir, vdir, pw, ph, pd, gx, gy) in faces {
            build_plane(&mut mesh, [u, v, n], udir, vdir, pw, ph, pd, gx, gy);
        }
        mesh
    }
}

#[allow(clippy::too_many_arguments)]
fn build_plane(
    mesh: &mut MeshGeometry,
    axes: [usize; 3],
    udir: f32,
    vdir: f32,
    width: f32,
    height: f32,
    depth: f32,
    grid_x: u32,
    grid_y: u32,
) {
    let [u, v, n] = axes;
    let base = mesh.positions.len() as u32;
    let segment_w = width / grid_x as f32;
    let segment_h = height / grid_y as f32;
    let half_w = width / 2.0;
    let half_h = height / 2.0;
    let half_d = depth / 2.0;

    for iy in 0..=grid_y {
        let y = iy as f32 * segment_h - half_h;
        for ix in 0..=grid_x {
            let x = ix as f32 * segment_w - half_w;
            let mut position = [0.0_f32; 3];
            position[u] = x * udir;
            position[v] = y * vdir;
            position[n] = half_d;
            let mut normal = [0.0_f32; 3];
            normal[n] = if depth > 0.0 { 1.0 } else { -1.0 };
            mesh.positions.push(Vec3::from_array(position));
            mesh.normals.push(Vec3::from_array(normal));
        }
    }

    let row = grid_x + 1;
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = base + ix + row * iy;
            let b = base + ix + row * (iy + 1);
            let c = base + (ix + 1) + row * (iy + 1);
            let d = base + (ix + 1) + row * iy;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
}

/// Quantized position used to merge coincident vertices across faces.
type PointKey = [i64; 3];

fn point_key(p: Vec3) -> PointKey {
    let q = |v: f32| (v as f64 * 1e4).round() as i64;
    [q(p.x), q(p.y), q(p.z)]
}

/// Every distinct triangle edge of `mesh` as a line list.
///
/// Edges are compared by position, so the seams a box shares between faces
/// appear once.
pub fn wireframe(mesh: &MeshGeometry) -> LineGeometry {
    let mut seen: HashSet<(PointKey, PointKey)> = HashSet::new();
    let mut points = Vec::new();

    for tri in mesh.indices.chunks_exact(3) {
        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            let a = mesh.positions[tri[i] as usize];
            let b = mesh.positions[tri[j] as usize];
            let (ka, kb) = (point_key(a), point_key(b));
            let key = if ka <= kb { (ka, kb) } else { (kb, ka) };
            if seen.insert(key) {
                points.push(a);
                points.push(b);
            }
        }
    }

    LineGeometry { points }
}
