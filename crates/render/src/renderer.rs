use crate::camera::PerspectiveCamera;
use viewloop_scene::{NodeKind, Scene};

/// Render surface interface. The viewport controller talks to every backend
/// through this trait.
///
/// `set_size` takes logical pixels; the drawing buffer is that size scaled by
/// the pixel ratio and floored to whole pixels.
pub trait Renderer {
    fn set_pixel_ratio(&mut self, ratio: f64);

    fn pixel_ratio(&self) -> f64;

    /// Resize the output to `width` x `height` logical pixels.
    fn set_size(&mut self, width: u32, height: u32);

    /// Current logical size.
    fn size(&self) -> (u32, u32);

    /// Physical size of the drawing buffer.
    fn drawing_buffer_size(&self) -> (u32, u32) {
        let (w, h) = self.size();
        let ratio = self.pixel_ratio();
        (
            (w as f64 * ratio).floor() as u32,
            (h as f64 * ratio).floor() as u32,
        )
    }

    /// Draw the scene from the camera's point of view.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera);
}

/// A call made on a [`DebugTextRenderer`], kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    SetPixelRatio(f64),
    SetSize(u32, u32),
    Render,
}

/// Text renderer for headless runs and tests.
///
/// Each frame produces a human-readable dump of the camera and every node's
/// world-space position and rotation.
#[derive(Debug)]
pub struct DebugTextRenderer {
    width: u32,
    height: u32,
    pixel_ratio: f64,
    frames: u64,
    last_output: String,
    calls: Vec<RenderCall>,
}

impl Default for DebugTextRenderer {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            pixel_ratio: 1.0,
            frames: 0,
            last_output: String::new(),
            calls: Vec::new(),
        }
    }
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn last_output(&self) -> &str {
        &self.last_output
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn resize_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::SetSize(..)))
            .count()
    }
}

impl Renderer for DebugTextRenderer {
    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
        self.calls.push(RenderCall::SetPixelRatio(ratio));
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.calls.push(RenderCall::SetSize(width, height));
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        let (buffer_w, buffer_h) = self.drawing_buffer_size();
        let mut out = String::new();
        out.push_str(&format!(
            "=== Frame {} ({}x{}, buffer {}x{}) ===\n",
            self.frames, self.width, self.height, buffer_w, buffer_h
        ));
        out.push_str(&format!(
            "Camera: pos=({:.2}, {:.2}, {:.2}) fov={:.0} aspect={:.4} near={} far={}\n",
            camera.position.x,
            camera.position.y,
            camera.position.z,
            camera.fov_degrees,
            camera.aspect,
            camera.near,
            camera.far
        ));
        out.push_str(&format!("Nodes: {}\n", scene.node_count()));

        scene.visit(|id, node, world| {
            let p = world.transform_point3(glam::Vec3::ZERO);
            let r = node.transform.rotation;
            let detail = match &node.kind {
                NodeKind::Mesh { geometry, material } => format!(
                    " tris={} color=#{:06x}",
                    geometry.triangle_count(),
                    material.color.to_hex()
                ),
                NodeKind::LineSegments { geometry, material } => format!(
                    " segments={} color=#{:06x}",
                    geometry.segment_count(),
                    material.color.to_hex()
                ),
                NodeKind::DirectionalLight(light) => format!(
                    " color=#{:06x} intensity={}",
                    light.color.to_hex(),
                    light.intensity
                ),
                NodeKind::Group => format!(" children={}", node.children().len()),
            };
            out.push_str(&format!(
                "  [{}] {} pos=({:.2}, {:.2}, {:.2}) rot=({:.3}, {:.3}, {:.3}){}\n",
                id.short(),
                node.kind.label(),
                p.x,
                p.y,
                p.z,
                r.x,
                r.y,
                r.z,
                detail
            ));
        });

        tracing::trace!(frame = self.frames, bytes = out.len(), "debug frame rendered");
        self.last_output = out;
        self.frames += 1;
        self.calls.push(RenderCall::Render);
    }
}
