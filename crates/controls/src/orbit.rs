use crate::pointer::{PointerButton, PointerInput};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use viewloop_render::PerspectiveCamera;

/// Keeps the polar angle away from the poles so `look_at` stays well defined.
const POLAR_EPSILON: f32 = 1e-4;

/// Tuning for [`OrbitControls`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    /// Radians of rotation per pixel of drag.
    pub rotate_speed: f32,
    /// Fraction of the orbit radius moved per pixel of drag.
    pub pan_speed: f32,
    /// Per-notch zoom factor; the radius shrinks by this ratio per wheel step.
    pub zoom_step: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            pan_speed: 0.002,
            zoom_step: 0.95,
            min_distance: 0.5,
            max_distance: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Idle,
    Rotate,
    Pan,
}

/// Mouse-driven camera orbiting around a target point.
///
/// Primary drag rotates, secondary or middle drag pans, the wheel zooms. The
/// camera always ends up looking at `target`.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub settings: OrbitSettings,
    drag: Drag,
    cursor: Option<(f64, f64)>,
}

impl OrbitControls {
    /// Attach to a camera, orbiting whatever it currently looks at.
    pub fn new(camera: &PerspectiveCamera, settings: OrbitSettings) -> Self {
        Self {
            target: camera.target,
            settings,
            drag: Drag::Idle,
            cursor: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != Drag::Idle
    }

    /// Feed one pointer event. Returns true if the camera moved.
    pub fn handle(&mut self, input: PointerInput, camera: &mut PerspectiveCamera) -> bool {
        match input {
            PointerInput::Pressed(button) => {
                self.drag = match button {
                    PointerButton::Primary => Drag::Rotate,
                    PointerButton::Secondary | PointerButton::Middle => Drag::Pan,
                };
                false
            }
            PointerInput::Released(_) | PointerInput::Left => {
                self.drag = Drag::Idle;
                false
            }
            PointerInput::Moved { x, y } => {
                let previous = self.cursor.replace((x, y));
                let Some((px, py)) = previous else {
                    return false;
                };
                let (dx, dy) = ((x - px) as f32, (y - py) as f32);
                match self.drag {
                    Drag::Idle => false,
                    Drag::Rotate => {
                        self.rotate(camera, dx, dy);
                        true
                    }
                    Drag::Pan => {
                        self.pan(camera, dx, dy);
                        true
                    }
                }
            }
            PointerInput::Scrolled(delta) => {
                self.zoom(camera, delta);
                true
            }
        }
    }

    /// Orbit around the target. Dragging right swings the camera left.
    pub fn rotate(&self, camera: &mut PerspectiveCamera, dx: f32, dy: f32) {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        azimuth -= dx * self.settings.rotate_speed;
        polar = (polar - dy * self.settings.rotate_speed)
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);

        camera.position = self.target + spherical_to_offset(radius, polar, azimuth);
        camera.look_at(self.target);
    }

    /// Slide camera and target together across the view plane.
    pub fn pan(&mut self, camera: &mut PerspectiveCamera, dx: f32, dy: f32) {
        let offset = camera.position - self.target;
        let forward = (-offset).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);
        let scale = offset.length() * self.settings.pan_speed;

        let shift = (-right * dx + up * dy) * scale;
        self.target += shift;
        camera.position += shift;
        camera.look_at(self.target);
    }

    /// Move toward (positive delta) or away from the target.
    pub fn zoom(&self, camera: &mut PerspectiveCamera, delta: f32) {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let scaled = (radius * self.settings.zoom_step.powf(delta))
            .clamp(self.settings.min_distance, self.settings.max_distance);
        camera.position = self.target + offset * (scaled / radius);
        camera.look_at(self.target);
        tracing::trace!(radius = scaled, "orbit zoom");
    }
}

fn spherical_to_offset(radius: f32, polar: f32, azimuth: f32) -> Vec3 {
    Vec3::new(
        radius * polar.sin() * azimuth.sin(),
        radius * polar.cos(),
        radius * polar.sin() * azimuth.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut cam = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        cam.position = Vec3::new(0.0, 0.0, 2.0);
        cam
    }

    fn drag(controls: &mut OrbitControls, cam: &mut PerspectiveCamera, button: PointerButton) {
        controls.handle(PointerInput::Moved { x: 100.0, y: 100.0 }, cam);
        controls.handle(PointerInput::Pressed(button), cam);
        controls.handle(PointerInput::Moved { x: 150.0, y: 120.0 }, cam);
        controls.handle(PointerInput::Released(button), cam);
    }

    #[test]
    fn rotate_keeps_distance_and_target() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, OrbitSettings::default());
        drag(&mut controls, &mut cam, PointerButton::Primary);

        assert!((cam.position.length() - 2.0).abs() < 1e-5);
        assert_ne!(cam.position, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(cam.target, Vec3::ZERO);
        assert!(!controls.is_dragging());
    }

    #[test]
    fn move_without_button_is_ignored() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, OrbitSettings::default());
        assert!(!controls.handle(PointerInput::Moved { x: 0.0, y: 0.0 }, &mut cam));
        assert!(!controls.handle(PointerInput::Moved { x: 40.0, y: 40.0 }, &mut cam));
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut cam = camera();
        let controls = OrbitControls::new(&cam, OrbitSettings::default());
        controls.rotate(&mut cam, 0.0, 10_000.0);
        assert!(cam.position.y > 1.99);
        assert!(glam::Vec2::new(cam.position.x, cam.position.z).length() > 0.0);
        assert!(cam.position.is_finite());
        assert!(!cam.view_matrix().is_nan());
    }

    #[test]
    fn zoom_clamps_to_limits() {
        let mut cam = camera();
        let controls = OrbitControls::new(&cam, OrbitSettings::default());

        controls.zoom(&mut cam, 1.0);
        assert!(cam.position.z < 2.0);

        controls.zoom(&mut cam, 1_000.0);
        assert!((cam.position.length() - 0.5).abs() < 1e-5);

        controls.zoom(&mut cam, -1_000.0);
        assert!((cam.position.length() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn pan_moves_target_with_camera() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, OrbitSettings::default());
        drag(&mut controls, &mut cam, PointerButton::Secondary);

        let offset = cam.position - controls.target;
        assert!((offset - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
        assert_ne!(controls.target, Vec3::ZERO);
        assert_eq!(cam.target, controls.target);
    }

    #[test]
    fn leaving_element_ends_drag() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, OrbitSettings::default());
        controls.handle(PointerInput::Pressed(PointerButton::Primary), &mut cam);
        assert!(controls.is_dragging());
        controls.handle(PointerInput::Left, &mut cam);
        assert!(!controls.is_dragging());
    }
}
