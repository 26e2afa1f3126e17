use glam::{Mat4, Vec3};

/// Perspective camera looking from `position` toward `target`.
///
/// `aspect` can be assigned directly; the cached projection only changes when
/// [`PerspectiveCamera::update_projection_matrix`] runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_degrees,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recompute the cached projection from fov, aspect and clip planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// True when the cached projection no longer matches the current parameters.
    pub fn projection_is_stale(&self) -> bool {
        let fresh =
            Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far);
        fresh != self.projection
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_camera_has_fresh_projection() {
        let cam = PerspectiveCamera::new(75.0, 800.0 / 600.0, 0.1, 100.0);
        assert!(!cam.projection_is_stale());
        assert_eq!(
            cam.projection_matrix(),
            Mat4::perspective_rh(75.0_f32.to_radians(), 800.0 / 600.0, 0.1, 100.0)
        );
    }

    #[test]
    fn aspect_change_needs_update() {
        let mut cam = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        cam.aspect = 2.0;
        assert!(cam.projection_is_stale());
        cam.update_projection_matrix();
        assert!(!cam.projection_is_stale());
    }

    #[test]
    fn view_projection_is_finite() {
        let mut cam = PerspectiveCamera::new(75.0, 1.5, 0.1, 100.0);
        cam.position = Vec3::new(0.0, 0.0, 2.0);
        let vp = cam.view_projection();
        assert!(vp.is_finite());
        // The origin sits in front of a camera at z=2 looking down -Z.
        let clip = vp.project_point3(Vec3::ZERO);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }
}
