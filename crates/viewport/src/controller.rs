use crate::cancel::CancelToken;
use crate::config::{LightConfig, ViewerConfig};
use crate::error::ViewportError;
use crate::variant::Variant;
use glam::Vec3;
use viewloop_common::{NodeId, Viewport};
use viewloop_controls::{OrbitControls, PointerInput};
use viewloop_render::{PerspectiveCamera, Renderer};
use viewloop_scene::{DirectionalLight, Node, Scene};

/// The element the viewport lives in: reports its current layout size.
pub trait Container {
    /// Current size in logical pixels. Either side may be zero, e.g. while a
    /// window is minimized.
    fn client_size(&self) -> (u32, u32);

    /// Physical pixels per logical pixel.
    fn pixel_ratio(&self) -> f64 {
        1.0
    }
}

/// Host primitive that runs the frame step once, on the next frame.
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Result of [`ViewportController::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Camera and surface now match this viewport.
    Applied(Viewport),
    /// The container size matches what was last applied.
    Unchanged,
    /// The container has zero area; the last valid size stays in effect.
    Deferred { width: u32, height: u32 },
}

/// Result of [`ViewportController::frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Rendered, updated and re-armed.
    Rendered,
    /// The loop was cancelled; nothing rendered and nothing scheduled.
    Cancelled,
}

/// Owns the render surface, camera and scene, keeps them sized to the
/// container, and drives the per-frame render/update cycle.
///
/// The host routes its resize notifications to [`ViewportController::resize`]
/// and its frame callbacks to [`ViewportController::frame`]. Every frame step
/// re-arms itself through the scheduler until the cancel token fires.
pub struct ViewportController<C, R, S> {
    container: C,
    renderer: R,
    scheduler: S,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: Option<OrbitControls>,
    variant: Variant,
    tracked: NodeId,
    applied: Option<Viewport>,
    cancel: CancelToken,
    frames: u64,
}

impl<C, R, S> ViewportController<C, R, S>
where
    C: Container,
    R: Renderer,
    S: FrameScheduler,
{
    /// Build the viewer and schedule its first frame.
    ///
    /// Order: size the surface, create the camera from the container's
    /// aspect, populate the scene, resize once, schedule the first frame.
    /// Zero-area containers and invalid camera settings fail here, before
    /// anything is scheduled.
    pub fn new(
        container: C,
        mut renderer: R,
        scheduler: S,
        config: &ViewerConfig,
    ) -> Result<Self, ViewportError> {
        config.validate()?;
        let (width, height) = container.client_size();
        let viewport = Viewport::new(width, height)?;

        renderer.set_pixel_ratio(container.pixel_ratio());

        let mut camera = PerspectiveCamera::new(
            config.camera.fov_degrees,
            viewport.aspect(),
            config.camera.near,
            config.camera.far,
        );
        camera.position = config.camera.position;
        camera.look_at(Vec3::ZERO);

        let mut scene = Scene::new();
        scene.background = config.background;
        setup_light(&mut scene, &config.light);
        let tracked = config.variant.build_model(&mut scene)?;

        let controls = config
            .variant
            .uses_orbit_controls()
            .then(|| OrbitControls::new(&camera, config.orbit));

        let mut controller = Self {
            container,
            renderer,
            scheduler,
            scene,
            camera,
            controls,
            variant: config.variant,
            tracked,
            applied: None,
            cancel: CancelToken::new(),
            frames: 0,
        };

        controller.resize();
        controller.scheduler.request_frame();

        tracing::info!(
            variant = %controller.variant,
            width,
            height,
            nodes = controller.scene.node_count(),
            "viewport controller started"
        );
        Ok(controller)
    }

    /// Match camera aspect and surface size to the container.
    ///
    /// Idempotent: an unchanged container size is a no-op. A zero-area
    /// container is deferred so the camera never sees a NaN or infinite
    /// aspect.
    pub fn resize(&mut self) -> ResizeOutcome {
        let (width, height) = self.container.client_size();
        let Ok(viewport) = Viewport::new(width, height) else {
            tracing::debug!(width, height, "deferring resize of zero-area container");
            return ResizeOutcome::Deferred { width, height };
        };
        if self.applied == Some(viewport) {
            return ResizeOutcome::Unchanged;
        }

        self.camera.aspect = viewport.aspect();
        self.camera.update_projection_matrix();
        self.renderer.set_size(width, height);
        self.applied = Some(viewport);

        tracing::debug!(width, height, aspect = self.camera.aspect, "viewport resized");
        ResizeOutcome::Applied(viewport)
    }

    /// Apply a new device pixel ratio and resize the surface for it.
    pub fn set_pixel_ratio(&mut self, ratio: f64) -> ResizeOutcome {
        self.renderer.set_pixel_ratio(ratio);
        // The logical size may be unchanged, but the drawing buffer is not.
        self.applied = None;
        self.resize()
    }

    /// One frame step: render, apply the variant's time-dependent update,
    /// then schedule the next frame.
    ///
    /// `timestamp_ms` is milliseconds since the loop began and must not
    /// decrease between calls.
    pub fn frame(&mut self, timestamp_ms: f64) -> FrameOutcome {
        if self.cancel.is_cancelled() {
            tracing::debug!(frames = self.frames, "frame loop cancelled");
            return FrameOutcome::Cancelled;
        }

        self.renderer.render(&self.scene, &self.camera);
        self.variant
            .update(&mut self.scene, self.tracked, timestamp_ms);
        self.frames += 1;
        tracing::trace!(frame = self.frames, timestamp_ms, "frame step");

        self.scheduler.request_frame();
        FrameOutcome::Rendered
    }

    /// Forward pointer input to the orbit controls, if this variant has them.
    /// Returns true if the camera moved.
    pub fn handle_pointer(&mut self, input: PointerInput) -> bool {
        match &mut self.controls {
            Some(controls) => controls.handle(input, &mut self.camera),
            None => false,
        }
    }

    /// Stop the loop: subsequent frame steps render and schedule nothing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// The viewport last applied by a resize.
    pub fn viewport(&self) -> Option<Viewport> {
        self.applied
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn tracked_node(&self) -> NodeId {
        self.tracked
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

fn setup_light(scene: &mut Scene, light: &LightConfig) {
    scene.add(
        Node::directional_light(DirectionalLight::new(light.color, light.intensity))
            .named("sun")
            .with_position(light.position),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{HeadlessContainer, ManualScheduler};
    use std::cell::RefCell;
    use std::rc::Rc;
    use viewloop_controls::PointerButton;
    use viewloop_render::{DebugTextRenderer, RenderCall};
    use viewloop_scene::NodeKind;

    type Headless = ViewportController<HeadlessContainer, DebugTextRenderer, ManualScheduler>;

    fn start(variant: Variant, width: u32, height: u32) -> Headless {
        ViewportController::new(
            HeadlessContainer::new(width, height),
            DebugTextRenderer::new(),
            ManualScheduler::new(),
            &ViewerConfig::for_variant(variant),
        )
        .unwrap()
    }

    /// Shared log so renderer and scheduler calls can be ordered against each other.
    #[derive(Clone, Default)]
    struct Log(Rc<RefCell<Vec<&'static str>>>);

    impl Log {
        fn push(&self, entry: &'static str) {
            self.0.borrow_mut().push(entry);
        }

        fn entries(&self) -> Vec<&'static str> {
            self.0.borrow().clone()
        }
    }

    struct LoggingRenderer {
        log: Log,
        size: (u32, u32),
    }

    impl Renderer for LoggingRenderer {
        fn set_pixel_ratio(&mut self, _ratio: f64) {
            self.log.push("pixel_ratio");
        }

        fn pixel_ratio(&self) -> f64 {
            1.0
        }

        fn set_size(&mut self, width: u32, height: u32) {
            self.size = (width, height);
            self.log.push("set_size");
        }

        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn render(&mut self, _scene: &Scene, _camera: &PerspectiveCamera) {
            self.log.push("render");
        }
    }

    struct LoggingScheduler(Log);

    impl FrameScheduler for LoggingScheduler {
        fn request_frame(&mut self) {
            self.0.push("request_frame");
        }
    }

    #[test]
    fn construction_resizes_once_then_schedules() {
        for (w, h) in [(800, 600), (1, 1), (1920, 1080)] {
            let log = Log::default();
            let controller = ViewportController::new(
                HeadlessContainer::new(w, h),
                LoggingRenderer {
                    log: log.clone(),
                    size: (0, 0),
                },
                LoggingScheduler(log.clone()),
                &ViewerConfig::default(),
            )
            .unwrap();

            assert_eq!(
                log.entries(),
                vec!["pixel_ratio", "set_size", "request_frame"]
            );
            assert_eq!(controller.renderer().size(), (w, h));
        }
    }

    #[test]
    fn scenario_800x600_then_400x400() {
        let mut controller = start(Variant::RotatingCube, 800, 600);
        assert_eq!(controller.camera().aspect, 800.0 / 600.0);
        assert_eq!(controller.renderer().size(), (800, 600));

        controller.container_mut().set_size(400, 400);
        let outcome = controller.resize();

        assert!(matches!(outcome, ResizeOutcome::Applied(_)));
        assert_eq!(controller.camera().aspect, 1.0);
        assert_eq!(controller.renderer().size(), (400, 400));
        assert!(!controller.camera().projection_is_stale());
    }

    #[test]
    fn aspect_tracks_every_positive_size() {
        let mut controller = start(Variant::RotatingCube, 800, 600);
        for (w, h) in [(1, 1), (3, 7), (1280, 720), (720, 1280), (4096, 17)] {
            controller.container_mut().set_size(w, h);
            controller.resize();
            assert_eq!(controller.camera().aspect, w as f32 / h as f32);
            assert_eq!(controller.renderer().size(), (w, h));
            assert!(!controller.camera().projection_is_stale());
        }
    }

    #[test]
    fn resize_is_idempotent() {
        let mut controller = start(Variant::RotatingCube, 640, 480);
        let aspect = controller.camera().aspect;
        let resizes = controller.renderer().resize_count();

        assert_eq!(controller.resize(), ResizeOutcome::Unchanged);
        assert_eq!(controller.resize(), ResizeOutcome::Unchanged);

        assert_eq!(controller.camera().aspect, aspect);
        assert_eq!(controller.renderer().size(), (640, 480));
        assert_eq!(controller.renderer().resize_count(), resizes);
    }

    #[test]
    fn zero_area_container_fails_construction() {
        for (w, h) in [(0, 600), (800, 0), (0, 0)] {
            let err = ViewportController::new(
                HeadlessContainer::new(w, h),
                DebugTextRenderer::new(),
                ManualScheduler::new(),
                &ViewerConfig::default(),
            )
            .err()
            .unwrap();
            assert!(matches!(err, ViewportError::ZeroDimension { .. }));
        }
    }

    #[test]
    fn invalid_camera_fails_before_scheduling() {
        let mut config = ViewerConfig::default();
        config.camera.far = 0.05;
        let result = ViewportController::new(
            HeadlessContainer::new(800, 600),
            DebugTextRenderer::new(),
            ManualScheduler::new(),
            &config,
        );
        assert!(matches!(result, Err(ViewportError::InvalidCamera(_))));
    }

    #[test]
    fn zero_area_resize_is_deferred() {
        let mut controller = start(Variant::RotatingCube, 800, 600);
        controller.container_mut().set_size(800, 0);

        assert_eq!(
            controller.resize(),
            ResizeOutcome::Deferred {
                width: 800,
                height: 0
            }
        );
        assert_eq!(controller.camera().aspect, 800.0 / 600.0);
        assert_eq!(controller.renderer().size(), (800, 600));

        controller.container_mut().set_size(300, 150);
        controller.resize();
        assert_eq!(controller.camera().aspect, 2.0);
    }

    #[test]
    fn frame_renders_then_rotates_then_rearms() {
        let mut controller = start(Variant::RotatingCube, 800, 600);
        assert!(controller.scheduler_mut().take_request());

        assert_eq!(controller.frame(1500.0), FrameOutcome::Rendered);

        assert_eq!(controller.renderer().frames_rendered(), 1);
        // Rendered before the update, so the dump shows the old rotation.
        assert!(controller.renderer().last_output().contains("rot=(0.000, 0.000, 0.000)"));
        let cube = controller.scene().get(controller.tracked_node()).unwrap();
        assert_eq!(cube.transform.rotation.x, 1.5);
        assert_eq!(cube.transform.rotation.y, 1.5);
        assert_eq!(controller.scheduler().pending(), 1);

        controller.frame(3000.0);
        assert!(controller.renderer().last_output().contains("rot=(1.500, 1.500, 0.000)"));
    }

    #[test]
    fn wireframe_scene_is_static_across_frames() {
        let mut controller = start(Variant::WireframeCube, 800, 600);
        let before = controller.scene().clone();
        for i in 0..50 {
            controller.frame(i as f64 * 16.7);
        }
        assert_eq!(controller.scene(), &before);
        assert_eq!(controller.frames_rendered(), 50);
    }

    #[test]
    fn cancelled_frame_does_nothing() {
        let mut controller = start(Variant::RotatingCube, 800, 600);
        controller.scheduler_mut().take_request();
        controller.cancel();

        assert_eq!(controller.frame(16.0), FrameOutcome::Cancelled);
        assert_eq!(controller.renderer().frames_rendered(), 0);
        assert_eq!(controller.scheduler().pending(), 0);
        assert!(!controller.is_running());
    }

    #[test]
    fn cancel_token_from_outside_stops_loop() {
        let mut controller = start(Variant::RotatingCube, 800, 600);
        let token = controller.cancel_token();
        controller.frame(0.0);
        token.cancel();
        assert_eq!(controller.frame(16.0), FrameOutcome::Cancelled);
        assert_eq!(controller.frames_rendered(), 1);
    }

    #[test]
    fn scene_has_light_and_model() {
        let controller = start(Variant::RotatingCube, 800, 600);
        let lights = controller.scene().directional_lights();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].1, Vec3::new(-1.0, 2.0, 4.0));
        let cube = controller.scene().get(controller.tracked_node()).unwrap();
        assert!(matches!(cube.kind, NodeKind::Mesh { .. }));
        assert_eq!(controller.camera().position, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn pointer_input_only_moves_orbitable_camera() {
        let mut rotating = start(Variant::RotatingCube, 800, 600);
        assert!(rotating.controls().is_none());
        rotating.handle_pointer(PointerInput::Moved { x: 0.0, y: 0.0 });
        rotating.handle_pointer(PointerInput::Pressed(PointerButton::Primary));
        assert!(!rotating.handle_pointer(PointerInput::Moved { x: 30.0, y: 0.0 }));
        assert_eq!(rotating.camera().position, Vec3::new(0.0, 0.0, 2.0));

        let mut wire = start(Variant::WireframeCube, 800, 600);
        let before = wire.scene().clone();
        wire.handle_pointer(PointerInput::Moved { x: 0.0, y: 0.0 });
        wire.handle_pointer(PointerInput::Pressed(PointerButton::Primary));
        assert!(wire.handle_pointer(PointerInput::Moved { x: 30.0, y: 0.0 }));
        assert_ne!(wire.camera().position, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(wire.scene(), &before);
    }

    #[test]
    fn pixel_ratio_change_forces_resize() {
        let mut controller = start(Variant::RotatingCube, 400, 300);
        let outcome = controller.set_pixel_ratio(2.0);
        assert!(matches!(outcome, ResizeOutcome::Applied(_)));
        assert_eq!(controller.renderer().drawing_buffer_size(), (800, 600));
        assert_eq!(
            controller.renderer().calls().last(),
            Some(&RenderCall::SetSize(400, 300))
        );
    }

    #[test]
    fn fractional_pixel_ratio_matches_physical_window() {
        let mut controller = ViewportController::new(
            HeadlessContainer::new(667, 500).with_pixel_ratio(1.5),
            DebugTextRenderer::new(),
            ManualScheduler::new(),
            &ViewerConfig::default(),
        )
        .unwrap();
        assert_eq!(controller.renderer().drawing_buffer_size(), (1000, 750));

        controller.frame(0.0);
        assert!(
            controller
                .renderer()
                .last_output()
                .contains("(667x500, buffer 1000x750)")
        );
    }
}
