use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use viewloop_controls::{PointerButton, PointerInput};
use viewloop_render_wgpu::{SurfaceOptions, SurfaceRenderer};
use viewloop_viewport::{
    Container, FrameOutcome, FrameScheduler, Variant, ViewerConfig, ViewportController,
};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Pixels of trackpad scroll treated as one wheel notch.
const PIXELS_PER_SCROLL_LINE: f64 = 50.0;

#[derive(Parser)]
#[command(name = "viewloop-desktop", about = "Viewloop desktop viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Sketch to show: rotating-cube or wireframe-cube
    #[arg(long)]
    variant: Option<Variant>,

    /// JSON viewer config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial window width in logical pixels
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height in logical pixels
    #[arg(long)]
    height: Option<u32>,

    /// Disable multisample antialiasing
    #[arg(long)]
    no_antialias: bool,
}

impl Cli {
    fn viewer_config(&self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ViewerConfig::default(),
        };
        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.no_antialias {
            config.antialias = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// The window's client area as the viewport container.
struct WindowContainer {
    window: Arc<Window>,
}

impl Container for WindowContainer {
    fn client_size(&self) -> (u32, u32) {
        let logical: LogicalSize<u32> = self
            .window
            .inner_size()
            .to_logical(self.window.scale_factor());
        (logical.width, logical.height)
    }

    fn pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }
}

/// Frame requests map onto winit redraw requests.
struct WindowScheduler {
    window: Arc<Window>,
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) {
        self.window.request_redraw();
    }
}

type DesktopController = ViewportController<WindowContainer, SurfaceRenderer, WindowScheduler>;

struct ViewerApp {
    config: ViewerConfig,
    controller: Option<DesktopController>,
    started: Instant,
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            controller: None,
            started: Instant::now(),
            error: None,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<DesktopController> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let physical = window.inner_size();
        let renderer = SurfaceRenderer::new(
            window.clone(),
            SurfaceOptions {
                antialias: self.config.antialias,
                width: physical.width,
                height: physical.height,
            },
        )
        .context("initialize GPU surface")?;

        let controller = ViewportController::new(
            WindowContainer {
                window: window.clone(),
            },
            renderer,
            WindowScheduler { window },
            &self.config,
        )?;
        Ok(controller)
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(controller) = &self.controller {
            controller.cancel();
            tracing::info!(frames = controller.frames_rendered(), "viewer closing");
        }
        event_loop.exit();
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_SCROLL_LINE) as f32,
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.controller.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(controller) => {
                self.controller = Some(controller);
                self.started = Instant::now();
            }
            Err(e) => {
                tracing::error!("failed to start viewer: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(
            event,
            WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    event: KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                    ..
                }
        ) {
            self.shutdown(event_loop);
            return;
        }

        let Some(controller) = &mut self.controller else {
            return;
        };

        match event {
            WindowEvent::Resized(physical) => {
                controller
                    .renderer_mut()
                    .set_window_size(physical.width, physical.height);
                controller.resize();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                controller.set_pixel_ratio(scale_factor);
            }
            WindowEvent::CursorMoved { position, .. } => {
                controller.handle_pointer(PointerInput::Moved {
                    x: position.x,
                    y: position.y,
                });
            }
            WindowEvent::CursorLeft { .. } => {
                controller.handle_pointer(PointerInput::Left);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = pointer_button(button) {
                    let input = match state {
                        ElementState::Pressed => PointerInput::Pressed(button),
                        ElementState::Released => PointerInput::Released(button),
                    };
                    controller.handle_pointer(input);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                controller.handle_pointer(PointerInput::Scrolled(scroll_lines(delta)));
            }
            WindowEvent::RedrawRequested => {
                let timestamp_ms = self.started.elapsed().as_secs_f64() * 1000.0;
                if controller.frame(timestamp_ms) == FrameOutcome::Cancelled {
                    event_loop.exit();
                }
                if let Some(e) = controller.renderer_mut().take_failure() {
                    tracing::error!("rendering stopped: {e}");
                    controller.cancel();
                    self.error = Some(e.into());
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = cli.viewer_config()?;
    tracing::info!(variant = %config.variant, "viewloop-desktop starting");

    let event_loop = EventLoop::new()?;
    // Frames are driven by the controller's own redraw requests.
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = ViewerApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
