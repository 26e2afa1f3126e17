use crate::gpu::{DEPTH_FORMAT, ScenePipelines};
use viewloop_render::{PerspectiveCamera, Renderer};
use viewloop_scene::Scene;

/// Errors from GPU initialization and presentation. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("GPU ran out of memory acquiring a frame")]
    OutOfMemory,
}

/// Surface creation options.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceOptions {
    /// Use 4x MSAA when the adapter supports it for the surface format.
    pub antialias: bool,
    /// Window client area in physical pixels.
    pub width: u32,
    pub height: u32,
}

const MSAA_SAMPLES: u32 = 4;

/// wgpu renderer drawing into a window surface.
///
/// Owns the device, queue and surface configuration. Sizes given to
/// [`Renderer::set_size`] are logical. The surface itself always matches the
/// window's physical size as reported through [`SurfaceRenderer::set_window_size`],
/// since `logical * pixel_ratio` can miss it by a pixel at fractional ratios.
pub struct SurfaceRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipelines: ScenePipelines,
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    sample_count: u32,
    logical_size: (u32, u32),
    window_size: (u32, u32),
    pixel_ratio: f64,
    max_dimension: u32,
    failure: Option<GpuError>,
}

impl SurfaceRenderer {
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        options: SurfaceOptions,
    ) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(target)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("viewloop_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let max_dimension = device.limits().max_texture_dimension_2d;
        let (width, height) = surface_extent(
            (options.width, options.height),
            1.0,
            (options.width, options.height),
            max_dimension,
        );
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let msaa_supported = adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(MSAA_SAMPLES);
        let sample_count = if options.antialias && msaa_supported {
            MSAA_SAMPLES
        } else {
            1
        };

        let pipelines = ScenePipelines::new(&device, surface_format, sample_count);
        let (depth_view, msaa_view) =
            create_targets(&device, &config, sample_count);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            format = ?surface_format,
            sample_count,
            "GPU initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipelines,
            depth_view,
            msaa_view,
            sample_count,
            // Logical size is unknown until the first `set_size`.
            logical_size: (0, 0),
            window_size: (options.width, options.height),
            pixel_ratio: 1.0,
            max_dimension,
            failure: None,
        })
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Record the window's physical client size and fit the surface to it.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
        self.reconfigure();
    }

    /// A fatal error hit while rendering, if any. Rendering stops once set.
    pub fn take_failure(&mut self) -> Option<GpuError> {
        self.failure.take()
    }

    /// Reconfigure the surface if its extent changed.
    fn reconfigure(&mut self) {
        let (width, height) = surface_extent(
            self.logical_size,
            self.pixel_ratio,
            self.window_size,
            self.max_dimension,
        );
        if (width, height) == (self.config.width, self.config.height) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        let (depth_view, msaa_view) = create_targets(&self.device, &self.config, self.sample_count);
        self.depth_view = depth_view;
        self.msaa_view = msaa_view;
        tracing::debug!(
            width = self.config.width,
            height = self.config.height,
            "surface reconfigured"
        );
    }
}

impl Renderer for SurfaceRenderer {
    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
        self.reconfigure();
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.logical_size = (width, height);
        self.reconfigure();
    }

    fn size(&self) -> (u32, u32) {
        self.logical_size
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        if self.failure.is_some() {
            return;
        }
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(e) => {
                match surface_action(&e) {
                    SurfaceAction::Reconfigure => {
                        tracing::warn!("surface {e}, reconfiguring");
                        self.surface.configure(&self.device, &self.config);
                    }
                    SurfaceAction::SkipFrame => tracing::warn!("surface {e}, skipping frame"),
                    SurfaceAction::Fatal => {
                        tracing::error!("surface error: {e}");
                        self.failure = Some(GpuError::OutOfMemory);
                    }
                }
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (target, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(&view)),
            None => (&view, None),
        };
        self.pipelines.draw(
            &self.device,
            &self.queue,
            target,
            resolve_target,
            &self.depth_view,
            scene,
            camera,
        );

        output.present();
    }
}

/// What to do when the surface cannot hand out a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceAction {
    Reconfigure,
    SkipFrame,
    Fatal,
}

fn surface_action(error: &wgpu::SurfaceError) -> SurfaceAction {
    match error {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceAction::Reconfigure,
        wgpu::SurfaceError::OutOfMemory => SurfaceAction::Fatal,
        _ => SurfaceAction::SkipFrame,
    }
}

/// Surface extent in physical pixels. The window's physical size wins when
/// known; otherwise the floored `logical * ratio`. Never zero, never above
/// the device's texture limit.
fn surface_extent(
    logical: (u32, u32),
    ratio: f64,
    window: (u32, u32),
    max_dimension: u32,
) -> (u32, u32) {
    let (width, height) = if window.0 > 0 && window.1 > 0 {
        window
    } else {
        (
            (logical.0 as f64 * ratio).floor() as u32,
            (logical.1 as f64 * ratio).floor() as u32,
        )
    };
    (
        width.clamp(1, max_dimension),
        height.clamp(1, max_dimension),
    )
}

fn create_targets(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> (wgpu::TextureView, Option<wgpu::TextureView>) {
    let size = wgpu::Extent3d {
        width: config.width.max(1),
        height: config.height.max(1),
        depth_or_array_layers: 1,
    };

    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size,
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let msaa = (sample_count > 1).then(|| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("msaa_texture"),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: config.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&Default::default())
    });

    (depth.create_view(&Default::default()), msaa)
}
