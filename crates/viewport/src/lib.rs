//! Viewport Loop Controller: keeps the render output sized to its container and
//! continuously advances the visible animation.
//!
//! # Invariants
//! - After any applied resize, camera aspect equals width / height and the
//!   projection is recomputed before the next frame renders.
//! - Construction resizes exactly once, then schedules exactly one frame.
//! - Each frame step renders, updates, and re-arms itself, unless cancelled.
//! - Zero-area containers never reach the camera.

pub mod cancel;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod variant;

pub use cancel::CancelToken;
pub use config::{CameraConfig, LightConfig, ViewerConfig, WindowConfig};
pub use controller::{
    Container, FrameOutcome, FrameScheduler, ResizeOutcome, ViewportController,
};
pub use driver::{
    FixedStepClock, FrameClock, HeadlessContainer, LoopSummary, ManualScheduler, RealtimeClock,
    StopReason, run_frames,
};
pub use error::{ConfigError, ViewportError};
pub use variant::Variant;

pub fn crate_info() -> &'static str {
    "viewloop-viewport v0.1.0"
}
