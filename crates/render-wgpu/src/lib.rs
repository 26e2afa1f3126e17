//! wgpu render backend for viewloop scenes.
//!
//! Draws Phong-lit meshes and unlit line segments into a window surface, with
//! optional 4x MSAA.
//!
//! # Invariants
//! - Renderer never mutates the scene.
//! - Surface size follows the logical size times the pixel ratio.

mod gpu;
mod shaders;
mod surface;

pub use gpu::ScenePipelines;
pub use surface::{GpuError, SurfaceOptions, SurfaceRenderer};
