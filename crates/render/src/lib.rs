//! Rendering interface: perspective camera and the backend-agnostic renderer trait.
//!
//! # Invariants
//! - Renderers never mutate the scene.
//! - A camera's projection is only recomputed on request.
//!
//! Ships a debug text renderer for headless runs; the wgpu backend lives in
//! `viewloop-render-wgpu` and implements the same trait.

mod camera;
mod renderer;

pub use camera::PerspectiveCamera;
pub use renderer::{DebugTextRenderer, RenderCall, Renderer};

pub fn crate_info() -> &'static str {
    "viewloop-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
