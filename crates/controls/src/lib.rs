//! Camera controls: host pointer events mapped onto an orbiting camera.
//!
//! # Invariants
//! - Controls only move the camera; they never touch the scene.
//! - After any control update the camera looks at the orbit target.

pub mod orbit;
pub mod pointer;

pub use orbit::{OrbitControls, OrbitSettings};
pub use pointer::{PointerButton, PointerInput};
