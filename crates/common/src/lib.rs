//! Shared types: node identifiers, colors, and the viewport rectangle.

mod types;

pub use types::{Color, DegenerateViewport, NodeId, Viewport};

pub fn crate_info() -> &'static str {
    "viewloop-common v0.1.0"
}
