use std::path::PathBuf;
use viewloop_common::DegenerateViewport;
use viewloop_scene::SceneError;

/// Errors that stop a viewport controller from starting.
#[derive(Debug, thiserror::Error)]
pub enum ViewportError {
    #[error("container has zero area: {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("invalid camera configuration: {0}")]
    InvalidCamera(String),
    #[error("scene construction failed: {0}")]
    Scene(#[from] SceneError),
    #[error("frame step must be finite and non-negative, got {0} ms")]
    InvalidFrameStep(f64),
}

impl From<DegenerateViewport> for ViewportError {
    fn from(e: DegenerateViewport) -> Self {
        ViewportError::ZeroDimension {
            width: e.width,
            height: e.height,
        }
    }
}

/// Errors from loading a viewer configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ViewportError),
}
