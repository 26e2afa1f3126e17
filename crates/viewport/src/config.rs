//! Viewer configuration.
//!
//! Every field has a default matching the study sketches, so an empty JSON
//! object is a complete config. Hosts layer CLI flags on top.

use crate::error::{ConfigError, ViewportError};
use crate::variant::Variant;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use viewloop_common::Color;
use viewloop_controls::OrbitSettings;

/// Perspective camera parameters fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(0.0, 0.0, 2.0),
        }
    }
}

impl CameraConfig {
    // Negated comparisons so NaN fails every check.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn validate(&self) -> Result<(), ViewportError> {
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ViewportError::InvalidCamera(format!(
                "fov must be in (0, 180) degrees, got {}",
                self.fov_degrees
            )));
        }
        if !(self.near > 0.0) {
            return Err(ViewportError::InvalidCamera(format!(
                "near plane must be positive, got {}",
                self.near
            )));
        }
        if !(self.far > self.near) {
            return Err(ViewportError::InvalidCamera(format!(
                "far plane ({}) must lie beyond near plane ({})",
                self.far, self.near
            )));
        }
        if !self.position.is_finite() {
            return Err(ViewportError::InvalidCamera(
                "camera position must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// The single directional light both sketches use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0xffffff),
            intensity: 1.0,
            position: Vec3::new(-1.0, 2.0, 4.0),
        }
    }
}

/// Initial window for desktop hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    /// Overrides the variant's title.
    pub title: Option<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub variant: Variant,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub background: Color,
    /// Request multisampled output where the backend supports it.
    pub antialias: bool,
    pub window: WindowConfig,
    pub orbit: OrbitSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            background: Color::BLACK,
            antialias: true,
            window: WindowConfig::default(),
            orbit: OrbitSettings::default(),
        }
    }
}

impl ViewerConfig {
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), variant = %config.variant, "loaded viewer config");
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ViewportError> {
        self.camera.validate()
    }

    pub fn title(&self) -> &str {
        self.window
            .title
            .as_deref()
            .unwrap_or_else(|| self.variant.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sketches() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.fov_degrees, 75.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.camera.far, 100.0);
        assert_eq!(config.camera.position, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(config.light.position, Vec3::new(-1.0, 2.0, 4.0));
        assert!(config.antialias);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_is_default() {
        let config = ViewerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let json = r#"{
            "variant": "wireframe-cube",
            "camera": { "fov_degrees": 60.0 },
            "window": { "width": 1024 }
        }"#;
        let config = ViewerConfig::from_json_str(json).unwrap();
        assert_eq!(config.variant, Variant::WireframeCube);
        assert_eq!(config.camera.fov_degrees, 60.0);
        assert_eq!(config.camera.far, 100.0);
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
    }

    #[test]
    fn invalid_camera_rejected() {
        let json = r#"{ "camera": { "near": 5.0, "far": 1.0 } }"#;
        let err = ViewerConfig::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ViewportError::InvalidCamera(_))
        ));
    }

    #[test]
    fn bad_fov_rejected() {
        let camera = CameraConfig {
            fov_degrees: 180.0,
            ..CameraConfig::default()
        };
        assert!(camera.validate().is_err());
        let camera = CameraConfig {
            fov_degrees: f32::NAN,
            ..CameraConfig::default()
        };
        assert!(camera.validate().is_err());
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(matches!(
            ViewerConfig::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ViewerConfig::from_json_file("/nonexistent/viewloop.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let config = ViewerConfig::for_variant(Variant::WireframeCube);
        let json = config.to_json_pretty().unwrap();
        assert_eq!(ViewerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn title_falls_back_to_variant() {
        let mut config = ViewerConfig::for_variant(Variant::RotatingCube);
        assert_eq!(config.title(), Variant::RotatingCube.title());
        config.window.title = Some("custom".into());
        assert_eq!(config.title(), "custom");
    }
}
