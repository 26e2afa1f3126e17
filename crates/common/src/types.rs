use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and debug dumps.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear RGB color with components in `[0, 1]`.
///
/// Hex values are sRGB-encoded, as in CSS; [`Color::from_hex`] and
/// [`Color::to_hex`] convert at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a packed sRGB `0xRRGGBB` value.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self::rgb(channel(16), channel(8), channel(0))
    }

    /// Pack into an sRGB `0xRRGGBB` value.
    pub fn to_hex(self) -> u32 {
        let channel = |v: f32| (linear_to_srgb(v.clamp(0.0, 1.0)) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::rgb(self.r * factor, self.g * factor, self.b * factor)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    pub fn to_rgba(self, alpha: f32) -> [f32; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A zero-area viewport was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("viewport has zero area: {width}x{height}")]
pub struct DegenerateViewport {
    pub width: u32,
    pub height: u32,
}

/// The pixel rectangle the scene is rendered into. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, DegenerateViewport> {
        if width == 0 || height == 0 {
            return Err(DegenerateViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width over height. Never NaN or infinite since both sides are non-zero.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_uniqueness() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex(0xffff00);
        assert_eq!(c, Color::rgb(1.0, 1.0, 0.0));
        assert_eq!(Color::from_hex(0x515151).to_hex(), 0x515151);
        assert_eq!(Color::from_hex(0x044a88).to_hex(), 0x044a88);
    }

    #[test]
    fn hex_is_decoded_from_srgb() {
        // Mid grey is about 8% in linear light; an sRGB surface encodes it
        // back to 0x515151 on output.
        let grey = Color::from_hex(0x515151);
        assert!((grey.r - 0.0823).abs() < 1e-3);
        assert_eq!(grey.r, grey.g);
        assert!((Color::from_hex(0x040404).r - 4.0 / 255.0 / 12.92).abs() < 1e-6);
        assert_eq!(Color::WHITE.to_hex(), 0xffffff);
        assert_eq!(Color::BLACK.to_hex(), 0x000000);
    }

    #[test]
    fn color_scaling() {
        let c = Color::WHITE.scaled(0.5);
        assert_eq!(c.to_rgba(1.0), [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn viewport_aspect() {
        let vp = Viewport::new(800, 600).unwrap();
        assert_eq!(vp.aspect(), 800.0 / 600.0);
        assert_eq!(Viewport::new(400, 400).unwrap().aspect(), 1.0);
    }

    #[test]
    fn viewport_rejects_zero_sides() {
        assert_eq!(
            Viewport::new(0, 600),
            Err(DegenerateViewport {
                width: 0,
                height: 600
            })
        );
        assert!(Viewport::new(800, 0).is_err());
    }

    #[test]
    fn color_serializes_as_components() {
        let json = serde_json::to_string(&Color::rgb(1.0, 0.0, 0.5)).unwrap();
        assert_eq!(json, r#"{"r":1.0,"g":0.0,"b":0.5}"#);
    }
}
