/// Pointer buttons the controls react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// A host-independent pointer event.
///
/// Hosts translate their native mouse events into these; the controls never
/// see window-system types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Pressed(PointerButton),
    Released(PointerButton),
    /// Cursor moved to an absolute position in physical pixels.
    Moved { x: f64, y: f64 },
    /// Wheel scrolled; positive values scroll away from the user.
    Scrolled(f32),
    /// The pointer left the input element; any drag ends.
    Left,
}
