use crate::{overlay::DebugSnapshot, render::Frame, SurfaceCreationError};

/// Parameters for (re)creating the on-screen surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceRequest {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub show_cursor: bool,
}

/// On-screen collaborator. Implementations own the window and whatever
/// context it needs; the engine only hands over finished frames.
pub trait Display {
    /// Tears down any existing surface and creates a new one, returning its
    /// actual size.
    fn recreate(&mut self, request: &SurfaceRequest) -> Result<(u32, u32), SurfaceCreationError>;

    /// Shows a frame. `overlay` is present only while the debug overlay is on.
    fn present(&mut self, frame: &Frame, overlay: Option<&DebugSnapshot>);

    fn set_cursor_visible(&mut self, visible: bool);

    /// Releases the surface.
    fn close(&mut self) {}
}
