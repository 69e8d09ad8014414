use polar_roses_core::{DebugSnapshot, Display, Frame, SurfaceCreationError, SurfaceRequest};

/// Display used when no window system is attached. Frames are counted and
/// the debug overlay, when enabled, goes to the log.
#[derive(Debug)]
pub struct HeadlessDisplay {
    desktop: (u32, u32),
    frames: u64,
    open: bool,
}

impl HeadlessDisplay {
    pub fn new(desktop: (u32, u32)) -> Self {
        Self {
            desktop,
            frames: 0,
            open: false,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Display for HeadlessDisplay {
    fn recreate(&mut self, request: &SurfaceRequest) -> Result<(u32, u32), SurfaceCreationError> {
        let size = if request.fullscreen {
            self.desktop
        } else {
            (request.width, request.height)
        };
        if size.0 == 0 || size.1 == 0 {
            return Err(SurfaceCreationError {
                width: size.0,
                height: size.1,
                reason: "surface has no area".to_string(),
            });
        }
        self.open = true;
        tracing::debug!(width = size.0, height = size.1, "headless surface ready");
        Ok(size)
    }

    fn present(&mut self, frame: &Frame, overlay: Option<&DebugSnapshot>) {
        if !self.open {
            return;
        }
        self.frames += 1;
        tracing::trace!(frame = self.frames, width = frame.width(), "presented frame");
        if let Some(snapshot) = overlay {
            tracing::debug!("\n{snapshot}");
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        tracing::trace!(visible, "cursor visibility changed");
    }

    fn close(&mut self) {
        self.open = false;
    }
}
