use std::path::PathBuf;

/// Result alias that carries the custom [`RoseError`] type.
pub type Result<T> = std::result::Result<T, RoseError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum RoseError {
    /// The render surface could not be (re)created. There is no valid render
    /// target afterwards, so callers are expected to shut down.
    #[error(transparent)]
    Surface(#[from] SurfaceCreationError),
    /// A capture frame could not be persisted.
    #[error(transparent)]
    Write(#[from] WriteError),
    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
}

impl RoseError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for RoseError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for RoseError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Failure reported by a [`FrameWriter`](crate::FrameWriter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to write frame to `{}`: {reason}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    pub reason: String,
}

impl WriteError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a [`Display`](crate::Display) when it cannot provide a
/// render surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to create a {width}x{height} render surface: {reason}")]
pub struct SurfaceCreationError {
    pub width: u32,
    pub height: u32,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_mentions_path_and_reason() {
        let err = WriteError::new("out/frame-00003.png", "disk full");
        let text = err.to_string();
        assert!(text.contains("out/frame-00003.png"));
        assert!(text.contains("disk full"));
    }

    #[test]
    fn surface_errors_convert_into_crate_error() {
        let err: RoseError = SurfaceCreationError {
            width: 800,
            height: 600,
            reason: "no display".to_string(),
        }
        .into();

        assert!(matches!(err, RoseError::Surface(_)));
        assert!(err.to_string().contains("800x600"));
    }

    #[test]
    fn messages_round_trip_through_display() {
        let err = RoseError::from("missing output directory");
        assert_eq!(err.to_string(), "missing output directory");
    }
}
