//! Core library for the Polar Roses viewer.
//!
//! The crate holds the curve animation engine. Each module owns one
//! subsystem (parameter store, curve generator, trail, tick scheduling,
//! rasterization, capture) and [`CurveEngine`] wires them together behind a
//! command interface. Windowing and PNG encoding stay outside, behind the
//! [`Display`] and [`FrameWriter`] traits.

pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod overlay;
pub mod params;
pub mod record;
pub mod render;
pub mod timeline;
pub mod trail;

pub use config::{AnimationConfig, AppConfig, CurveConfig, WindowConfig};
pub use curve::{GeneratorState, RoseCurve};
pub use engine::{Command, Control, CurveEngine, Display, SurfaceRequest, TickReport};
pub use error::{Result, RoseError, SurfaceCreationError, WriteError};
pub use overlay::DebugSnapshot;
pub use params::{Direction, Multiplier, ParamField, Parameters, RetentionMode};
pub use record::{
    BackgroundWriter, CaptureController, CaptureSession, CaptureState, FrameWriter, PngWriter,
    RecordingSettings, SessionEnd,
};
pub use render::{Frame, RenderStyle, Renderer, Viewport};
pub use timeline::{Clock, ManualClock, MonotonicClock, TickScheduler};
pub use trail::{Link, RetentionPolicy, Trail, WeightedLink};
