use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    curve::RoseCurve,
    params::{ParamField, Parameters, RetentionMode},
    record::RecordingSettings,
    render::RenderStyle,
    Result,
};

/// Smallest window edge the viewer accepts.
pub const MIN_WINDOW_EDGE: u32 = 300;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub curve: CurveConfig,
    pub animation: AnimationConfig,
    pub style: RenderStyle,
    pub recording: RecordingSettings,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn rose(&self) -> RoseCurve {
        RoseCurve::new(self.curve.n, self.curve.d)
    }

    /// Initial parameter store. Without an explicit link length the trail
    /// holds exactly one closed figure.
    pub fn parameters(&self) -> Parameters {
        let animation = &self.animation;
        let mut params = Parameters::new();
        let delta = params.set(ParamField::AngleDelta, animation.angle_delta_deg);
        let link_length = animation
            .link_length
            .map(f64::from)
            .unwrap_or_else(|| (self.rose().closure_degrees() / delta).round());
        params.set(ParamField::LinkLength, link_length);
        params.set(ParamField::FpsLimit, f64::from(animation.fps_limit));
        params.set(ParamField::AaLevel, f64::from(animation.aa_level));
        params.set_retention(animation.retention);
        params.set_paused(animation.start_paused);
        params
    }
}

/// Configuration of the on-screen surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub show_cursor: bool,
    pub debug_overlay: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            fullscreen: false,
            show_cursor: true,
            debug_overlay: false,
        }
    }
}

/// Petal ratio of the rose curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub n: u32,
    pub d: u32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        let rose = RoseCurve::default();
        Self {
            n: rose.n(),
            d: rose.d(),
        }
    }
}

/// Initial values for the parameter store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub angle_delta_deg: f64,
    pub link_length: Option<u32>,
    pub fps_limit: u32,
    pub aa_level: u32,
    pub retention: RetentionMode,
    pub start_paused: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            angle_delta_deg: 1.0,
            link_length: None,
            fps_limit: 60,
            aa_level: 8,
            retention: RetentionMode::Cutoff,
            start_paused: false,
        }
    }
}
