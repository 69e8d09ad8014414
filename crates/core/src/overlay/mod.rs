use std::fmt;

use serde::Serialize;

use crate::params::RetentionMode;

/// Read-only view of the engine for the debug overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub measured_fps: f32,
    pub fps_limit: u32,
    pub paused: bool,
    pub angle_deg: f64,
    pub cycle_deg: f64,
    pub angle_delta_deg: f64,
    pub link_length: u32,
    pub links: usize,
    pub retention: RetentionMode,
    pub width: u32,
    pub height: u32,
    pub aa_level: u32,
    pub ticks: u64,
    pub capturing: bool,
    pub skipping: bool,
}

impl fmt::Display for DebugSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let load = f64::from(self.measured_fps) / f64::from(self.fps_limit.max(1)) * 100.0;
        write!(f, "FPS: {:7.2} (max: {} - {:6.2}%)", self.measured_fps, self.fps_limit, load)?;
        if self.paused {
            write!(f, " [paused]")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Angle: {:.2} / {:.1} (+{:.1})",
            self.angle_deg % self.cycle_deg.max(f64::EPSILON),
            self.cycle_deg,
            self.angle_delta_deg
        )?;
        writeln!(
            f,
            "Links: {} / {} ({:?})",
            self.links, self.link_length, self.retention
        )?;
        writeln!(f, "Size: {}x{}", self.width, self.height)?;
        writeln!(f, "AA: {}", self.aa_level)?;
        write!(f, "Ticks: {}", self.ticks)?;
        if self.capturing {
            write!(f, " [capturing]")?;
        }
        if self.skipping {
            write!(f, " [skipping cycle]")?;
        }
        Ok(())
    }
}
