//! The curve animation engine.
//!
//! [`CurveEngine`] owns every piece of mutable animation state and is driven
//! from a single control flow: commands go through [`CurveEngine::handle`],
//! clock pulses through [`CurveEngine::update`]. Each tick advances the
//! generator, updates the trail, renders once and feeds the display and the
//! capture controller.

mod command;
mod display;

use std::f64::consts::TAU;
use std::path::PathBuf;
use std::time::Duration;

pub use command::{Command, Control};
pub use display::{Display, SurfaceRequest};

use crate::{
    config::{AppConfig, WindowConfig, MIN_WINDOW_EDGE},
    curve::{GeneratorState, RoseCurve},
    overlay::DebugSnapshot,
    params::{Direction, Multiplier, ParamField, Parameters},
    record::{CaptureController, FrameWriter, SessionEnd},
    render::{Frame, Renderer, Viewport},
    timeline::TickScheduler,
    trail::{RetentionPolicy, Trail, WeightedLink},
    Result,
};

/// Outcome of a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Accumulated generator angle in radians after the tick.
    pub angle: f64,
    /// Whether a frame reached the display. False while skipping a cycle.
    pub presented: bool,
    pub captured: Option<PathBuf>,
    pub session_end: Option<SessionEnd>,
}

pub struct CurveEngine<D, W> {
    params: Parameters,
    curve: RoseCurve,
    generator: GeneratorState,
    trail: Trail,
    scheduler: TickScheduler,
    renderer: Renderer,
    capture: CaptureController,
    window: WindowConfig,
    viewport: Viewport,
    skip_until_turn: Option<u64>,
    ticks: u64,
    display: D,
    writer: W,
}

impl<D: Display, W: FrameWriter> CurveEngine<D, W> {
    /// Builds the engine and creates the initial surface.
    pub fn new(config: &AppConfig, display: D, writer: W) -> Result<Self> {
        let curve = config.rose();
        let generator = GeneratorState::new();
        let mut engine = Self {
            params: config.parameters(),
            curve,
            generator,
            trail: Trail::seeded(curve.point_for(&generator)),
            scheduler: TickScheduler::new(),
            renderer: Renderer::new(config.style),
            capture: CaptureController::new(config.recording.clone()),
            window: config.window.clone(),
            viewport: Viewport::new(config.window.width, config.window.height),
            skip_until_turn: None,
            ticks: 0,
            display,
            writer,
        };
        engine.recreate_surface()?;
        tracing::info!(
            n = curve.n(),
            d = curve.d(),
            link_length = engine.params.link_length(),
            "curve engine ready"
        );
        Ok(engine)
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn curve(&self) -> &RoseCurve {
        &self.curve
    }

    pub fn generator(&self) -> &GeneratorState {
        &self.generator
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn window(&self) -> &WindowConfig {
        &self.window
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Ticks run since start or the last re-init.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_skipping(&self) -> bool {
        self.skip_until_turn.is_some()
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::from_params(&self.params)
    }

    /// Time the host may sleep before the next tick is due.
    pub fn time_until_next_tick(&self) -> Duration {
        self.scheduler.time_until_next(self.params.fps_limit())
    }

    /// Applies one input command. Only a failed surface recreation is
    /// returned as an error; capture problems are logged and absorbed.
    pub fn handle(&mut self, command: Command) -> Result<Control> {
        tracing::debug!(?command, "handling command");
        match command {
            Command::TogglePause => {
                let paused = self.params.toggle_pause();
                tracing::info!(paused, "toggled pause");
            }
            Command::Quit => {
                self.shutdown();
                return Ok(Control::Quit);
            }
            Command::SaveStill => self.save_still(),
            Command::ToggleSequenceCapture => self.toggle_sequence(),
            Command::RecreateWindow => self.recreate_surface()?,
            Command::ReinitProgram => self.reinit()?,
            Command::ToggleFullscreen => {
                self.window.fullscreen = !self.window.fullscreen;
                self.recreate_surface()?;
            }
            Command::ToggleCursor => {
                self.window.show_cursor = !self.window.show_cursor;
                self.display.set_cursor_visible(self.window.show_cursor);
            }
            Command::ClearTrail => self.trail.clear(),
            Command::SkipFirstCycle => {
                let turn = self.generator.turns() + 1;
                self.skip_until_turn = Some(turn);
                tracing::info!(turn, "suppressing output until the next full turn");
            }
            Command::ToggleRetentionMode => {
                let mode = self.params.toggle_retention();
                tracing::info!(?mode, "retention mode changed");
            }
            Command::ToggleDebugOverlay => {
                self.window.debug_overlay = !self.window.debug_overlay;
            }
            Command::AdjustFps(direction, multiplier) => {
                self.adjust(ParamField::FpsLimit, direction, multiplier);
            }
            Command::AdjustLinkLength(direction, multiplier) => {
                self.adjust(ParamField::LinkLength, direction, multiplier);
            }
            Command::AdjustAngleDelta(direction, multiplier) => {
                self.adjust(ParamField::AngleDelta, direction, multiplier);
            }
            Command::AdjustAa(direction) => {
                self.adjust(ParamField::AaLevel, direction, Multiplier::One);
            }
            Command::Resize { width, height } => {
                self.window.width = width.max(MIN_WINDOW_EDGE);
                self.window.height = height.max(MIN_WINDOW_EDGE);
                self.viewport = Viewport::new(self.window.width, self.window.height);
            }
        }
        Ok(Control::Continue)
    }

    /// Feeds the clock to the scheduler and ticks when one is due.
    pub fn update(&mut self, now: Duration) -> Option<TickReport> {
        let due = self
            .scheduler
            .poll(now, self.params.fps_limit(), self.params.paused());
        due.then(|| self.step())
    }

    /// Runs one tick regardless of the clock. Deterministic exports drive the
    /// engine through this directly.
    pub fn step(&mut self) -> TickReport {
        let (state, point) = self
            .curve
            .advance(self.generator, self.params.angle_delta_deg());
        self.generator = state;
        let angle = state.unwrapped();
        let policy = self.retention_policy();
        self.trail.advance(point, angle, policy);
        self.ticks += 1;

        let mut report = TickReport {
            tick: self.ticks,
            angle,
            presented: false,
            captured: None,
            session_end: None,
        };
        tracing::trace!(tick = report.tick, angle, links = self.trail.len(), "tick");

        if let Some(turn) = self.skip_until_turn {
            if state.turns() < turn {
                return report;
            }
            self.skip_until_turn = None;
            tracing::info!("output resumed after skipped cycle");
        }

        let links = self.trail.snapshot(policy);
        let frame = self.render_links(&links, self.viewport);
        let overlay = self.window.debug_overlay.then(|| self.debug_snapshot());
        self.display.present(&frame, overlay.as_ref());
        report.presented = true;

        if self.capture.is_recording() {
            let ended = self
                .capture
                .poll_writer(&mut self.writer)
                .or_else(|| self.capture.poll_completion(angle, &mut self.writer));
            if let Some(end) = ended {
                log_session_end(&end);
                report.session_end = Some(end);
            } else {
                let capture_viewport = self.capture.settings().viewport();
                let captured = if capture_viewport == self.viewport {
                    frame
                } else {
                    self.render_links(&links, capture_viewport)
                };
                match self.capture.write_frame(angle, &captured, &mut self.writer) {
                    Ok(path) => report.captured = Some(path),
                    Err(end) => {
                        log_session_end(&end);
                        report.session_end = Some(end);
                    }
                }
            }
        }

        report
    }

    /// Renders the current trail onto a surface of the given size.
    pub fn render_frame(&self, viewport: Viewport) -> Frame {
        self.render_links(&self.trail.snapshot(self.retention_policy()), viewport)
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        DebugSnapshot {
            measured_fps: self.scheduler.measured_fps(),
            fps_limit: self.params.fps_limit(),
            paused: self.params.paused(),
            angle_deg: self.generator.unwrapped_degrees(),
            cycle_deg: self.curve.closure_degrees(),
            angle_delta_deg: self.params.angle_delta_deg(),
            link_length: self.params.link_length(),
            links: self.trail.len(),
            retention: self.params.retention(),
            width: self.viewport.width,
            height: self.viewport.height,
            aa_level: self.params.aa_level(),
            ticks: self.ticks,
            capturing: self.capture.is_recording(),
            skipping: self.is_skipping(),
        }
    }

    /// Drops any open capture session without writing a partial frame,
    /// waits for queued writes and releases the surface.
    pub fn shutdown(&mut self) {
        if let Some(end) = self.capture.stop(&mut self.writer) {
            log_session_end(&end);
        }
        for err in self.writer.flush() {
            tracing::warn!(%err, "pending frame write failed during shutdown");
        }
        self.display.close();
        tracing::info!("engine shut down");
    }

    fn render_links(&self, links: &[WeightedLink], viewport: Viewport) -> Frame {
        self.renderer
            .render(links, &viewport, self.params.aa_level())
    }

    fn adjust(&mut self, field: ParamField, direction: Direction, multiplier: Multiplier) {
        let value = self.params.adjust(field, direction, multiplier);
        tracing::info!(?field, value, "parameter adjusted");
    }

    fn save_still(&mut self) {
        self.capture.request_still();
        let frame = self.still_frame();
        if let Err(err) = self.capture.finish_still(&frame, &mut self.writer) {
            tracing::warn!(%err, "could not save still frame");
        }
    }

    /// The closed figure drawn from angle zero at full opacity, at capture
    /// size. Depends only on the curve, the angle step and the style, never
    /// on the interactive trail.
    pub fn still_frame(&self) -> Frame {
        let steps = self.curve.figure_steps(self.params.angle_delta_deg());
        let policy = RetentionPolicy::Cutoff { max_links: steps };
        let figure = self.draw_figure(policy);
        self.render_links(&figure.snapshot(policy), self.capture.settings().viewport())
    }

    fn toggle_sequence(&mut self) {
        if let Some(end) = self.capture.stop(&mut self.writer) {
            log_session_end(&end);
            return;
        }
        if let Err(err) = self.capture.start(self.cycle_radians()) {
            tracing::warn!(%err, "could not start frame capture");
            return;
        }
        self.prepare_sequence();
    }

    /// Restarts the generator at angle zero behind a trail that already
    /// holds one closed figure, so every export opens on the same frame.
    fn prepare_sequence(&mut self) {
        self.trail = self.draw_figure(self.retention_policy());
        self.generator = GeneratorState::new();
        if self.skip_until_turn.is_some() {
            self.skip_until_turn = Some(self.generator.turns() + 1);
        }
    }

    /// Runs the generator from angle zero through one closed figure into a
    /// fresh trail.
    fn draw_figure(&self, policy: RetentionPolicy) -> Trail {
        let delta = self.params.angle_delta_deg();
        let mut state = GeneratorState::new();
        let mut trail = Trail::seeded(self.curve.point_for(&state));
        for _ in 0..self.curve.figure_steps(delta) {
            let (next, point) = self.curve.advance(state, delta);
            state = next;
            trail.advance(point, state.unwrapped(), policy);
        }
        trail
    }

    /// Length of one animation cycle for sequence capture, always a whole
    /// number of turns.
    fn cycle_radians(&self) -> f64 {
        let turns = self
            .capture
            .settings()
            .cycle_turns
            .unwrap_or_else(|| self.curve.cycle_turns());
        f64::from(turns.max(1)) * TAU
    }

    fn reinit(&mut self) -> Result<()> {
        if let Some(end) = self.capture.stop(&mut self.writer) {
            log_session_end(&end);
        }
        self.generator = GeneratorState::new();
        self.trail = Trail::seeded(self.curve.point_for(&self.generator));
        self.scheduler.reset();
        self.skip_until_turn = None;
        self.ticks = 0;
        tracing::info!("animation state reinitialised");
        self.recreate_surface()
    }

    fn recreate_surface(&mut self) -> Result<()> {
        let request = SurfaceRequest {
            width: self.window.width,
            height: self.window.height,
            fullscreen: self.window.fullscreen,
            show_cursor: self.window.show_cursor,
        };
        let (width, height) = self.display.recreate(&request).map_err(|err| {
            tracing::error!(%err, "render surface unavailable");
            err
        })?;
        self.display.set_cursor_visible(self.window.show_cursor);
        self.viewport = Viewport::new(width, height);
        tracing::info!(width, height, fullscreen = self.window.fullscreen, "render surface created");
        Ok(())
    }
}

fn log_session_end(end: &SessionEnd) {
    match end {
        SessionEnd::Stopped { frames } => tracing::info!(frames, "frame capture stopped"),
        SessionEnd::Completed { frames } => tracing::info!(frames, "frame capture finished"),
        SessionEnd::Failed { frames, error } => {
            tracing::warn!(frames, %error, "frame capture aborted")
        }
    }
}

impl<D, W> std::fmt::Debug for CurveEngine<D, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveEngine")
            .field("params", &self.params)
            .field("curve", &self.curve)
            .field("generator", &self.generator)
            .field("links", &self.trail.len())
            .field("viewport", &self.viewport)
            .finish()
    }
}
