mod display;
mod script;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use polar_roses_core::{
    AppConfig, BackgroundWriter, Clock, Command, Control, CurveEngine, FrameWriter,
    MonotonicClock, PngWriter, RetentionMode, RoseError, SessionEnd,
};
use tracing_subscriber::EnvFilter;

use crate::display::HeadlessDisplay;
use crate::script::CommandScript;

const DESKTOP_SIZE: (u32, u32) = (1920, 1080);
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(10);

fn main() -> polar_roses_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.overrides.apply(load_config(&cli.overrides)?);

    match cli.command {
        Commands::Play { ticks, script } => run_play(&config, ticks, script),
        Commands::Still { output } => run_still(config, output),
        Commands::Sequence {
            output_dir,
            skip_first_cycle,
        } => run_sequence(config, output_dir, skip_first_cycle),
    }
}

fn load_config(overrides: &Overrides) -> polar_roses_core::Result<AppConfig> {
    match &overrides.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn run_play(
    config: &AppConfig,
    ticks: Option<u64>,
    script: Option<PathBuf>,
) -> polar_roses_core::Result<()> {
    let mut script = match script {
        Some(path) => CommandScript::load(&path)?,
        None => CommandScript::default(),
    };
    let writer = BackgroundWriter::spawn(PngWriter, config.recording.queue_depth);
    let mut engine = CurveEngine::new(config, HeadlessDisplay::new(DESKTOP_SIZE), writer)?;
    tracing::info!(?ticks, "starting playback");

    let clock = MonotonicClock::start();
    loop {
        let tick = engine.ticks();
        for command in script.due(tick) {
            if engine.handle(command)? == Control::Quit {
                return Ok(());
            }
        }
        if ticks.is_some_and(|limit| tick >= limit) {
            break;
        }
        if engine.params().paused() && script.is_finished() {
            tracing::info!("paused with no scripted input left");
            break;
        }
        if engine.update(clock.now()).is_none() {
            thread::sleep(engine.time_until_next_tick().min(MAX_IDLE_SLEEP));
        }
    }

    tracing::info!(frames = engine.display().frames(), "playback finished");
    engine.shutdown();
    Ok(())
}

fn run_still(mut config: AppConfig, output: Option<PathBuf>) -> polar_roses_core::Result<()> {
    if let Some(output) = output {
        config.recording.still_path = output;
    }
    let mut engine = CurveEngine::new(&config, HeadlessDisplay::new(DESKTOP_SIZE), PngWriter)?;
    let path = engine.capture().settings().still_path.clone();
    let frame = engine.still_frame();
    let result = PngWriter.write(&frame, &path);
    engine.handle(Command::Quit)?;
    result?;
    tracing::info!(path = %path.display(), "saved still frame");
    Ok(())
}

fn run_sequence(
    mut config: AppConfig,
    output_dir: Option<PathBuf>,
    skip_first_cycle: bool,
) -> polar_roses_core::Result<()> {
    if let Some(dir) = output_dir {
        config.recording.output_dir = dir;
    }
    let mut engine = CurveEngine::new(&config, HeadlessDisplay::new(DESKTOP_SIZE), PngWriter)?;
    if skip_first_cycle {
        engine.handle(Command::SkipFirstCycle)?;
    }
    engine.handle(Command::ToggleSequenceCapture)?;
    if !engine.capture().is_recording() {
        return Err(RoseError::msg("frame capture could not be started"));
    }

    let end = loop {
        if let Some(end) = engine.step().session_end {
            break end;
        }
    };
    engine.handle(Command::Quit)?;
    export_result(end)
}

/// A sequence export only succeeds if its session did not fail.
fn export_result(end: SessionEnd) -> polar_roses_core::Result<()> {
    match end {
        SessionEnd::Failed { frames, error } => {
            tracing::error!(frames, %error, "sequence export failed");
            Err(error.into())
        }
        end => {
            tracing::info!(?end, "sequence export finished");
            Ok(())
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Animated polar rose viewer", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand. Flags win over the configuration file.
#[derive(Args, Debug)]
struct Overrides {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Numerator of the petal ratio.
    #[arg(long, global = true)]
    n: Option<u32>,
    /// Denominator of the petal ratio.
    #[arg(long, global = true)]
    d: Option<u32>,
    /// Angle step per tick, in degrees.
    #[arg(long, global = true)]
    angle_delta: Option<f64>,
    /// Number of links kept in the trail.
    #[arg(long, global = true)]
    link_length: Option<u32>,
    /// Tick rate limit.
    #[arg(long, global = true)]
    fps: Option<u32>,
    /// Antialiasing level, 0 to 16.
    #[arg(long, global = true)]
    aa: Option<u32>,
    /// Fade old links out instead of cutting them off.
    #[arg(long, global = true)]
    fade: bool,
}

impl Overrides {
    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(n) = self.n {
            config.curve.n = n;
        }
        if let Some(d) = self.d {
            config.curve.d = d;
        }
        if let Some(delta) = self.angle_delta {
            config.animation.angle_delta_deg = delta;
        }
        if let Some(link_length) = self.link_length {
            config.animation.link_length = Some(link_length);
        }
        if let Some(fps) = self.fps {
            config.animation.fps_limit = fps;
        }
        if let Some(aa) = self.aa {
            config.animation.aa_level = aa;
        }
        if self.fade {
            config.animation.retention = RetentionMode::Fade;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Animate in real time against the wall clock.
    Play {
        /// Stop after this many ticks.
        #[arg(short, long)]
        ticks: Option<u64>,
        /// JSON list of `{ "at_tick": .., "command": .. }` entries to replay.
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
    /// Save the closed figure as a single PNG.
    Still {
        /// Output file, overriding the configured still path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export one animation cycle as a numbered PNG sequence.
    Sequence {
        /// Directory receiving the frames.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Run one turn without output before capturing.
        #[arg(long)]
        skip_first_cycle: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::parse_from([
            "polar-roses",
            "--n",
            "3",
            "--fade",
            "sequence",
            "--skip-first-cycle",
            "--aa",
            "2",
        ]);
        let config = cli.overrides.apply(AppConfig::default());

        assert_eq!(config.curve.n, 3);
        assert_eq!(config.animation.aa_level, 2);
        assert_eq!(config.animation.retention, RetentionMode::Fade);
        assert!(matches!(
            cli.command,
            Commands::Sequence {
                skip_first_cycle: true,
                ..
            }
        ));
    }

    #[test]
    fn failed_export_is_an_error() {
        assert!(export_result(SessionEnd::Completed { frames: 1800 }).is_ok());
        let failed = SessionEnd::Failed {
            frames: 3,
            error: polar_roses_core::WriteError::new("out/frame-00003.png", "disk full"),
        };
        assert!(matches!(export_result(failed), Err(RoseError::Write(_))));
    }
}
