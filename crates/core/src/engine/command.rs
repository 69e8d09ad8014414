use serde::{Deserialize, Serialize};

use crate::params::{Direction, Multiplier};

/// Discrete input delivered by the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    TogglePause,
    Quit,
    SaveStill,
    ToggleSequenceCapture,
    RecreateWindow,
    ReinitProgram,
    ToggleFullscreen,
    ToggleCursor,
    ClearTrail,
    SkipFirstCycle,
    ToggleRetentionMode,
    ToggleDebugOverlay,
    AdjustFps(Direction, Multiplier),
    AdjustLinkLength(Direction, Multiplier),
    AdjustAngleDelta(Direction, Multiplier),
    AdjustAa(Direction),
    /// The window was resized by the platform.
    Resize { width: u32, height: u32 },
}

/// What the host loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_json() {
        let commands: Vec<Command> = serde_json::from_str(
            r#"["TogglePause", {"AdjustFps": ["Increase", "Ten"]}, {"AdjustAa": "Decrease"},
                {"Resize": {"width": 640, "height": 480}}]"#,
        )
        .unwrap();

        assert_eq!(
            commands,
            vec![
                Command::TogglePause,
                Command::AdjustFps(Direction::Increase, Multiplier::Ten),
                Command::AdjustAa(Direction::Decrease),
                Command::Resize {
                    width: 640,
                    height: 480
                },
            ]
        );
    }
}
