use std::path::Path;

use polar_roses_core::{Command, Result};
use serde::{Deserialize, Serialize};

/// Command replayed once the engine has completed `at_tick` ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedCommand {
    pub at_tick: u64,
    pub command: Command,
}

/// Ordered list of scripted commands, standing in for keyboard input.
#[derive(Debug, Default)]
pub struct CommandScript {
    entries: Vec<ScriptedCommand>,
    next: usize,
}

impl CommandScript {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let mut entries: Vec<ScriptedCommand> = serde_json::from_str(text)?;
        entries.sort_by_key(|entry| entry.at_tick);
        Ok(Self { entries, next: 0 })
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.entries.len()
    }

    /// Commands that became due at `tick`, in script order.
    pub fn due(&mut self, tick: u64) -> Vec<Command> {
        let mut due = Vec::new();
        while let Some(entry) = self.entries.get(self.next) {
            if entry.at_tick > tick {
                break;
            }
            due.push(entry.command);
            self.next += 1;
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use polar_roses_core::{Direction, Multiplier};

    use super::*;

    #[test]
    fn releases_commands_in_tick_order() {
        let mut script = CommandScript::from_json(
            r#"[
                {"at_tick": 5, "command": "TogglePause"},
                {"at_tick": 2, "command": {"AdjustLinkLength": ["Decrease", "Ten"]}}
            ]"#,
        )
        .unwrap();

        assert!(script.due(1).is_empty());
        assert_eq!(
            script.due(3),
            vec![Command::AdjustLinkLength(Direction::Decrease, Multiplier::Ten)]
        );
        assert_eq!(script.due(9), vec![Command::TogglePause]);
        assert!(script.due(10).is_empty());
        assert!(script.is_finished());
    }
}
