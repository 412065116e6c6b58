//! Scripted actions replayed by the headless client.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use creepline_core::{CreepKind, MoveDirection, TowerKind};
use serde::Deserialize;

/// Action scheduled for a tick.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum ScriptAction {
    /// Spawn a creep at every spawner.
    SendWave {
        #[serde(default = "simple_creep")]
        creep: CreepKind,
    },
    /// Place a tower through the placement preview.
    BuildTower {
        x: f32,
        z: f32,
        #[serde(default = "arrow_tower")]
        tower: TowerKind,
    },
    /// Nudge the view anchor.
    Move { direction: MoveDirection },
}

const fn simple_creep() -> CreepKind {
    CreepKind::Simple
}

const fn arrow_tower() -> TowerKind {
    TowerKind::Arrow
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
struct Step {
    tick: u32,
    #[serde(flatten)]
    action: ScriptAction,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    step: Vec<Step>,
}

/// Steps ordered by tick, consumed front to back.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Script {
    steps: Vec<Step>,
    cursor: usize,
}

impl Script {
    /// Reads a script file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid script {}", path.display()))
    }

    /// Parses a script, ordering steps by tick while keeping ties in file order.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let ScriptFile { mut step } = toml::from_str(contents)?;
        step.sort_by_key(|step| step.tick);
        Ok(Self {
            steps: step,
            cursor: 0,
        })
    }

    /// Consumes every step scheduled at or before `tick`.
    pub(crate) fn due(&mut self, tick: u32) -> Vec<ScriptAction> {
        let start = self.cursor;
        while self
            .steps
            .get(self.cursor)
            .is_some_and(|step| step.tick <= tick)
        {
            self.cursor += 1;
        }
        self.steps[start..self.cursor]
            .iter()
            .map(|step| step.action)
            .collect()
    }

    /// Number of steps not consumed yet.
    pub(crate) fn remaining(&self) -> usize {
        self.steps.len() - self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_opening_parses() {
        let mut script = Script::parse(include_str!("../scripts/opening.toml")).expect("valid");
        assert_eq!(script.remaining(), 4);
        assert_eq!(
            script.due(0),
            vec![ScriptAction::SendWave {
                creep: CreepKind::Simple
            }]
        );
        assert!(script.due(19).is_empty());
        assert_eq!(
            script.due(20),
            vec![ScriptAction::BuildTower {
                x: 4.5,
                z: 4.5,
                tower: TowerKind::Arrow
            }]
        );
    }

    #[test]
    fn steps_run_in_tick_order_and_late_steps_catch_up() {
        let mut script = Script::parse(
            r#"
            [[step]]
            tick = 5
            action = "move"
            direction = "left"

            [[step]]
            tick = 2
            action = "send_wave"
            "#,
        )
        .expect("valid");
        assert_eq!(script.due(10).len(), 2);
        assert_eq!(script.remaining(), 0);
    }

    #[test]
    fn unknown_actions_are_rejected() {
        assert!(Script::parse("[[step]]\ntick = 0\naction = \"nuke\"\n").is_err());
    }
}
