use serde::{Deserialize, Serialize};

use crate::bridge::NetworkPolicy;
use crate::sequence::RandomizerKind;

pub const FRAME_MS: f64 = 1000.0 / 60.0;
pub const GRAVITY_FRAMES: u32 = 36;
pub const DEFAULT_GRAVITY_MS: f64 = FRAME_MS * GRAVITY_FRAMES as f64;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct GameSettings {
    pub gravity_ms: f64,
    // 0 behaves as 1
    pub max_catch_up_steps: u32,
    pub ghost_enabled: bool,
    pub preview_count: usize,
    pub randomizer: RandomizerKind,
    pub seed: Option<u64>,
    pub controls: ControlBindings,
    pub network: NetworkPolicy,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            gravity_ms: DEFAULT_GRAVITY_MS,
            max_catch_up_steps: 4,
            ghost_enabled: true,
            preview_count: 2,
            randomizer: RandomizerKind::SevenBag,
            seed: None,
            controls: ControlBindings::default(),
            network: NetworkPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ControlBindings {
    pub move_left: String,
    pub move_right: String,
    pub rotate: String,
    pub soft_drop: String,
    pub hard_drop: String,
}

impl Default for ControlBindings {
    fn default() -> Self {
        Self {
            move_left: "ArrowLeft".to_string(),
            move_right: "ArrowRight".to_string(),
            rotate: "ArrowUp".to_string(),
            soft_drop: "ArrowDown".to_string(),
            hard_drop: "Space".to_string(),
        }
    }
}

impl ControlBindings {
    pub fn command_for(&self, code: &str) -> Option<Command> {
        if code == self.move_left {
            Some(Command::MoveLeft)
        } else if code == self.move_right {
            Some(Command::MoveRight)
        } else if code == self.rotate {
            Some(Command::Rotate)
        } else if code == self.soft_drop {
            Some(Command::SoftDrop)
        } else if code == self.hard_drop {
            Some(Command::HardDrop)
        } else {
            None
        }
    }
}
