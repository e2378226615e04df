use serde::{Deserialize, Serialize};

pub mod board;
pub mod engine;
pub mod rules;
pub mod skills;

pub use board::{Board, Cell, Coord, BOARD_SIZE};
pub use engine::{ClickAction, GameEngine, SkillOutcome, Snapshot};
pub use skills::{CooldownLedger, SkillType};

/// The two sides. Black always moves first.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Black,
    White,
}

impl Player {
    /// The opposing side.
    pub fn other(self) -> Self {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }
}

/// Overall game status.
///
/// `Won` holds the winner, who also stays the current player so the
/// presentation layer can show whose stones finished the line. `Draw` is
/// declared for completeness but nothing assigns it: board exhaustion is not
/// detected.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GameStatus {
    Playing,
    Won { winner: Player },
    Draw,
}

impl GameStatus {
    pub fn is_playing(self) -> bool {
        matches!(self, GameStatus::Playing)
    }
}
