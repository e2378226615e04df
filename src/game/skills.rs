//! Skill catalog and cooldown ledger.

use serde::{Deserialize, Serialize};

use super::Player;

/// Cooldown (in turns) reserved for the `double` skill. Declared in the
/// catalog but not yet wired to any resolution logic or [`SkillType`]
/// variant.
pub const DOUBLE_COOLDOWN: u8 = 12;
/// Cooldown (in turns) reserved for the `swap` skill. Declared in the
/// catalog but not yet wired to any resolution logic or [`SkillType`]
/// variant.
pub const SWAP_COOLDOWN: u8 = 9;

/// The four playable skills. Each is owned by exactly one side.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    /// Destroy a single stone (Black).
    Thunder,
    /// Destroy every stone in a 3x3 area (Black).
    Bomb,
    /// Turn a Black stone White (White).
    Convert,
    /// Move one of your stones to an empty cell (White).
    Portal,
}

impl SkillType {
    /// The side allowed to invoke this skill.
    pub fn owner(self) -> Player {
        match self {
            SkillType::Thunder | SkillType::Bomb => Player::Black,
            SkillType::Convert | SkillType::Portal => Player::White,
        }
    }

    /// Cooldown applied (in turns) after a successful resolution.
    pub fn cooldown_turns(self) -> u8 {
        match self {
            SkillType::Thunder => 5,
            SkillType::Bomb => 10,
            SkillType::Convert => 7,
            SkillType::Portal => 4,
        }
    }

    /// Number of target clicks before the skill resolves.
    pub fn steps(self) -> u8 {
        match self {
            SkillType::Portal => 2,
            _ => 1,
        }
    }

    /// The owner's other skill, decremented alongside a normal move.
    pub fn sibling(self) -> SkillType {
        match self {
            SkillType::Thunder => SkillType::Bomb,
            SkillType::Bomb => SkillType::Thunder,
            SkillType::Convert => SkillType::Portal,
            SkillType::Portal => SkillType::Convert,
        }
    }
}

/// Turns remaining before each skill can be used again. A skill is invocable
/// only at zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownLedger {
    pub thunder: u8,
    pub bomb: u8,
    pub convert: u8,
    pub portal: u8,
}

impl CooldownLedger {
    pub fn get(&self, skill: SkillType) -> u8 {
        match skill {
            SkillType::Thunder => self.thunder,
            SkillType::Bomb => self.bomb,
            SkillType::Convert => self.convert,
            SkillType::Portal => self.portal,
        }
    }

    pub fn set(&mut self, skill: SkillType, turns: u8) {
        match skill {
            SkillType::Thunder => self.thunder = turns,
            SkillType::Bomb => self.bomb = turns,
            SkillType::Convert => self.convert = turns,
            SkillType::Portal => self.portal = turns,
        }
    }

    pub fn is_ready(&self, skill: SkillType) -> bool {
        self.get(skill) == 0
    }

    /// Decrement (floor zero) the acting player's skills on turn advance,
    /// skipping the one just used, if any. The opponent's skills only tick on
    /// their own turns.
    pub fn tick(&mut self, acting: Player, just_used: Option<SkillType>) {
        let owned = match acting {
            Player::Black => [SkillType::Thunder, SkillType::Bomb],
            Player::White => [SkillType::Convert, SkillType::Portal],
        };
        for skill in owned {
            if Some(skill) != just_used {
                self.set(skill, self.get(skill).saturating_sub(1));
            }
        }
    }
}
