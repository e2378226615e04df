//! Skill Gomoku: five-in-a-row on a 15x15 grid, augmented with per-player
//! skill actions that mutate the board outside the normal placement rule.
//!
//! The crate is the game's authoritative model: board state, turn ownership,
//! skill cooldowns, multi-step skill resolution and win detection live in
//! [`game`]; [`sync`] keeps two engine instances convergent over an
//! iroh-gossip channel by retransmitting intents; [`opponent`] gates the
//! automated-opponent collaborator; [`state`] ties them together for a
//! presentation layer that pushes clicks in and reads snapshots out.
//!
//! ```no_run
//! use skill_gomoku::game::Coord;
//! use skill_gomoku::opponent::{OpponentDriver, RandomSuggester};
//! use skill_gomoku::state::{GameContext, GameMode};
//! use skill_gomoku::sync::SyncNode;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let node = SyncNode::spawn(None).await?;
//! let opponent = OpponentDriver::new(RandomSuggester, skill_gomoku::game::Player::White);
//! let ctx = GameContext::new(node, opponent);
//! ctx.set_mode(GameMode::VsComputer).await?;
//! ctx.click(Coord::new(7, 7)).await?;
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod opponent;
pub mod state;
pub mod sync;
pub mod utils;
