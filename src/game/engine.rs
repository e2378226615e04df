//! The authoritative game state machine.
//!
//! All mutation goes through intent handlers on [`GameEngine`]: place a
//! stone, resolve an armed skill, toggle the armed skill, reset. Illegal
//! intents never mutate and never error; they are reported through the
//! returned outcome so the caller can retry with a different target. The
//! same handlers serve local input and replayed remote messages, which is
//! what keeps two peers convergent.

use serde::{Deserialize, Serialize};

use super::board::{Board, Cell, Coord};
use super::rules::check_win;
use super::skills::{CooldownLedger, SkillType};
use super::{GameStatus, Player};

/// Result of one skill-resolution click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillOutcome {
    /// Precondition failed; nothing changed. The skill stays armed.
    Rejected,
    /// A two-step skill recorded its source selection; no board mutation yet.
    Pending,
    /// The skill resolved. Cooldowns and turn are already updated.
    Resolved { won: bool },
}

/// What a board click turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Nothing happened (occupied cell, finished game, off-board input).
    Ignored,
    /// A stone was placed for the current player.
    Placed,
    /// The click fed the armed skill. Broadcast-worthy even when rejected,
    /// since the remote replay rejects identically.
    Skill(SkillOutcome),
}

impl ClickAction {
    /// Whether a peer needs to hear about this click to stay in sync.
    pub fn should_sync(self) -> bool {
        !matches!(self, ClickAction::Ignored)
    }
}

/// Read-only copy of the engine state for the presentation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub board: Board,
    pub current_player: Player,
    pub game_status: GameStatus,
    pub winning_line: Option<Vec<Coord>>,
    pub last_move: Option<Coord>,
    pub active_skill: Option<SkillType>,
    pub selected_cell: Option<Coord>,
    pub cooldowns: CooldownLedger,
}

#[derive(Debug, Clone)]
pub struct GameEngine {
    board: Board,
    current_player: Player,
    status: GameStatus,
    winning_line: Option<Vec<Coord>>,
    last_move: Option<Coord>,
    active_skill: Option<SkillType>,
    selected_cell: Option<Coord>,
    cooldowns: CooldownLedger,
    /// Bumped on every reset so stale asynchronous opponent responses can be
    /// recognized and discarded.
    generation: u64,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: Player::Black,
            status: GameStatus::Playing,
            winning_line: None,
            last_move: None,
            active_skill: None,
            selected_cell: None,
            cooldowns: CooldownLedger::default(),
            generation: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
    pub fn current_player(&self) -> Player {
        self.current_player
    }
    pub fn status(&self) -> GameStatus {
        self.status
    }
    pub fn active_skill(&self) -> Option<SkillType> {
        self.active_skill
    }
    pub fn selected_cell(&self) -> Option<Coord> {
        self.selected_cell
    }
    pub fn cooldowns(&self) -> &CooldownLedger {
        &self.cooldowns
    }
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board.clone(),
            current_player: self.current_player,
            game_status: self.status,
            winning_line: self.winning_line.clone(),
            last_move: self.last_move,
            active_skill: self.active_skill,
            selected_cell: self.selected_cell,
            cooldowns: self.cooldowns,
        }
    }

    /// Place a stone for `player` at `at`.
    ///
    /// Placing on an occupied cell, off the board, or after the game ended is
    /// a silent no-op returning `false`: the presentation layer should have
    /// prevented the click, and the engine refuses to mutate.
    pub fn place(&mut self, at: Coord, player: Player) -> bool {
        if !self.status.is_playing() || !self.board.is_empty(at) {
            tracing::debug!(?at, "ignoring illegal placement");
            return false;
        }
        self.board.set(at, player.into());
        self.last_move = Some(at);
        if let Some(line) = check_win(&self.board, at, player) {
            // Winner stays as current player; the turn does not advance.
            self.status = GameStatus::Won { winner: player };
            self.winning_line = Some(line);
        } else {
            self.cooldowns.tick(player, None);
            self.current_player = player.other();
        }
        true
    }

    /// Toggle the armed skill. Arming clears any pending selection;
    /// re-selecting the armed skill disarms it. Arming is refused while the
    /// game is over, for a skill the current player does not own, or while
    /// the skill is cooling down. Returns whether anything changed.
    pub fn select_skill(&mut self, skill: SkillType) -> bool {
        if self.active_skill == Some(skill) {
            self.active_skill = None;
            self.selected_cell = None;
            return true;
        }
        if !self.status.is_playing()
            || skill.owner() != self.current_player
            || !self.cooldowns.is_ready(skill)
        {
            tracing::debug!(?skill, "refusing to arm skill");
            return false;
        }
        self.active_skill = Some(skill);
        self.selected_cell = None;
        true
    }

    /// Feed a target click to the armed skill.
    pub fn use_skill(&mut self, at: Coord) -> SkillOutcome {
        let Some(skill) = self.active_skill else {
            return SkillOutcome::Rejected;
        };
        if !self.status.is_playing()
            || skill.owner() != self.current_player
            || !self.cooldowns.is_ready(skill)
            || !self.board.contains(at)
        {
            return SkillOutcome::Rejected;
        }
        let outcome = match skill {
            SkillType::Thunder => self.resolve_thunder(at),
            SkillType::Bomb => self.resolve_bomb(at),
            SkillType::Convert => self.resolve_convert(at),
            SkillType::Portal => self.resolve_portal(at),
        };
        if let SkillOutcome::Resolved { won } = outcome {
            self.finish_resolution(skill, won);
        }
        outcome
    }

    /// Dispatch a board click: armed skill takes the click, otherwise it is
    /// a placement for the current player.
    pub fn click(&mut self, at: Coord) -> ClickAction {
        if !self.board.contains(at) {
            return ClickAction::Ignored;
        }
        if self.active_skill.is_some() {
            ClickAction::Skill(self.use_skill(at))
        } else if self.place(at, self.current_player) {
            ClickAction::Placed
        } else {
            ClickAction::Ignored
        }
    }

    /// Return to the initial state, whatever the current one is, and bump
    /// the generation so in-flight opponent responses get discarded.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self::new();
        self.generation = generation;
    }

    /// Destroy a single stone. The target must be occupied.
    fn resolve_thunder(&mut self, at: Coord) -> SkillOutcome {
        if self.board.get(at) == Cell::Empty {
            return SkillOutcome::Rejected;
        }
        self.board.set(at, Cell::Empty);
        // Stale highlight: the destroyed cell may have been the last move.
        if self.last_move == Some(at) {
            self.last_move = None;
        }
        SkillOutcome::Resolved { won: false }
    }

    /// Destroy the 3x3 neighborhood centered at the target, clipped to the
    /// board. Resolves regardless of prior content.
    fn resolve_bomb(&mut self, at: Coord) -> SkillOutcome {
        for r in at.row.saturating_sub(1)..=at.row + 1 {
            for c in at.col.saturating_sub(1)..=at.col + 1 {
                let cell = Coord::new(r, c);
                if self.board.contains(cell) {
                    self.board.set(cell, Cell::Empty);
                }
            }
        }
        self.last_move = Some(at);
        SkillOutcome::Resolved { won: false }
    }

    /// Turn a Black stone White, which can complete a White line.
    fn resolve_convert(&mut self, at: Coord) -> SkillOutcome {
        if self.board.get(at) != Cell::Black {
            return SkillOutcome::Rejected;
        }
        self.board.set(at, Cell::White);
        let won = self.record_win_if_any(at, Player::White);
        SkillOutcome::Resolved { won }
    }

    /// Two-step: select one of White's stones, then move it to an empty
    /// cell. Clicking another White stone mid-resolution replaces the
    /// selection.
    fn resolve_portal(&mut self, at: Coord) -> SkillOutcome {
        match self.selected_cell {
            None => {
                if self.board.get(at) == Cell::White {
                    self.selected_cell = Some(at);
                    SkillOutcome::Pending
                } else {
                    SkillOutcome::Rejected
                }
            }
            Some(source) => match self.board.get(at) {
                Cell::Empty => {
                    self.board.set(source, Cell::Empty);
                    self.board.set(at, Cell::White);
                    self.last_move = Some(at);
                    let won = self.record_win_if_any(at, Player::White);
                    SkillOutcome::Resolved { won }
                }
                Cell::White => {
                    self.selected_cell = Some(at);
                    SkillOutcome::Pending
                }
                Cell::Black => SkillOutcome::Rejected,
            },
        }
    }

    fn record_win_if_any(&mut self, at: Coord, player: Player) -> bool {
        match check_win(&self.board, at, player) {
            Some(line) => {
                self.status = GameStatus::Won { winner: player };
                self.winning_line = Some(line);
                true
            }
            None => false,
        }
    }

    /// Single deterministic update applied after every terminal skill
    /// resolution: set the invoked skill's cooldown, tick the owner's other
    /// skill, clear the armed state, and pass the turn unless the skill won.
    fn finish_resolution(&mut self, skill: SkillType, won: bool) {
        let owner = skill.owner();
        self.cooldowns.set(skill, skill.cooldown_turns());
        self.cooldowns.tick(owner, Some(skill));
        self.active_skill = None;
        self.selected_cell = None;
        if !won {
            self.current_player = owner.other();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::BOARD_SIZE;

    fn at(row: usize, col: usize) -> Coord {
        Coord::new(row, col)
    }

    /// Alternate placements far from each other so no line forms.
    fn scatter_moves(engine: &mut GameEngine, n: usize) {
        let placed = BOARD_SIZE * BOARD_SIZE - engine.board().empty_cells().count();
        for i in placed..placed + n {
            let coord = at((i * 2) % BOARD_SIZE, (i * 7 + i / 8) % BOARD_SIZE);
            assert!(engine.place(coord, engine.current_player()));
        }
    }

    #[test]
    fn initial_snapshot() {
        let snapshot = GameEngine::new().snapshot();
        assert_eq!(snapshot.current_player, Player::Black);
        assert_eq!(snapshot.game_status, GameStatus::Playing);
        assert!(snapshot.winning_line.is_none());
        assert!(snapshot.last_move.is_none());
        assert!(snapshot.active_skill.is_none());
        assert!(snapshot.selected_cell.is_none());
        assert_eq!(snapshot.cooldowns, CooldownLedger::default());
        assert_eq!(snapshot.board.empty_cells().count(), BOARD_SIZE * BOARD_SIZE);
    }

    #[test]
    fn placement_alternates_turns() {
        let mut engine = GameEngine::new();
        scatter_moves(&mut engine, 6);
        assert_eq!(engine.current_player(), Player::Black);
        scatter_moves(&mut engine, 1);
        assert_eq!(engine.current_player(), Player::White);
    }

    #[test]
    fn placing_on_occupied_cell_is_a_no_op() {
        let mut engine = GameEngine::new();
        assert!(engine.place(at(7, 7), Player::Black));
        let before = engine.snapshot();
        assert!(!engine.place(at(7, 7), Player::White));
        let after = engine.snapshot();
        assert_eq!(after.board.get(at(7, 7)), Cell::Black);
        assert_eq!(after.current_player, before.current_player);
        assert_eq!(after.cooldowns, before.cooldowns);
    }

    #[test]
    fn placement_ticks_only_the_movers_cooldowns() {
        let mut engine = GameEngine::new();
        engine.cooldowns.thunder = 3;
        engine.cooldowns.convert = 3;
        engine.place(at(0, 0), Player::Black);
        assert_eq!(engine.cooldowns().thunder, 2);
        assert_eq!(engine.cooldowns().convert, 3);
        engine.place(at(1, 1), Player::White);
        assert_eq!(engine.cooldowns().thunder, 2);
        assert_eq!(engine.cooldowns().convert, 2);
    }

    #[test]
    fn five_in_a_row_wins_and_holds_the_turn() {
        let mut engine = GameEngine::new();
        for c in 0..4 {
            engine.place(at(7, c), Player::Black);
            engine.place(at(10, c), Player::White);
        }
        engine.place(at(7, 4), Player::Black);
        assert_eq!(
            engine.status(),
            GameStatus::Won {
                winner: Player::Black
            }
        );
        // Winner stays current for display.
        assert_eq!(engine.current_player(), Player::Black);
        let line = engine.snapshot().winning_line.expect("winning line");
        for c in 0..5 {
            assert!(line.contains(&at(7, c)));
        }
        // Terminal state refuses further input.
        assert!(!engine.place(at(12, 12), Player::White));
        assert_eq!(engine.click(at(12, 12)), ClickAction::Ignored);
    }

    #[test]
    fn thunder_destroys_a_stone_and_books_cooldowns() {
        let mut engine = GameEngine::new();
        engine.place(at(3, 3), Player::Black); // black
        engine.place(at(9, 9), Player::White); // white, back to black
        assert!(engine.select_skill(SkillType::Thunder));
        assert_eq!(
            engine.use_skill(at(9, 9)),
            SkillOutcome::Resolved { won: false }
        );
        assert_eq!(engine.board().get(at(9, 9)), Cell::Empty);
        assert_eq!(engine.cooldowns().thunder, 5);
        assert!(engine.active_skill().is_none());
        assert_eq!(engine.current_player(), Player::White);
    }

    #[test]
    fn thunder_on_empty_cell_is_rejected_and_retryable() {
        let mut engine = GameEngine::new();
        engine.place(at(3, 3), Player::Black);
        engine.place(at(9, 9), Player::White);
        engine.select_skill(SkillType::Thunder);
        assert_eq!(engine.use_skill(at(0, 0)), SkillOutcome::Rejected);
        // Still armed, no cooldown booked, turn held.
        assert_eq!(engine.active_skill(), Some(SkillType::Thunder));
        assert_eq!(engine.cooldowns().thunder, 0);
        assert_eq!(engine.current_player(), Player::Black);
        // Retry with a valid target succeeds.
        assert_eq!(
            engine.use_skill(at(9, 9)),
            SkillOutcome::Resolved { won: false }
        );
    }

    #[test]
    fn thunder_clears_a_stale_last_move_highlight() {
        let mut engine = GameEngine::new();
        engine.place(at(3, 3), Player::Black);
        engine.place(at(9, 9), Player::White);
        assert_eq!(engine.snapshot().last_move, Some(at(9, 9)));
        engine.select_skill(SkillType::Thunder);
        engine.use_skill(at(9, 9));
        assert_eq!(engine.snapshot().last_move, None);
    }

    #[test]
    fn bomb_clears_the_three_by_three_neighborhood() {
        let mut engine = GameEngine::new();
        engine.place(at(5, 5), Player::Black);
        engine.place(at(4, 4), Player::White);
        engine.place(at(6, 6), Player::Black);
        engine.place(at(12, 12), Player::White);
        engine.cooldowns.thunder = 2;
        engine.select_skill(SkillType::Bomb);
        assert_eq!(
            engine.use_skill(at(5, 5)),
            SkillOutcome::Resolved { won: false }
        );
        for r in 4..=6 {
            for c in 4..=6 {
                assert_eq!(engine.board().get(at(r, c)), Cell::Empty);
            }
        }
        // Outside the blast radius survives.
        assert_eq!(engine.board().get(at(12, 12)), Cell::White);
        assert_eq!(engine.cooldowns().bomb, 10);
        assert_eq!(engine.cooldowns().thunder, 1);
        assert_eq!(engine.current_player(), Player::White);
    }

    #[test]
    fn bomb_clips_at_the_corner() {
        let mut engine = GameEngine::new();
        engine.place(at(0, 0), Player::Black);
        engine.place(at(1, 1), Player::White);
        engine.select_skill(SkillType::Bomb);
        assert_eq!(
            engine.use_skill(at(0, 0)),
            SkillOutcome::Resolved { won: false }
        );
        for r in 0..=1 {
            for c in 0..=1 {
                assert_eq!(engine.board().get(at(r, c)), Cell::Empty);
            }
        }
    }

    #[test]
    fn convert_flips_a_black_stone_and_can_win() {
        let mut engine = GameEngine::new();
        // White builds four in a row; a Black stone sits in the gap.
        let moves = [
            (at(8, 4), at(0, 0)),
            (at(8, 5), at(0, 1)),
            (at(8, 6), at(0, 2)),
            (at(8, 8), at(8, 7)), // black plugs the gap
        ];
        engine.place(at(1, 10), Player::Black);
        for (white, black) in moves {
            engine.place(white, Player::White);
            engine.place(black, Player::Black);
        }
        assert_eq!(engine.current_player(), Player::White);
        engine.select_skill(SkillType::Convert);
        // Converting a White stone is rejected.
        assert_eq!(engine.use_skill(at(8, 4)), SkillOutcome::Rejected);
        // Converting the Black stone in the gap completes the line.
        assert_eq!(
            engine.use_skill(at(8, 7)),
            SkillOutcome::Resolved { won: true }
        );
        assert_eq!(
            engine.status(),
            GameStatus::Won {
                winner: Player::White
            }
        );
        // Win holds the turn but still books the cooldown.
        assert_eq!(engine.current_player(), Player::White);
        assert_eq!(engine.cooldowns().convert, 7);
    }

    #[test]
    fn portal_two_step_moves_a_stone() {
        let mut engine = GameEngine::new();
        engine.place(at(0, 0), Player::Black);
        engine.place(at(9, 9), Player::White);
        engine.place(at(0, 1), Player::Black);
        assert_eq!(engine.current_player(), Player::White);
        engine.select_skill(SkillType::Portal);

        // Step 1 must pick a White stone.
        assert_eq!(engine.use_skill(at(0, 0)), SkillOutcome::Rejected);
        assert_eq!(engine.use_skill(at(9, 9)), SkillOutcome::Pending);
        assert_eq!(engine.selected_cell(), Some(at(9, 9)));
        let board_before = engine.board().clone();

        // Selection recorded, zero board mutation so far.
        assert_eq!(board_before.get(at(9, 9)), Cell::White);

        // Step 2 onto an occupied Black cell is rejected, selection kept.
        assert_eq!(engine.use_skill(at(0, 0)), SkillOutcome::Rejected);
        assert_eq!(engine.selected_cell(), Some(at(9, 9)));

        // Step 2 onto an empty cell moves the stone atomically.
        assert_eq!(
            engine.use_skill(at(4, 4)),
            SkillOutcome::Resolved { won: false }
        );
        assert_eq!(engine.board().get(at(9, 9)), Cell::Empty);
        assert_eq!(engine.board().get(at(4, 4)), Cell::White);
        assert_eq!(engine.snapshot().last_move, Some(at(4, 4)));
        assert_eq!(engine.cooldowns().portal, 4);
        assert!(engine.selected_cell().is_none());
        assert_eq!(engine.current_player(), Player::Black);
    }

    #[test]
    fn portal_reselection_replaces_the_source() {
        let mut engine = GameEngine::new();
        engine.place(at(0, 0), Player::Black);
        engine.place(at(9, 9), Player::White);
        engine.place(at(0, 1), Player::Black);
        engine.place(at(10, 10), Player::White);
        engine.place(at(0, 3), Player::Black);
        engine.select_skill(SkillType::Portal);
        assert_eq!(engine.use_skill(at(9, 9)), SkillOutcome::Pending);
        assert_eq!(engine.use_skill(at(10, 10)), SkillOutcome::Pending);
        assert_eq!(engine.selected_cell(), Some(at(10, 10)));
        // Both stones still on the board.
        assert_eq!(engine.board().get(at(9, 9)), Cell::White);
        assert_eq!(engine.board().get(at(10, 10)), Cell::White);
        engine.use_skill(at(7, 7));
        assert_eq!(engine.board().get(at(10, 10)), Cell::Empty);
        assert_eq!(engine.board().get(at(9, 9)), Cell::White);
    }

    #[test]
    fn cooling_skill_cannot_be_armed_or_used() {
        let mut engine = GameEngine::new();
        engine.place(at(3, 3), Player::Black);
        engine.place(at(9, 9), Player::White);
        engine.cooldowns.thunder = 2;
        let before = engine.snapshot();
        assert!(!engine.select_skill(SkillType::Thunder));
        assert!(engine.active_skill().is_none());
        // Even if armed through a stale remote message, resolution refuses.
        engine.active_skill = Some(SkillType::Thunder);
        assert_eq!(engine.use_skill(at(9, 9)), SkillOutcome::Rejected);
        assert_eq!(engine.cooldowns(), &before.cooldowns);
        assert_eq!(engine.board().get(at(9, 9)), Cell::White);
    }

    #[test]
    fn unowned_skill_cannot_be_armed() {
        let mut engine = GameEngine::new();
        // Black to move; White's skills are not armable.
        assert!(!engine.select_skill(SkillType::Portal));
        assert!(engine.select_skill(SkillType::Bomb));
    }

    #[test]
    fn select_skill_toggles_and_clears_selection() {
        let mut engine = GameEngine::new();
        engine.place(at(0, 0), Player::Black);
        engine.place(at(9, 9), Player::White);
        engine.place(at(0, 1), Player::Black);
        engine.select_skill(SkillType::Portal);
        engine.use_skill(at(9, 9));
        assert!(engine.selected_cell().is_some());
        // Re-selecting disarms and drops the pending selection.
        assert!(engine.select_skill(SkillType::Portal));
        assert!(engine.active_skill().is_none());
        assert!(engine.selected_cell().is_none());
        // Arming the other skill starts from a clean selection.
        assert!(engine.select_skill(SkillType::Convert));
        assert!(engine.selected_cell().is_none());
    }

    #[test]
    fn click_dispatches_between_place_and_skill() {
        let mut engine = GameEngine::new();
        assert_eq!(engine.click(at(7, 7)), ClickAction::Placed);
        assert_eq!(engine.click(at(7, 7)), ClickAction::Ignored);
        engine.click(at(8, 8)); // white
        engine.select_skill(SkillType::Thunder);
        assert_eq!(
            engine.click(at(8, 8)),
            ClickAction::Skill(SkillOutcome::Resolved { won: false })
        );
        // Off-board input is ignored without panicking and never synced.
        assert!(!engine.click(at(15, 15)).should_sync());
    }

    #[test]
    fn reset_restores_the_initial_snapshot_and_bumps_generation() {
        let mut engine = GameEngine::new();
        scatter_moves(&mut engine, 9);
        engine.select_skill(SkillType::Portal);
        let generation = engine.generation();
        engine.reset();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.current_player, Player::Black);
        assert_eq!(snapshot.game_status, GameStatus::Playing);
        assert_eq!(snapshot.board.empty_cells().count(), BOARD_SIZE * BOARD_SIZE);
        assert!(snapshot.active_skill.is_none());
        assert!(snapshot.selected_cell.is_none());
        assert!(snapshot.last_move.is_none());
        assert_eq!(snapshot.cooldowns, CooldownLedger::default());
        assert_eq!(engine.generation(), generation + 1);
    }

    #[test]
    fn snapshot_serializes_camel_case_for_the_frontend() {
        let engine = GameEngine::new();
        let json = serde_json::to_value(engine.snapshot()).expect("serialize");
        assert_eq!(json["currentPlayer"], "black");
        assert_eq!(json["gameStatus"]["status"], "playing");
        assert!(json["winningLine"].is_null());
        assert_eq!(json["cooldowns"]["thunder"], 0);
    }
}
