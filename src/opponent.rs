//! The automated-opponent collaborator.
//!
//! The engine has zero dependency on any particular move-selection
//! implementation: anything that can asynchronously turn a board into a
//! coordinate plugs in through [`MoveSuggester`]. The driver treats the
//! suggester as untrusted: its coordinate is re-validated against the
//! current board, and a failure or illegal target falls back to the first
//! empty cell in row-major order. A response that arrives after a reset is
//! discarded by comparing engine generations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use n0_future::boxed::BoxFuture;
use rand::seq::IteratorRandom;
use tokio::sync::Mutex as TokioMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::game::{Board, Coord, GameEngine, Player};

/// Asynchronous move-selection collaborator.
///
/// Implementations must produce a coordinate for `player` on `board`; they
/// are not required to produce a *legal* one, the driver re-checks.
pub trait MoveSuggester: Send + Sync + 'static {
    fn suggest(&self, board: Board, player: Player) -> BoxFuture<Result<Coord>>;
}

/// The deterministic fallback as a suggester in its own right: first empty
/// cell in row-major scan order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstEmptySuggester;

impl MoveSuggester for FirstEmptySuggester {
    fn suggest(&self, board: Board, _player: Player) -> BoxFuture<Result<Coord>> {
        Box::pin(async move { board.first_empty().ok_or_else(|| anyhow!("board is full")) })
    }
}

/// Picks a uniformly random empty cell.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSuggester;

impl MoveSuggester for RandomSuggester {
    fn suggest(&self, board: Board, _player: Player) -> BoxFuture<Result<Coord>> {
        Box::pin(async move {
            board
                .empty_cells()
                .choose(&mut rand::thread_rng())
                .ok_or_else(|| anyhow!("board is full"))
        })
    }
}

/// Gates and applies suggested moves for the side the computer plays.
pub struct OpponentDriver {
    suggester: Box<dyn MoveSuggester>,
    player: Player,
    thinking: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl OpponentDriver {
    pub fn new(suggester: impl MoveSuggester, player: Player) -> Self {
        Self {
            suggester: Box::new(suggester),
            player,
            thinking: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Whether a move request is currently outstanding. The caller blocks
    /// board input while this is set.
    pub fn is_thinking(&self) -> bool {
        self.thinking.load(Ordering::SeqCst)
    }

    /// Abort the outstanding request, if any. Called on reset and mode
    /// change so a stale response cannot race a fresh game.
    pub fn cancel_outstanding(&self) {
        let mut guard = self.cancel.lock().expect("poisoned");
        guard.cancel();
        *guard = CancellationToken::new();
    }

    /// Request, validate and apply one move for the computer's side.
    ///
    /// Returns whether a stone was placed. At most one request is in flight:
    /// re-entrant calls return `false` immediately.
    pub async fn take_turn(&self, engine: &TokioMutex<GameEngine>) -> Result<bool> {
        if self.thinking.swap(true, Ordering::SeqCst) {
            debug!("move request already outstanding");
            return Ok(false);
        }
        let result = self.drive(engine).await;
        self.thinking.store(false, Ordering::SeqCst);
        result
    }

    async fn drive(&self, engine: &TokioMutex<GameEngine>) -> Result<bool> {
        let token = self.cancel.lock().expect("poisoned").clone();
        // Snapshot what the suggester needs, then release the engine while
        // the request is in flight.
        let (board, generation) = {
            let engine = engine.lock().await;
            if !engine.status().is_playing() || engine.current_player() != self.player {
                return Ok(false);
            }
            (engine.board().clone(), engine.generation())
        };

        let suggestion = tokio::select! {
            _ = token.cancelled() => {
                debug!("opponent move request cancelled");
                return Ok(false);
            }
            suggestion = self.suggester.suggest(board, self.player) => suggestion,
        };

        let mut engine = engine.lock().await;
        if engine.generation() != generation {
            debug!("discarding stale opponent response from an earlier game");
            return Ok(false);
        }
        if !engine.status().is_playing() || engine.current_player() != self.player {
            return Ok(false);
        }
        let target = match suggestion {
            Ok(at) if engine.board().is_empty(at) => at,
            Ok(at) => {
                warn!(?at, "opponent suggested an illegal target, using fallback");
                self.fallback(engine.board())?
            }
            Err(err) => {
                warn!("opponent request failed, using fallback: {err}");
                self.fallback(engine.board())?
            }
        };
        Ok(engine.place(target, self.player))
    }

    fn fallback(&self, board: &Board) -> Result<Coord> {
        board.first_empty().ok_or_else(|| anyhow!("board is full"))
    }
}
