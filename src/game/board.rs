use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::Player;

/// Square grid, so this is the length of one row/column.
pub const BOARD_SIZE: usize = 15;

#[derive(Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Black,
    White,
}

impl Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Black => write!(f, "X"),
            Self::White => write!(f, "O"),
            Self::Empty => write!(f, "."),
        }
    }
}

impl From<Player> for Cell {
    fn from(player: Player) -> Self {
        match player {
            Player::Black => Cell::Black,
            Player::White => Cell::White,
        }
    }
}

/// A single board position. Row and column are each in `[0, BOARD_SIZE)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Basic board structure, 15x15 grid.
///
/// Callers validate user-originated coordinates with [`Board::contains`]
/// before indexing; out-of-range access is a programming error and panics.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board(Vec<Cell>);

impl Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // print the board as a grid
        for row in self.0.chunks(BOARD_SIZE) {
            for cell in row {
                write!(f, "{:?}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create a new empty gameboard
    pub fn new() -> Self {
        Self(vec![Cell::Empty; BOARD_SIZE * BOARD_SIZE])
    }
    /// Get the cell at a particular position
    pub fn get(&self, at: Coord) -> Cell {
        self.0[at.col + at.row * BOARD_SIZE]
    }
    /// Set the cell at a particular position
    pub fn set(&mut self, at: Coord, cell: Cell) {
        self.0[at.col + at.row * BOARD_SIZE] = cell;
    }
    /// Empty the whole board
    pub fn clear(&mut self) {
        self.0.fill(Cell::Empty);
    }
    /// Whether the position is on the board
    pub fn contains(&self, at: Coord) -> bool {
        at.row < BOARD_SIZE && at.col < BOARD_SIZE
    }
    /// Whether the position is on the board and unoccupied
    pub fn is_empty(&self, at: Coord) -> bool {
        self.contains(at) && self.get(at) == Cell::Empty
    }
    /// First unoccupied position in row-major scan order, if any.
    ///
    /// This is the deterministic fallback move for the automated opponent.
    pub fn first_empty(&self) -> Option<Coord> {
        self.0
            .iter()
            .position(|cell| *cell == Cell::Empty)
            .map(|i| Coord::new(i / BOARD_SIZE, i % BOARD_SIZE))
    }
    /// All unoccupied positions in row-major scan order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Empty)
            .map(|(i, _)| Coord::new(i / BOARD_SIZE, i % BOARD_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_empty() {
        let board = Board::new();
        assert_eq!(board.empty_cells().count(), BOARD_SIZE * BOARD_SIZE);
    }

    #[test]
    fn set_and_get() {
        let mut board = Board::new();
        let at = Coord::new(7, 7);
        board.set(at, Cell::Black);
        assert_eq!(board.get(at), Cell::Black);
        assert!(!board.is_empty(at));
        assert!(board.is_empty(Coord::new(7, 8)));
    }

    #[test]
    fn clear_empties_every_cell() {
        let mut board = Board::new();
        board.set(Coord::new(0, 0), Cell::White);
        board.set(Coord::new(14, 14), Cell::Black);
        board.clear();
        assert_eq!(board.empty_cells().count(), BOARD_SIZE * BOARD_SIZE);
    }

    #[test]
    fn contains_rejects_out_of_range() {
        let board = Board::new();
        assert!(board.contains(Coord::new(14, 14)));
        assert!(!board.contains(Coord::new(15, 0)));
        assert!(!board.contains(Coord::new(0, 15)));
    }

    #[test]
    fn first_empty_scans_row_major() {
        let mut board = Board::new();
        assert_eq!(board.first_empty(), Some(Coord::new(0, 0)));
        for c in 0..BOARD_SIZE {
            board.set(Coord::new(0, c), Cell::Black);
        }
        assert_eq!(board.first_empty(), Some(Coord::new(1, 0)));
    }
}
