//! Win detection for five-in-a-row.

use super::board::{Board, Coord, BOARD_SIZE};
use super::Player;

/// How many contiguous stones make a winning line.
pub const LINE_SIZE: usize = 5;

/// The four line directions; the opposite arm of each is walked as well.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Check whether `player` has five-in-a-row through `at`.
///
/// Pure function of its inputs. For each direction, walks up to four steps
/// along both arms collecting contiguous cells owned by `player` (stopping at
/// the first mismatch or board edge), always including `at` itself. The first
/// direction whose collected line reaches [`LINE_SIZE`] wins; its coordinates
/// are returned origin-first for highlighting, so the line is collinear but
/// not sorted.
pub fn check_win(board: &Board, at: Coord, player: Player) -> Option<Vec<Coord>> {
    let owned = player.into();
    for (dr, dc) in DIRECTIONS {
        let mut line = vec![at];
        for sign in [1isize, -1] {
            for step in 1..LINE_SIZE as isize {
                let r = at.row as isize + dr * sign * step;
                let c = at.col as isize + dc * sign * step;
                if r < 0 || r >= BOARD_SIZE as isize || c < 0 || c >= BOARD_SIZE as isize {
                    break;
                }
                let next = Coord::new(r as usize, c as usize);
                if board.get(next) != owned {
                    break;
                }
                line.push(next);
            }
        }
        if line.len() >= LINE_SIZE {
            return Some(line);
        }
    }
    None
}
