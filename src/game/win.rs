//! Win Detection
//!
//! Full-board scan for a run of same-owner cells. Boards are small, so the
//! whole grid is rescanned after every move instead of tracking runs
//! incrementally. A shift moves a whole row, which can complete lines that do
//! not pass through the inserted marker.

use crate::game::board::Board;
use crate::game::state::Identity;

/// Scan steps as (row delta, column delta), in the order they are checked:
/// horizontal, vertical, diagonal, anti-diagonal.
pub const LINE_STEPS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// A completed line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WinLine {
    /// Identity owning every cell of the line.
    pub owner: Identity,
    /// First cell of the run as (row, col).
    pub start: (usize, usize),
    /// Step between consecutive cells, one of [`LINE_STEPS`].
    pub step: (isize, isize),
    /// Cells in the run. At least the line target.
    pub length: usize,
}

/// First line of `line_target` or more cells, in row-major then step order.
pub fn find_line(board: &Board, line_target: usize) -> Option<WinLine> {
    scan(board, line_target, |_| true)
}

/// First line owned by `owner`.
pub fn find_line_for(board: &Board, line_target: usize, owner: &Identity) -> Option<WinLine> {
    scan(board, line_target, |candidate| candidate == owner)
}

fn scan(
    board: &Board,
    line_target: usize,
    accept: impl Fn(&Identity) -> bool,
) -> Option<WinLine> {
    for row in 0..board.height() {
        for col in 0..board.width() {
            let Some(owner) = board.get(row, col) else {
                continue;
            };
            if !accept(owner) {
                continue;
            }

            for step in LINE_STEPS {
                let length = run_length(board, row, col, step, owner);
                if length >= line_target {
                    return Some(WinLine {
                        owner: owner.clone(),
                        start: (row, col),
                        step,
                        length,
                    });
                }
            }
        }
    }

    None
}

/// Consecutive cells owned by `owner`, starting at (`row`, `col`) inclusive.
fn run_length(
    board: &Board,
    row: usize,
    col: usize,
    (dr, dc): (isize, isize),
    owner: &Identity,
) -> usize {
    let mut length = 0;
    let (mut r, mut c) = (row as isize, col as isize);

    while r >= 0 && c >= 0 && board.get(r as usize, c as usize) == Some(owner) {
        length += 1;
        r += dr;
        c += dc;
    }

    length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from(rows: &[&str]) -> Board {
        let height = rows.len();
        let width = rows[0].len();
        let mut board = Board::new(width, height);
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                if ch != '.' {
                    board.set(r, c, Some(Identity::new(ch.to_string())));
                }
            }
        }
        board
    }

    #[test]
    fn test_empty_board_has_no_line() {
        assert_eq!(find_line(&Board::new(4, 4), 3), None);
    }

    #[test]
    fn test_horizontal_line() {
        let board = board_from(&["....", ".AAA", "....", "...."]);
        let line = find_line(&board, 3).unwrap();
        assert_eq!(line.owner, Identity::from("A"));
        assert_eq!(line.start, (1, 1));
        assert_eq!(line.step, (0, 1));
        assert_eq!(line.length, 3);
    }

    #[test]
    fn test_vertical_line() {
        let board = board_from(&["B...", "B...", "B...", "...."]);
        let line = find_line(&board, 3).unwrap();
        assert_eq!(line.owner, Identity::from("B"));
        assert_eq!(line.step, (1, 0));
    }

    #[test]
    fn test_diagonal_line() {
        let board = board_from(&["A...", ".A..", "..A.", "...."]);
        let line = find_line(&board, 3).unwrap();
        assert_eq!(line.start, (0, 0));
        assert_eq!(line.step, (1, 1));
    }

    #[test]
    fn test_anti_diagonal_line() {
        let board = board_from(&["...A", "..A.", ".A..", "...."]);
        let line = find_line(&board, 3).unwrap();
        assert_eq!(line.start, (0, 3));
        assert_eq!(line.step, (1, -1));
    }

    #[test]
    fn test_line_one_short() {
        let board = board_from(&["AA.A", "....", "....", "...."]);
        assert_eq!(find_line(&board, 3), None);
    }

    #[test]
    fn test_mixed_owners_break_run() {
        let board = board_from(&["AABA", "....", "....", "...."]);
        assert_eq!(find_line(&board, 3), None);
    }

    #[test]
    fn test_longer_run_qualifies() {
        let board = board_from(&["AAAA", "....", "....", "...."]);
        let line = find_line(&board, 3).unwrap();
        assert_eq!(line.length, 4);
    }

    #[test]
    fn test_row_major_scan_order() {
        let board = board_from(&["...", "BBB", "AAA"]);
        let line = find_line(&board, 3).unwrap();
        assert_eq!(line.owner, Identity::from("B"));
    }

    #[test]
    fn test_find_line_for_owner() {
        let board = board_from(&["...", "BBB", "AAA"]);
        let line = find_line_for(&board, 3, &Identity::from("A")).unwrap();
        assert_eq!(line.owner, Identity::from("A"));
        assert_eq!(line.start, (2, 0));
        assert_eq!(find_line_for(&board, 3, &Identity::from("C")), None);
    }

    #[test]
    fn test_runs_do_not_wrap_rows() {
        // Flat layout would read "AA" + "A" across the row boundary.
        let board = board_from(&[".AA", "A..", "..."]);
        assert_eq!(find_line(&board, 3), None);
    }

    #[test]
    fn test_single_column_board() {
        let board = board_from(&["A", "B", "A"]);
        assert_eq!(find_line(&board, 2), None);
        let board = board_from(&["A", "A", "B"]);
        assert_eq!(find_line(&board, 2).unwrap().step, (1, 0));
    }
}
