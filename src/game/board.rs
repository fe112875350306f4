//! Board Model
//!
//! Fixed-size grid of cells stored row-major. A cell is either empty or
//! owned by a player identity. Dimensions never change after creation.

use serde::{Serialize, Deserialize};

use crate::game::shift::{Direction, ShiftPolicy};
use crate::game::state::Identity;

/// Content of one grid position.
pub type Cell = Option<Identity>;

/// The grid of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create an all-empty board.
    ///
    /// # Panics
    ///
    /// If either dimension is zero. Configurations are validated before a
    /// board is ever built.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width >= 1 && height >= 1, "board must be at least 1x1");
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    /// Columns per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Owner of the cell at (`row`, `col`). `None` if empty or off the board.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&Identity> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells[row * self.width + col].as_ref()
    }

    /// Cells of one row, left to right.
    ///
    /// # Panics
    ///
    /// If `row` is out of range.
    pub fn row(&self, row: usize) -> &[Cell] {
        let start = row * self.width;
        &self.cells[start..start + self.width]
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width)
    }

    /// Occupied cells in one row.
    pub fn occupied_in_row(&self, row: usize) -> usize {
        self.row(row).iter().filter(|c| c.is_some()).count()
    }

    /// True iff every cell is owned.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Independent row-major copy of every cell.
    pub fn snapshot(&self) -> Vec<Cell> {
        self.cells.clone()
    }

    /// Push `marker` into `row` under `policy`. Returns the discarded cell.
    pub(crate) fn row_shift(
        &mut self,
        row: usize,
        direction: Direction,
        marker: &Identity,
        policy: ShiftPolicy,
    ) -> Cell {
        assert!(row < self.height, "row {} out of range for height {}", row, self.height);
        let start = row * self.width;
        policy.apply(&mut self.cells[start..start + self.width], direction, marker)
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, row: usize, col: usize, cell: Cell) {
        assert!(row < self.height && col < self.width);
        self.cells[row * self.width + col] = cell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new(4, 3);
        assert_eq!(board.width(), 4);
        assert_eq!(board.height(), 3);
        for row in 0..3 {
            for col in 0..4 {
                assert_eq!(board.get(row, col), None);
            }
        }
        assert!(!board.is_full());
    }

    #[test]
    fn test_get_out_of_bounds() {
        let mut board = Board::new(2, 2);
        board.set(1, 0, Some(Identity::from("A")));
        // (0, 2) would alias (1, 0) in the flat layout
        assert_eq!(board.get(0, 2), None);
        assert_eq!(board.get(2, 0), None);
        assert_eq!(board.get(1, 0), Some(&Identity::from("A")));
    }

    #[test]
    fn test_is_full() {
        let mut board = Board::new(2, 1);
        board.set(0, 0, Some(Identity::from("A")));
        assert!(!board.is_full());
        board.set(0, 1, Some(Identity::from("B")));
        assert!(board.is_full());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut board = Board::new(2, 2);
        board.set(0, 0, Some(Identity::from("A")));

        let mut snapshot = board.snapshot();
        snapshot[0] = None;
        snapshot[3] = Some(Identity::from("B"));

        assert_eq!(board.get(0, 0), Some(&Identity::from("A")));
        assert_eq!(board.get(1, 1), None);
    }

    #[test]
    fn test_row_shift_touches_only_target_row() {
        let mut board = Board::new(3, 2);
        board.set(1, 0, Some(Identity::from("B")));

        board.row_shift(0, Direction::Right, &Identity::from("A"), ShiftPolicy::Conveyor);

        assert_eq!(board.row(0), &[Some(Identity::from("A")), None, None]);
        assert_eq!(board.row(1), &[Some(Identity::from("B")), None, None]);
        assert_eq!(board.occupied_in_row(0), 1);
    }

    #[test]
    fn test_rows_iterates_row_major() {
        let mut board = Board::new(2, 2);
        board.set(1, 1, Some(Identity::from("A")));
        let rows: Vec<&[Cell]> = board.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], Some(Identity::from("A")));
    }

    #[test]
    #[should_panic]
    fn test_zero_width_panics() {
        Board::new(0, 3);
    }
}
