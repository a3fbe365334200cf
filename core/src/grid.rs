use alloc::vec::Vec;
use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{BOX_SIZE, Coord, Coord2, Digit, GRID_SIZE, GameError, Result, ToNdIndex};

/// Ascending list of digits that do not conflict with a cell's row, column,
/// or box. At most nine entries, so it never spills to the heap.
pub type CandidateList = SmallVec<[Digit; 9]>;

/// A 9x9 Sudoku grid. Construction goes through shape validation, so every
/// value in an existing `Grid` is a digit in `0..=9`.
///
/// On the wire a grid is nine rows of nine integers; deserializing anything
/// else fails as a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Digit>>", into = "Vec<Vec<Digit>>")]
pub struct Grid(Array2<Digit>);

impl Grid {
    pub fn empty() -> Self {
        Self(Array2::default((GRID_SIZE as usize, GRID_SIZE as usize)))
    }

    pub fn validate_coords(coords: Coord2) -> Result<Coord2> {
        if coords.0 < GRID_SIZE && coords.1 < GRID_SIZE {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn digit_at(&self, coords: Coord2) -> Digit {
        self.0[coords.to_nd_index()]
    }

    pub fn is_empty_at(&self, coords: Coord2) -> bool {
        self.digit_at(coords) == 0
    }

    pub(crate) fn set_digit(&mut self, coords: Coord2, digit: Digit) {
        self.0[coords.to_nd_index()] = digit;
    }

    /// Digits that could currently be placed at `coords` without duplicating
    /// a value in its row, column, or 3x3 box, in ascending order.
    ///
    /// This is a local constraint check only: a candidate is not guaranteed
    /// to lead to a solvable completion, and an empty result is a legitimate
    /// board state, not an error.
    pub fn candidates_at(&self, coords: Coord2) -> CandidateList {
        (1..=GRID_SIZE)
            .filter(|&digit| !self.conflicts_at(coords, digit))
            .collect()
    }

    /// Whether placing `digit` at `coords` would duplicate a value already
    /// present in the same row, column, or box. The cell itself is skipped so
    /// a digit never conflicts with its own current value.
    fn conflicts_at(&self, coords: Coord2, digit: Digit) -> bool {
        let (row, col) = coords;

        for c in 0..GRID_SIZE {
            if c != col && self.digit_at((row, c)) == digit {
                return true;
            }
        }

        for r in 0..GRID_SIZE {
            if r != row && self.digit_at((r, col)) == digit {
                return true;
            }
        }

        let box_row = row - row % BOX_SIZE;
        let box_col = col - col % BOX_SIZE;
        for r in box_row..box_row + BOX_SIZE {
            for c in box_col..box_col + BOX_SIZE {
                if (r, c) != coords && self.digit_at((r, c)) == digit {
                    return true;
                }
            }
        }

        false
    }
}

impl Index<Coord2> for Grid {
    type Output = Digit;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.0[coords.to_nd_index()]
    }
}

impl TryFrom<Vec<Vec<Digit>>> for Grid {
    type Error = GameError;

    fn try_from(rows: Vec<Vec<Digit>>) -> Result<Self> {
        if rows.len() != GRID_SIZE as usize {
            return Err(GameError::MalformedGrid);
        }

        let mut cells = Vec::with_capacity((GRID_SIZE as usize).pow(2));
        for row in &rows {
            if row.len() != GRID_SIZE as usize {
                return Err(GameError::MalformedGrid);
            }
            for &digit in row {
                if digit > GRID_SIZE {
                    return Err(GameError::MalformedGrid);
                }
                cells.push(digit);
            }
        }

        let cells = Array2::from_shape_vec((GRID_SIZE as usize, GRID_SIZE as usize), cells)
            .map_err(|_| GameError::MalformedGrid)?;
        Ok(Self(cells))
    }
}

impl From<Grid> for Vec<Vec<Digit>> {
    fn from(grid: Grid) -> Self {
        grid.0.rows().into_iter().map(|row| row.to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn grid(rows: [[Digit; 9]; 9]) -> Grid {
        Grid::try_from(rows.iter().map(|row| row.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn candidates_exclude_row_column_and_box_digits() {
        let mut rows = [[0; 9]; 9];
        rows[0][3] = 4; // same row
        rows[5][0] = 7; // same column
        rows[1][1] = 2; // same box
        let grid = grid(rows);

        let candidates = grid.candidates_at((0, 0));

        assert_eq!(candidates.as_slice(), &[1, 3, 5, 6, 8, 9]);
    }

    #[test]
    fn candidates_are_ascending_and_distinct() {
        let grid = grid([[0; 9]; 9]);

        let candidates = grid.candidates_at((4, 4));

        assert_eq!(candidates.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn cell_does_not_conflict_with_its_own_value() {
        let mut rows = [[0; 9]; 9];
        rows[2][2] = 5;
        let grid = grid(rows);

        assert!(grid.candidates_at((2, 2)).contains(&5));
    }

    #[test]
    fn fully_constrained_cell_has_no_candidates() {
        let mut rows = [[0; 9]; 9];
        // Digits 1-6 in row 8, 7-8 in column 0, 9 in the bottom-left box.
        for (c, digit) in (1..=6).enumerate() {
            rows[8][c + 1] = digit;
        }
        rows[0][0] = 7;
        rows[1][0] = 8;
        rows[7][2] = 9;
        let grid = grid(rows);

        assert!(grid.candidates_at((8, 0)).is_empty());
    }

    #[test]
    fn wrong_row_count_is_rejected() {
        let rows: Vec<Vec<Digit>> = (0..8).map(|_| vec![0; 9]).collect();

        assert_eq!(Grid::try_from(rows), Err(GameError::MalformedGrid));
    }

    #[test]
    fn wrong_row_length_is_rejected() {
        let mut rows: Vec<Vec<Digit>> = (0..9).map(|_| vec![0; 9]).collect();
        rows[4].pop();

        assert_eq!(Grid::try_from(rows), Err(GameError::MalformedGrid));
    }

    #[test]
    fn out_of_range_digit_is_rejected() {
        let mut rows: Vec<Vec<Digit>> = (0..9).map(|_| vec![0; 9]).collect();
        rows[0][0] = 10;

        assert_eq!(Grid::try_from(rows), Err(GameError::MalformedGrid));
    }

    #[test]
    fn serializes_as_nine_rows_of_nine() {
        let mut rows = [[0; 9]; 9];
        rows[0][1] = 3;
        let json = serde_json::to_value(grid(rows)).unwrap();

        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 9);
        assert_eq!(array[0].as_array().unwrap()[1], 3);
    }

    #[test]
    fn deserializing_malformed_grid_fails() {
        let result: core::result::Result<Grid, _> = serde_json::from_str("[[1,2,3]]");

        assert!(result.is_err());
    }
}
