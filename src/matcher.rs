//! Run detection: three or more equal tiles in a row or column.

use crate::board::{Board, EMPTY, HEIGHT, Tile, WIDTH};
use crate::physics::FallMask;

/// Shortest run that clears.
pub const MIN_RUN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A run of equal tiles starting at its lowest/leftmost cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Run {
    pub row: usize,
    pub col: usize,
    pub orientation: Orientation,
    pub len: usize,
}

impl Run {
    /// Every cell the run covers, as (row, col).
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.len).map(move |i| match self.orientation {
            Orientation::Horizontal => (self.row, self.col + i),
            Orientation::Vertical => (self.row + i, self.col),
        })
    }

    /// Centre of the run in cell units, for placing score popups.
    pub fn center(&self) -> (f32, f32) {
        let mid = (self.len as f32 - 1.0) / 2.0;
        match self.orientation {
            Orientation::Horizontal => (self.row as f32, self.col as f32 + mid),
            Orientation::Vertical => (self.row as f32 + mid, self.col as f32),
        }
    }
}

/// A tile can take part in a run only once it and whatever sits beneath it
/// have stopped moving.
fn settled(board: &Board, mask: &FallMask, row: usize, col: usize) -> Option<Tile> {
    let tile = board.get(row, col);
    if tile == EMPTY {
        return None;
    }
    let airborne = mask.is_falling(row, col) || (row > 0 && mask.is_falling(row - 1, col));
    (!airborne).then_some(tile)
}

/// Length of the run of `tile` starting at `start` and stepping with `cell`.
fn run_length(
    board: &Board,
    mask: &FallMask,
    tile: Tile,
    start: usize,
    limit: usize,
    cell: impl Fn(usize) -> (usize, usize),
) -> usize {
    (start..limit)
        .take_while(|&i| {
            let (row, col) = cell(i);
            settled(board, mask, row, col) == Some(tile)
        })
        .count()
}

/// Every run of [`MIN_RUN`] or more. Horizontal runs are listed first, then
/// vertical. A tile at the crossing of two runs appears in both; the grid is
/// not modified.
pub fn find_matches(board: &Board, mask: &FallMask) -> Vec<Run> {
    let mut runs = Vec::new();

    for row in 0..HEIGHT {
        let mut col = 0;
        while col < WIDTH {
            let Some(tile) = settled(board, mask, row, col) else {
                col += 1;
                continue;
            };
            let len = run_length(board, mask, tile, col, WIDTH, |c| (row, c));
            if len >= MIN_RUN {
                runs.push(Run {
                    row,
                    col,
                    orientation: Orientation::Horizontal,
                    len,
                });
            }
            col += len;
        }
    }

    for col in 0..WIDTH {
        let mut row = 0;
        while row < HEIGHT {
            let Some(tile) = settled(board, mask, row, col) else {
                row += 1;
                continue;
            };
            let len = run_length(board, mask, tile, row, HEIGHT, |r| (r, col));
            if len >= MIN_RUN {
                runs.push(Run {
                    row,
                    col,
                    orientation: Orientation::Vertical,
                    len,
                });
            }
            row += len;
        }
    }

    runs
}
