//! Gravity: which tiles are airborne, and the one-row descent step.

use crate::board::{Board, EMPTY, HEIGHT, WIDTH};

/// Airborne flags for every cell above the bottom row, addressed by the same
/// logical rows as [`Board`]. Keeps its own live count of set flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallMask {
    flags: [bool; (HEIGHT - 1) * WIDTH],
    count: usize,
}

impl Default for FallMask {
    fn default() -> Self {
        Self::new()
    }
}

impl FallMask {
    pub fn new() -> Self {
        Self {
            flags: [false; (HEIGHT - 1) * WIDTH],
            count: 0,
        }
    }

    #[inline]
    fn slot(row: usize, col: usize) -> Option<usize> {
        ((1..HEIGHT).contains(&row) && col < WIDTH).then(|| (row - 1) * WIDTH + col)
    }

    /// True if the tile at (`row`, `col`) is sinking. Row 0 and anything out of
    /// range are never airborne.
    #[inline]
    pub fn is_falling(&self, row: usize, col: usize) -> bool {
        Self::slot(row, col).is_some_and(|i| self.flags[i])
    }

    /// Set or clear a flag; returns whether it was set before.
    pub fn put(&mut self, row: usize, col: usize, falling: bool) -> bool {
        let Some(i) = Self::slot(row, col) else {
            return false;
        };
        let was = self.flags[i];
        match (was, falling) {
            (false, true) => self.count += 1,
            (true, false) => self.count -= 1,
            _ => {}
        }
        self.flags[i] = falling;
        was
    }

    #[inline]
    pub fn clear(&mut self, row: usize, col: usize) -> bool {
        self.put(row, col, false)
    }

    /// Number of set flags.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Rebuild the whole mask from the grid, bottom-up. A tile is airborne when the
/// cell beneath it is empty or holds a tile that is itself airborne.
pub fn check_falls(board: &Board, mask: &mut FallMask) {
    for row in 1..HEIGHT {
        for col in 0..WIDTH {
            let suspended = !board.is_empty(row, col)
                && (board.is_empty(row - 1, col) || mask.is_falling(row - 1, col));
            mask.put(row, col, suspended);
        }
    }
}

/// Move every airborne tile down one row. Tiles that reach row 0, or come to
/// rest on a settled tile, drop their flag.
///
/// A flag found over an empty cell is cleared on the spot; the number of such
/// repairs is returned so the caller can report it.
pub fn descend(board: &mut Board, mask: &mut FallMask) -> usize {
    let mut faults = 0;
    for row in 1..HEIGHT {
        for col in 0..WIDTH {
            if board.is_empty(row, col) {
                if mask.clear(row, col) {
                    tracing::warn!(row, col, "empty cell registered as falling");
                    faults += 1;
                }
                continue;
            }
            if !mask.is_falling(row, col) {
                continue;
            }
            let dest = row - 1;
            let tile = board.get(row, col);
            board.set(row, col, EMPTY);
            board.set(dest, col, tile);
            mask.clear(row, col);

            // Rows below were already stepped this pass, so their flags are current.
            let landed =
                dest == 0 || (!board.is_empty(dest - 1, col) && !mask.is_falling(dest - 1, col));
            if !landed {
                mask.put(dest, col, true);
            }
        }
    }
    faults
}

#[cfg(test)]
mod tests {
    use super::*;

    fn true_count(mask: &FallMask) -> usize {
        let mut n = 0;
        for row in 0..HEIGHT {
            for col in 0..WIDTH {
                if mask.is_falling(row, col) {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_put_tracks_count() {
        let mut mask = FallMask::new();
        assert!(!mask.put(3, 2, true));
        assert!(mask.put(3, 2, true));
        assert_eq!(mask.count(), 1);
        assert!(mask.clear(3, 2));
        assert_eq!(mask.count(), 0);
        // Bottom row has no slot.
        assert!(!mask.put(0, 2, true));
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_resting_tiles_do_not_fall() {
        let mut board = Board::new();
        board.set(0, 0, 1);
        board.set(1, 0, 2);
        let mut mask = FallMask::new();
        check_falls(&board, &mut mask);
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_suspension_propagates_up_a_stack() {
        let mut board = Board::new();
        board.set(0, 4, 1);
        board.set(2, 4, 2);
        board.set(3, 4, 3);
        board.set(4, 4, 1);
        let mut mask = FallMask::new();
        check_falls(&board, &mut mask);
        assert!(!mask.is_falling(0, 4));
        assert!(mask.is_falling(2, 4));
        assert!(mask.is_falling(3, 4));
        assert!(mask.is_falling(4, 4));
        assert_eq!(mask.count(), 3);
        assert_eq!(mask.count(), true_count(&mask));
    }

    #[test]
    fn test_check_falls_is_idempotent() {
        let mut board = Board::new();
        board.set(5, 1, 2);
        board.set(6, 1, 3);
        board.set(0, 2, 1);
        let mut mask = FallMask::new();
        check_falls(&board, &mut mask);
        let first = mask.clone();
        check_falls(&board, &mut mask);
        assert_eq!(mask, first);
    }

    #[test]
    fn test_descend_moves_stack_together_and_lands() {
        let mut board = Board::new();
        board.set(0, 0, 1);
        board.set(3, 0, 2);
        board.set(4, 0, 3);
        let mut mask = FallMask::new();
        check_falls(&board, &mut mask);
        assert_eq!(mask.count(), 2);

        assert_eq!(descend(&mut board, &mut mask), 0);
        assert_eq!(board.get(2, 0), 2);
        assert_eq!(board.get(3, 0), 3);
        assert!(board.is_empty(4, 0));
        assert_eq!(mask.count(), 2);

        descend(&mut board, &mut mask);
        assert_eq!(board.get(1, 0), 2);
        assert_eq!(board.get(2, 0), 3);
        assert_eq!(mask.count(), 0);
        assert_eq!(board.tile_count(), 3);
    }

    #[test]
    fn test_descend_to_bottom_row() {
        let mut board = Board::new();
        board.set(1, 7, 4);
        let mut mask = FallMask::new();
        check_falls(&board, &mut mask);
        descend(&mut board, &mut mask);
        assert_eq!(board.get(0, 7), 4);
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_descend_repairs_flag_over_empty_cell() {
        let mut board = Board::new();
        let mut mask = FallMask::new();
        mask.put(6, 3, true);
        assert_eq!(descend(&mut board, &mut mask), 1);
        assert_eq!(mask.count(), 0);
        assert!(!mask.is_falling(6, 3));
    }
}
