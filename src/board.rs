//! Tile grid stored as a ring of rows, plus the incoming-row buffer.
//!
//! Rows are addressed logically from the bottom (row 0 is the lowest visible
//! row). A new row enters by moving `bottom` back one physical slot, so the
//! existing tiles never move in memory.

use crate::error::StackOverflow;
use rand::Rng;

pub const HEIGHT: usize = 20;
pub const WIDTH: usize = 10;

/// Tile colour code; 0 is empty, 1..=6 are colours.
pub type Tile = u8;
pub const EMPTY: Tile = 0;

/// Most colours a field can hold.
pub const MAX_COLORS: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Tile; HEIGHT * WIDTH],
    /// Physical row currently acting as logical row 0.
    bottom: usize,
    incoming: [Tile; WIDTH],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Empty field with an empty incoming row.
    pub fn new() -> Self {
        Self {
            cells: [EMPTY; HEIGHT * WIDTH],
            bottom: 0,
            incoming: [EMPTY; WIDTH],
        }
    }

    #[inline]
    fn physical_row(&self, row: usize) -> usize {
        (row + self.bottom) % HEIGHT
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < HEIGHT && col < WIDTH);
        self.physical_row(row) * WIDTH + col
    }

    /// Tile at logical `row` (0 = bottom) and `col`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Tile {
        self.cells[self.index(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, tile: Tile) {
        let i = self.index(row, col);
        self.cells[i] = tile;
    }

    #[inline]
    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        self.get(row, col) == EMPTY
    }

    pub fn row_is_occupied(&self, row: usize) -> bool {
        (0..WIDTH).any(|col| !self.is_empty(row, col))
    }

    pub fn row_is_full(&self, row: usize) -> bool {
        (0..WIDTH).all(|col| !self.is_empty(row, col))
    }

    /// Lowest logical row with at least one gap; `HEIGHT` if every row is full.
    pub fn lowest_open_row(&self) -> usize {
        (0..HEIGHT)
            .find(|&row| !self.row_is_full(row))
            .unwrap_or(HEIGHT)
    }

    /// Physical slot of logical row 0. Exposed for diagnostics.
    pub fn bottom_pointer(&self) -> usize {
        self.bottom
    }

    pub fn incoming(&self) -> &[Tile; WIDTH] {
        &self.incoming
    }

    pub fn set_incoming(&mut self, row: [Tile; WIDTH]) {
        self.incoming = row;
    }

    /// Reroll the incoming row using `colors` distinct tile codes.
    pub fn roll_incoming<R: Rng + ?Sized>(&mut self, rng: &mut R, colors: u8) {
        let colors = colors.clamp(1, MAX_COLORS);
        for tile in &mut self.incoming {
            *tile = rng.gen_range(1..=colors);
        }
    }

    /// Push the incoming row in as the new logical row 0; every existing row
    /// moves up one index. Fails without touching the grid when the top row is
    /// occupied, since its slot is the one that would be recycled.
    pub fn advance_row(&mut self) -> Result<(), StackOverflow> {
        if self.row_is_occupied(HEIGHT - 1) {
            return Err(StackOverflow);
        }
        self.bottom = (self.bottom + HEIGHT - 1) % HEIGHT;
        for col in 0..WIDTH {
            let tile = self.incoming[col];
            self.set(0, col, tile);
        }
        Ok(())
    }

    /// Number of non-empty cells.
    pub fn tile_count(&self) -> usize {
        self.cells.iter().filter(|&&t| t != EMPTY).count()
    }
}
