//! Two-cell swap: validation, timing and the final exchange.

use crate::board::{Board, HEIGHT, WIDTH};
use crate::error::SwapRejected;
use crate::physics::FallMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapState {
    #[default]
    Idle,
    Swapping {
        row: usize,
        /// Left cell of the pair.
        col: usize,
        elapsed: u32,
    },
}

/// Read-only view of an in-flight swap for animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapView {
    pub row: usize,
    pub col: usize,
    /// 0.0 at start, approaching 1.0 just before the tiles exchange.
    pub fraction: f32,
}

impl SwapState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Swapping { .. })
    }

    pub fn view(&self, swap_time: u32) -> Option<SwapView> {
        match *self {
            Self::Idle => None,
            Self::Swapping { row, col, elapsed } => Some(SwapView {
                row,
                col,
                fraction: elapsed as f32 / swap_time as f32,
            }),
        }
    }
}

/// Check whether the pair (`row`, `col`)/(`row`, `col + 1`) may start swapping.
pub fn validate(
    board: &Board,
    mask: &FallMask,
    state: SwapState,
    row: usize,
    col: usize,
) -> Result<(), SwapRejected> {
    if state.is_active() {
        return Err(SwapRejected::AlreadySwapping);
    }
    if row >= HEIGHT || col >= WIDTH - 1 {
        return Err(SwapRejected::OutOfBounds { row, col });
    }
    if board.is_empty(row, col) && board.is_empty(row, col + 1) {
        return Err(SwapRejected::BothEmpty);
    }
    if mask.is_falling(row + 1, col) || mask.is_falling(row + 1, col + 1) {
        return Err(SwapRejected::AboveFalling);
    }
    Ok(())
}

/// Exchange the pair. A cell left empty loses any falling flag it carried.
pub fn exchange(board: &mut Board, mask: &mut FallMask, row: usize, col: usize) {
    let left = board.get(row, col);
    let right = board.get(row, col + 1);
    board.set(row, col, right);
    board.set(row, col + 1, left);
    for c in [col, col + 1] {
        if board.is_empty(row, c) {
            mask.clear(row, c);
        }
    }
}
