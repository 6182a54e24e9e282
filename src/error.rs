//! Error types for the simulation core.

use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("fall time must be at least one tick")]
    ZeroFallTime,
    #[error("swap time must be at least one tick")]
    ZeroSwapTime,
}

/// Why a swap request was dropped. The game state is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SwapRejected {
    #[error("the game is over")]
    GameOver,
    #[error("a swap is already in progress")]
    AlreadySwapping,
    #[error("swap target ({row}, {col}) is outside the field")]
    OutOfBounds { row: usize, col: usize },
    #[error("both cells are empty")]
    BothEmpty,
    #[error("a tile above the pair is still falling")]
    AboveFalling,
}

/// The row about to enter the field has nowhere to go: the top row is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stack reached the top row")]
pub struct StackOverflow;
