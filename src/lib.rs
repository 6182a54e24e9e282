//! Tilerise — rising-stack match-three simulation core.
//!
//! The library owns the whole game state and advances it one frame at a time
//! through [`Game::tick`]. Front ends read tiles, animation phases and counters
//! through the accessors on [`Game`] and feed input through
//! [`Game::request_swap`].

pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod matcher;
pub mod physics;
pub mod scoring;
pub mod swap;

pub use board::{Board, EMPTY, HEIGHT, Tile, WIDTH};
pub use config::GameConfig;
pub use error::{ConfigError, StackOverflow, SwapRejected};
pub use game::{Game, GameEvent};
pub use matcher::{Orientation, Run};
pub use swap::SwapView;
