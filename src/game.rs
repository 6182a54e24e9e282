//! Game state: field, falling mask, swap, score, level and the per-frame tick.

use crate::board::{Board, EMPTY, HEIGHT, Tile, WIDTH};
use crate::config::GameConfig;
use crate::error::{ConfigError, SwapRejected};
use crate::matcher::{self, Run};
use crate::physics::{self, FallMask};
use crate::scoring;
use crate::swap::{self, SwapState, SwapView};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Something the front end may want to animate. Queued during [`Game::tick`]
/// and collected with [`Game::drain_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    MatchResolved { run: Run, points: u64 },
    TileWiped { row: usize, col: usize, points: u64 },
    LevelUp { level: u32 },
    RowAdvanced,
    GameOver,
}

/// One play session. Construct at session start, call [`Game::tick`] once per
/// frame, and check [`Game::is_dead`] afterwards.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    mask: FallMask,
    rng: StdRng,
    fall_time: u32,
    swap_time: u32,
    score: u64,
    level: u32,
    /// Clears left before the next level; level-up fires once it is negative.
    norma: i64,
    /// Fraction of the next row already risen, in [0, 1).
    progress: f64,
    combo: u32,
    fall_tick: u32,
    swap: SwapState,
    dead: bool,
    faults: usize,
    events: Vec<GameEvent>,
}

impl Game {
    pub fn new(config: &GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let mut game = Self {
            board: Board::new(),
            mask: FallMask::new(),
            rng,
            fall_time: config.fall_time,
            swap_time: config.swap_time,
            score: 0,
            level: config.initial_level,
            norma: config.initial_norma,
            progress: 0.0,
            combo: 0,
            fall_tick: 0,
            swap: SwapState::Idle,
            dead: false,
            faults: 0,
            events: Vec::new(),
        };
        game.roll_incoming();
        Ok(game)
    }

    /// Advance one frame.
    ///
    /// The event queue only holds what this tick produced: anything not taken
    /// with [`Game::drain_events`] since the previous tick is discarded.
    pub fn tick(&mut self) {
        self.events.clear();
        if self.dead {
            return;
        }

        if self.mask.count() > 0 && !self.swap.is_active() {
            if self.fall_tick > 0 && self.fall_tick % self.fall_time == 0 {
                self.step_fall();
            }
            self.fall_tick += 1;
        }

        if let SwapState::Swapping { row, col, elapsed } = self.swap {
            let elapsed = elapsed + 1;
            if elapsed >= self.swap_time {
                swap::exchange(&mut self.board, &mut self.mask, row, col);
                self.swap = SwapState::Idle;
                tracing::debug!(row, col, "swap resolved");
                self.check_falls();
            } else {
                self.swap = SwapState::Swapping { row, col, elapsed };
            }
        }

        if !self.swap.is_active() && self.mask.count() == 0 {
            self.progress += scoring::rise_per_tick(self.level);
            if self.progress >= 1.0 {
                self.progress -= 1.0;
                self.advance_row();
                if self.dead {
                    return;
                }
            }
            if self.resolve_matches() {
                self.combo += 1;
            }
        }

        if self.norma < 0 {
            self.level_up();
        }
    }

    /// Start swapping the pair at `row`, `col` and `col + 1`. On `Err` nothing
    /// changes.
    pub fn request_swap(&mut self, row: usize, col: usize) -> Result<(), SwapRejected> {
        if self.dead {
            return Err(SwapRejected::GameOver);
        }
        swap::validate(&self.board, &self.mask, self.swap, row, col)
            .inspect_err(|reason| tracing::debug!(row, col, %reason, "swap rejected"))?;
        self.swap = SwapState::Swapping {
            row,
            col,
            elapsed: 0,
        };
        // A swap during a cascade keeps the chain alive.
        if self.mask.count() == 0 {
            self.combo = 0;
        }
        Ok(())
    }

    /// Recompute the falling mask from the grid and restart the fall timer.
    pub fn check_falls(&mut self) {
        physics::check_falls(&self.board, &mut self.mask);
        self.fall_tick = 0;
    }

    /// Push the incoming row in at the bottom. Sets `dead` instead when the
    /// stack has reached the top.
    pub fn advance_row(&mut self) {
        if self.dead {
            return;
        }
        match self.board.advance_row() {
            Ok(()) => {
                self.roll_incoming();
                self.combo = 0;
                self.events.push(GameEvent::RowAdvanced);
                tracing::trace!(bottom = self.board.bottom_pointer(), "row advanced");
            }
            Err(err) => {
                self.dead = true;
                self.swap = SwapState::Idle;
                self.events.push(GameEvent::GameOver);
                tracing::info!(score = self.score, level = self.level, "game over: {err}");
            }
        }
    }

    fn roll_incoming(&mut self) {
        let colors = scoring::color_count(self.level);
        self.board.roll_incoming(&mut self.rng, colors);
    }

    fn step_fall(&mut self) {
        let repaired = physics::descend(&mut self.board, &mut self.mask);
        self.faults += repaired;
    }

    /// Score and clear every current run. Returns true if anything cleared.
    fn resolve_matches(&mut self) -> bool {
        let runs = matcher::find_matches(&self.board, &self.mask);
        for &run in &runs {
            let points = scoring::match_score(run.len, self.combo, self.level);
            self.score += points;
            self.norma -= run.len as i64;
            self.events.push(GameEvent::MatchResolved { run, points });
        }
        // Clear only after scoring so crossing runs both count in full.
        for run in &runs {
            for (row, col) in run.cells() {
                self.board.set(row, col, EMPTY);
            }
        }
        self.check_falls();
        !runs.is_empty()
    }

    /// Wipe everything from the lowest row with a gap upward, paying a flat
    /// bonus per tile, then raise the level and the norma.
    fn level_up(&mut self) {
        let lowest = self.board.lowest_open_row();
        let bonus = scoring::wipe_bonus(lowest, self.level);
        for row in lowest..HEIGHT {
            for col in 0..WIDTH {
                if self.board.is_empty(row, col) {
                    continue;
                }
                self.board.set(row, col, EMPTY);
                self.score += bonus;
                self.events.push(GameEvent::TileWiped {
                    row,
                    col,
                    points: bonus,
                });
            }
        }
        self.level += 1;
        self.norma += scoring::norma_for_level(self.level);
        self.events.push(GameEvent::LevelUp { level: self.level });
        tracing::info!(level = self.level, norma = self.norma, wiped_from = lowest, "level up");
        self.check_falls();
    }

    /// Tile at logical (`row`, `col`). Cells outside the field read as empty,
    /// matching [`Game::is_falling`].
    pub fn tile(&self, row: usize, col: usize) -> Tile {
        if row >= HEIGHT || col >= WIDTH {
            return EMPTY;
        }
        self.board.get(row, col)
    }

    /// True if the tile at (`row`, `col`) is sinking; false outside the field.
    pub fn is_falling(&self, row: usize, col: usize) -> bool {
        self.mask.is_falling(row, col)
    }

    /// How far falling tiles are through their current one-row drop, in [0, 1).
    pub fn fall_fraction(&self) -> f32 {
        if self.fall_tick == 0 {
            return 0.0;
        }
        ((self.fall_tick - 1) % self.fall_time) as f32 / self.fall_time as f32
    }

    pub fn fall_count(&self) -> usize {
        self.mask.count()
    }

    pub fn swap(&self) -> Option<SwapView> {
        self.swap.view(self.swap_time)
    }

    pub fn incoming(&self) -> &[Tile; WIDTH] {
        self.board.incoming()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn norma(&self) -> i64 {
        self.norma
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Colours currently rolled into incoming rows.
    pub fn color_count(&self) -> u8 {
        scoring::color_count(self.level)
    }

    /// Falling flags found over empty cells and repaired so far.
    pub fn consistency_faults(&self) -> usize {
        self.faults
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Orientation;
    use rand::Rng;

    fn game() -> Game {
        Game::new(&GameConfig {
            seed: Some(42),
            ..GameConfig::default()
        })
        .unwrap()
    }

    fn place(game: &mut Game, cells: &[(usize, usize, Tile)]) {
        for &(row, col, tile) in cells {
            game.board.set(row, col, tile);
        }
    }

    fn assert_invariants(game: &Game) {
        let mut flagged = 0;
        for row in 0..HEIGHT {
            for col in 0..WIDTH {
                if game.is_falling(row, col) {
                    flagged += 1;
                    assert_ne!(
                        game.tile(row, col),
                        EMPTY,
                        "falling flag over empty cell ({row}, {col})"
                    );
                }
            }
        }
        assert_eq!(game.fall_count(), flagged);
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let cfg = GameConfig {
            fall_time: 0,
            ..GameConfig::default()
        };
        assert_eq!(Game::new(&cfg).unwrap_err(), ConfigError::ZeroFallTime);
    }

    #[test]
    fn test_new_session_state() {
        let g = game();
        assert_eq!(g.score(), 0);
        assert_eq!(g.level(), 0);
        assert_eq!(g.norma(), 100);
        assert_eq!(g.board().tile_count(), 0);
        assert!(g.incoming().iter().all(|&t| (1..=4).contains(&t)));
        assert!(!g.is_dead());
    }

    #[test]
    fn test_three_run_scores_300() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (0, 1, 1), (0, 2, 1)]);
        g.tick();
        assert_eq!(g.score(), 300);
        assert_eq!(g.norma(), 97);
        assert_eq!(g.combo(), 1);
        assert_eq!(g.board().tile_count(), 0);
        let events: Vec<_> = g.drain_events().collect();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::MatchResolved { points: 300, run }] if run.orientation == Orientation::Horizontal
        ));
    }

    #[test]
    fn test_cross_scores_both_runs() {
        let mut g = game();
        place(
            &mut g,
            &[
                (0, 0, 2),
                (0, 1, 1),
                (0, 2, 3),
                (1, 0, 1),
                (1, 1, 1),
                (1, 2, 1),
                (2, 1, 1),
            ],
        );
        g.tick();
        assert_eq!(g.score(), 600);
        assert_eq!(g.norma(), 94);
        assert_eq!(g.board().tile_count(), 2);
        assert_eq!(g.tile(0, 0), 2);
        assert_eq!(g.tile(0, 2), 3);
        for (row, col) in [(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)] {
            assert_eq!(g.tile(row, col), EMPTY);
        }
    }

    #[test]
    fn test_combo_multiplies_score() {
        let mut g = game();
        g.combo = 2;
        g.level = 1;
        place(&mut g, &[(0, 3, 2), (0, 4, 2), (0, 5, 2)]);
        g.tick();
        // 1.2 * 1.1 * 300
        assert_eq!(g.score(), 396);
    }

    #[test]
    fn test_swap_rejected_under_falling_tile() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (0, 1, 2), (1, 0, 3)]);
        g.mask.put(1, 0, true);
        let before = g.board().clone();
        assert_eq!(g.request_swap(0, 0), Err(SwapRejected::AboveFalling));
        assert_eq!(g.board(), &before);
        assert!(g.swap().is_none());
    }

    #[test]
    fn test_swap_exchanges_after_swap_time() {
        let mut g = game();
        place(&mut g, &[(0, 4, 1), (0, 5, 2)]);
        g.request_swap(0, 4).unwrap();
        for _ in 0..crate::config::DEFAULT_SWAP_TIME - 1 {
            g.tick();
            assert!(g.swap().is_some());
            assert_eq!(g.tile(0, 4), 1);
        }
        assert!(g.progress() == 0.0, "no rise while swapping");
        g.tick();
        assert!(g.swap().is_none());
        assert_eq!(g.tile(0, 4), 2);
        assert_eq!(g.tile(0, 5), 1);
    }

    #[test]
    fn test_second_swap_is_dropped() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (0, 1, 2), (0, 5, 3)]);
        g.request_swap(0, 0).unwrap();
        assert_eq!(g.request_swap(0, 5), Err(SwapRejected::AlreadySwapping));
        let view = g.swap().unwrap();
        assert_eq!((view.row, view.col), (0, 0));
    }

    #[test]
    fn test_swap_into_match() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (0, 1, 1), (0, 2, 2), (0, 3, 1)]);
        g.request_swap(0, 2).unwrap();
        for _ in 0..crate::config::DEFAULT_SWAP_TIME {
            g.tick();
        }
        assert_eq!(g.score(), 300);
        assert_eq!(g.tile(0, 3), 2);
        assert_eq!(g.board().tile_count(), 1);
    }

    #[test]
    fn test_swap_off_ledge_starts_fall() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (1, 0, 2)]);
        g.request_swap(1, 0).unwrap();
        for _ in 0..crate::config::DEFAULT_SWAP_TIME {
            g.tick();
        }
        assert_eq!(g.tile(1, 1), 2);
        assert!(g.is_falling(1, 1));
        assert_eq!(g.fall_count(), 1);
    }

    #[test]
    fn test_swap_resets_combo_only_when_settled() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (0, 1, 2), (5, 7, 3)]);
        g.combo = 3;
        g.mask.put(5, 7, true);
        g.request_swap(0, 0).unwrap();
        assert_eq!(g.combo(), 3);

        let mut g = game();
        place(&mut g, &[(0, 0, 1), (0, 1, 2)]);
        g.combo = 3;
        g.request_swap(0, 0).unwrap();
        assert_eq!(g.combo(), 0);
    }

    #[test]
    fn test_falling_tile_lands_after_fall_time() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (2, 0, 2)]);
        g.check_falls();
        assert_eq!(g.fall_count(), 1);
        for _ in 0..crate::config::DEFAULT_FALL_TIME {
            g.tick();
        }
        assert_eq!(g.tile(2, 0), 2);
        assert!((g.fall_fraction() - 0.9).abs() < 1e-6);
        g.tick();
        assert_eq!(g.tile(1, 0), 2);
        assert_eq!(g.fall_count(), 0);
    }

    #[test]
    fn test_check_falls_twice_is_stable() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (3, 0, 2), (4, 0, 4), (6, 6, 3)]);
        g.check_falls();
        let mask = g.mask.clone();
        let count = g.fall_count();
        g.check_falls();
        assert_eq!(g.mask, mask);
        assert_eq!(g.fall_count(), count);
    }

    #[test]
    fn test_stale_flag_is_repaired_and_counted() {
        let mut g = game();
        g.mask.put(7, 2, true);
        for _ in 0..=crate::config::DEFAULT_FALL_TIME {
            g.tick();
        }
        assert_eq!(g.consistency_faults(), 1);
        assert_eq!(g.fall_count(), 0);
    }

    #[test]
    fn test_row_advance_resets_combo() {
        let mut g = game();
        place(&mut g, &[(0, 2, 5)]);
        g.combo = 4;
        let incoming = *g.incoming();
        g.advance_row();
        assert_eq!(g.combo(), 0);
        assert_eq!(g.tile(1, 2), 5);
        for col in 0..WIDTH {
            assert_eq!(g.tile(0, col), incoming[col]);
        }
    }

    #[test]
    fn test_tick_advances_when_progress_fills() {
        let mut g = game();
        g.board.set_incoming([1, 2, 1, 2, 1, 2, 1, 2, 1, 2]);
        g.progress = 0.999;
        g.tick();
        assert!(g.progress() < 0.01);
        assert_eq!(g.tile(0, 0), 1);
        assert_eq!(g.tile(0, 1), 2);
        assert!(g.drain_events().any(|e| e == GameEvent::RowAdvanced));
    }

    #[test]
    fn test_level_up_wipes_from_lowest_open_row() {
        let mut g = game();
        for row in 0..2 {
            for col in 0..WIDTH {
                g.board.set(row, col, 1 + ((row + col) % 4) as Tile);
            }
        }
        place(&mut g, &[(2, 0, 3), (2, 1, 1), (3, 0, 4)]);
        let bottom: Vec<Tile> = (0..2)
            .flat_map(|row| (0..WIDTH).map(move |col| (row, col)))
            .map(|(row, col)| g.tile(row, col))
            .collect();
        g.norma = -1;
        g.tick();

        assert_eq!(g.level(), 1);
        assert_eq!(g.norma(), 119);
        assert_eq!(g.score(), 3 * 120);
        assert_eq!(g.board().tile_count(), 2 * WIDTH);
        let after: Vec<Tile> = (0..2)
            .flat_map(|row| (0..WIDTH).map(move |col| (row, col)))
            .map(|(row, col)| g.tile(row, col))
            .collect();
        assert_eq!(after, bottom);
        let events: Vec<_> = g.drain_events().collect();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::TileWiped { points: 120, .. }))
                .count(),
            3
        );
        assert!(events.contains(&GameEvent::LevelUp { level: 1 }));
    }

    #[test]
    fn test_death_freezes_session() {
        let mut g = game();
        place(&mut g, &[(HEIGHT - 1, 0, 2)]);
        g.progress = 0.999;
        g.tick();
        assert!(g.is_dead());
        assert!(g.drain_events().any(|e| e == GameEvent::GameOver));

        let board = g.board().clone();
        let score = g.score();
        for _ in 0..100 {
            g.tick();
        }
        assert_eq!(g.board(), &board);
        assert_eq!(g.score(), score);
        assert_eq!(g.request_swap(HEIGHT - 1, 0), Err(SwapRejected::GameOver));
        assert_eq!(g.drain_events().count(), 0);
    }

    #[test]
    fn test_out_of_range_reads_are_empty() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (HEIGHT - 1, WIDTH - 1, 2)]);
        assert_eq!(g.tile(HEIGHT, 0), EMPTY);
        assert_eq!(g.tile(0, WIDTH), EMPTY);
        assert_eq!(g.tile(usize::MAX, usize::MAX), EMPTY);
        assert!(!g.is_falling(HEIGHT, 0));
        assert!(!g.is_falling(0, WIDTH));
        assert_eq!(g.tile(HEIGHT - 1, WIDTH - 1), 2);
    }

    #[test]
    fn test_swap_far_outside_field_rejected() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (0, 1, 2)]);
        assert_eq!(
            g.request_swap(0, usize::MAX),
            Err(SwapRejected::OutOfBounds {
                row: 0,
                col: usize::MAX
            })
        );
        assert!(g.swap().is_none());
    }

    #[test]
    fn test_undrained_events_do_not_pile_up() {
        let mut g = game();
        place(&mut g, &[(0, 0, 1), (0, 1, 1), (0, 2, 1)]);
        g.tick();
        place(&mut g, &[(0, 5, 3), (0, 6, 3), (0, 7, 3)]);
        g.tick();
        let events: Vec<_> = g.drain_events().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            GameEvent::MatchResolved { run, .. } if run.col == 5
        ));
        for _ in 0..50 {
            g.tick();
        }
        assert!(g.events.len() <= 1);
    }

    #[test]
    fn test_invariants_hold_over_long_session() {
        let mut g = game();
        let mut input = StdRng::seed_from_u64(99);
        for tick in 0..20_000u32 {
            if tick % 5 == 0 {
                let row = input.gen_range(0..HEIGHT);
                let col = input.gen_range(0..WIDTH - 1);
                let _ = g.request_swap(row, col);
            }
            g.tick();
            assert_invariants(&g);
            g.drain_events().for_each(drop);
            if g.is_dead() {
                break;
            }
        }
        assert_eq!(g.consistency_faults(), 0);
    }
}
