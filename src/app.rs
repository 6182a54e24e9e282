//! App: terminal init, main loop, fixed-rate ticking and key handling.

use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, ClearFlash, ScorePopup, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tilerise::{Game, GameConfig, GameEvent, HEIGHT, WIDTH};

/// Redraw roughly 60 times a second.
const FRAME_DURATION: Duration = Duration::from_millis(16);
/// Most simulation ticks run to catch up after a stall; the rest is dropped.
const MAX_CATCH_UP_TICKS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

/// What the main loop should do after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    game: Game,
    screen: Screen,
    paused: bool,
    /// Logical (row, col) of the left cell of the swap selector.
    cursor: (usize, usize),
    popups: Vec<ScorePopup>,
    flash: ClearFlash,
    no_animation: bool,
    tick_interval: Duration,
    /// Wall time owed to the simulation.
    accumulator: Duration,
    last_frame: Instant,
}

/// Cursor start: middle of the lower stack.
const fn home_cursor() -> (usize, usize) {
    (2, WIDTH / 2 - 1)
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, tick_rate: f64, no_animation: bool) -> Result<Self> {
        let game = Game::new(&config)?;
        let tick_rate = if tick_rate.is_finite() && tick_rate > 0.0 {
            tick_rate
        } else {
            60.0
        };
        Ok(Self {
            config,
            theme,
            game,
            screen: Screen::Playing,
            paused: false,
            cursor: home_cursor(),
            popups: Vec::new(),
            flash: ClearFlash::default(),
            no_animation,
            tick_interval: Duration::from_secs_f64(1.0 / tick_rate),
            accumulator: Duration::ZERO,
            last_frame: Instant::now(),
        })
    }

    fn reset_game(&mut self) -> Result<()> {
        self.game = Game::new(&self.config)?;
        self.screen = Screen::Playing;
        self.paused = false;
        self.cursor = home_cursor();
        self.popups.clear();
        self.flash.clear();
        self.accumulator = Duration::ZERO;
        tracing::info!("new game");
        Ok(())
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let (row, col) = self.cursor;
        self.cursor = (
            row.saturating_add_signed(d_row).min(HEIGHT - 1),
            col.saturating_add_signed(d_col).min(WIDTH - 2),
        );
    }

    fn apply_action(&mut self, action: Action) -> Result<Flow> {
        match (self.screen, action) {
            (_, Action::Quit) => return Ok(Flow::Exit),
            (Screen::GameOver, Action::Restart) => self.reset_game()?,
            (Screen::GameOver, _) => {}
            (Screen::Playing, Action::Pause) => self.paused = !self.paused,
            (Screen::Playing, _) if self.paused => {}
            (Screen::Playing, Action::CursorLeft) => self.move_cursor(0, -1),
            (Screen::Playing, Action::CursorRight) => self.move_cursor(0, 1),
            (Screen::Playing, Action::CursorUp) => self.move_cursor(1, 0),
            (Screen::Playing, Action::CursorDown) => self.move_cursor(-1, 0),
            (Screen::Playing, Action::Swap) => {
                let (row, col) = self.cursor;
                // A rejected swap is simply ignored; the game logs why.
                let _ = self.game.request_swap(row, col);
            }
            (Screen::Playing, Action::Restart | Action::None) => {}
        }
        Ok(Flow::Continue)
    }

    /// Turn queued game events into popups, flashes and cursor moves.
    fn absorb_events(&mut self) {
        let combo = self.game.combo();
        let mut wiped_points = 0;
        let mut wiped_at: Option<(usize, usize)> = None;
        let events: Vec<GameEvent> = self.game.drain_events().collect();
        for event in events {
            match event {
                GameEvent::MatchResolved { run, points } => {
                    let (row, col) = run.center();
                    self.popups
                        .push(ScorePopup::new(row as usize, col as usize, points, combo));
                    if !self.no_animation {
                        self.flash.extend(run.cells());
                    }
                }
                GameEvent::TileWiped { row, col, points } => {
                    wiped_points += points;
                    wiped_at = Some(wiped_at.map_or((row, col), |at| at.min((row, col))));
                    if !self.no_animation {
                        self.flash.extend([(row, col)]);
                    }
                }
                GameEvent::LevelUp { level } => {
                    tracing::debug!(level, "level up shown");
                }
                GameEvent::RowAdvanced => {
                    // The selector rides the stack.
                    self.move_cursor(1, 0);
                    for popup in &mut self.popups {
                        popup.row += 1;
                    }
                }
                GameEvent::GameOver => {
                    self.screen = Screen::GameOver;
                    self.flash.clear();
                }
            }
        }
        if let Some((row, _)) = wiped_at {
            self.popups
                .push(ScorePopup::new(row, WIDTH / 2 - 1, wiped_points, 1));
        }
    }

    /// Run as many ticks as `elapsed` pays for, up to the catch-up cap.
    fn advance(&mut self, elapsed: Duration) {
        if self.screen != Screen::Playing || self.paused {
            return;
        }
        ui::tick_popups(&mut self.popups, elapsed.as_millis().min(u32::MAX as u128) as u32);
        self.accumulator += elapsed;
        let mut ticks = 0;
        while self.accumulator >= self.tick_interval {
            if ticks == MAX_CATCH_UP_TICKS {
                tracing::debug!(behind = ?self.accumulator, "dropping simulation backlog");
                self.accumulator = Duration::ZERO;
                break;
            }
            self.game.tick();
            self.accumulator -= self.tick_interval;
            ticks += 1;
            self.absorb_events();
            if self.screen != Screen::Playing {
                self.accumulator = Duration::ZERO;
                break;
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        // Not every terminal supports this; key repeats still arrive as presses.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        tracing::info!(seed = ?self.config.seed, level = self.config.initial_level, "session start");

        let result = self.run_loop(&mut terminal);

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        tracing::info!(score = self.game.score(), level = self.game.level(), "session end");
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let view = View {
                screen: self.screen,
                game: &self.game,
                theme: &self.theme,
                cursor: self.cursor,
                paused: self.paused,
                popups: &self.popups,
            };
            let flash = &mut self.flash;
            terminal.draw(|f| ui::draw(f, &view, flash, now))?;
            self.flash.finish_if_done();

            let timeout = FRAME_DURATION.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    let action = key_to_action(key);
                    let accepted = match key.kind {
                        KeyEventKind::Press => true,
                        KeyEventKind::Repeat => action.repeats(),
                        KeyEventKind::Release => false,
                    };
                    if accepted && self.apply_action(action)? == Flow::Exit {
                        return Ok(());
                    }
                }
            }

            let frame_start = Instant::now();
            let elapsed = frame_start.saturating_duration_since(self.last_frame);
            self.last_frame = frame_start;
            self.advance(elapsed);
        }
    }
}
