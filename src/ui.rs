//! Layout and drawing: field, incoming row, cursor, sidebar, popups, pause and
//! game-over overlays.

use crate::app::Screen;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};
use tilerise::{EMPTY, Game, HEIGHT, WIDTH};

/// Terminal columns per tile.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 22;
/// Field plus the incoming row, inside a border.
const FIELD_OUTER_W: u16 = WIDTH as u16 * CELL_WIDTH + 2;
const FIELD_OUTER_H: u16 = HEIGHT as u16 + 1 + 2;

/// How long a popup stays on screen.
pub const POPUP_LIFETIME_MS: u32 = 1500;
/// A popup climbs one row every this many ms.
const POPUP_RISE_MS: u32 = 150;
const CLEAR_FLASH_MS: u32 = 300;

/// Floating "+N" label anchored at a field cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorePopup {
    pub row: usize,
    pub col: usize,
    pub amount: u64,
    /// Combo multiplier shown next to the amount when above one.
    pub multiplier: u32,
    pub age_ms: u32,
}

impl ScorePopup {
    pub fn new(row: usize, col: usize, amount: u64, multiplier: u32) -> Self {
        Self {
            row,
            col,
            amount,
            multiplier,
            age_ms: 0,
        }
    }

    fn label(&self) -> String {
        if self.multiplier > 1 {
            format!("+{} x{}", self.amount, self.multiplier)
        } else {
            format!("+{}", self.amount)
        }
    }

    /// Logical row the label currently sits on, after floating up.
    fn display_row(&self) -> usize {
        self.row + (self.age_ms / POPUP_RISE_MS) as usize
    }
}

/// Age every popup by `delta_ms` and drop the expired ones.
pub fn tick_popups(popups: &mut Vec<ScorePopup>, delta_ms: u32) {
    popups.retain_mut(|p| {
        p.age_ms = p.age_ms.saturating_add(delta_ms);
        p.age_ms < POPUP_LIFETIME_MS
    });
}

/// White flash fading out over cells that were just cleared.
#[derive(Default)]
pub struct ClearFlash {
    cells: HashSet<(usize, usize)>,
    effect: Option<Effect>,
    last_frame: Option<Instant>,
}

impl ClearFlash {
    /// Add freshly cleared cells; a running flash restarts to cover them too.
    pub fn extend(&mut self, cells: impl IntoIterator<Item = (usize, usize)>) {
        let before = self.cells.len();
        self.cells.extend(cells);
        if self.cells.len() != before {
            self.effect = None;
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.effect = None;
        self.last_frame = None;
    }

    /// Drop the flash once its effect has run out.
    pub fn finish_if_done(&mut self) {
        if self.effect.as_ref().is_some_and(Effect::done) {
            self.clear();
        }
    }

    fn render(&mut self, frame: &mut Frame, board: Rect, now: Instant) {
        if !self.is_active() {
            return;
        }
        let delta = self
            .last_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(std::time::Duration::ZERO);
        let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
        self.last_frame = Some(now);

        if self.effect.is_none() {
            let positions: HashSet<(u16, u16)> = self
                .cells
                .iter()
                .flat_map(|&(row, col)| {
                    let (x, y) = cell_origin(board, row, col);
                    (x..x + CELL_WIDTH).map(move |bx| (bx, y))
                })
                .collect();
            let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
                positions.contains(&(pos.x, pos.y))
            }));
            let effect = fx::fade_from(
                Color::White,
                Color::White,
                (CLEAR_FLASH_MS, Interpolation::Linear),
            )
            .with_filter(filter)
            .with_area(board);
            self.effect = Some(effect);
            self.last_frame = Some(now);
        }
        if let Some(effect) = &mut self.effect {
            frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
        }
    }
}

/// Everything the renderer needs for one frame.
pub struct View<'a> {
    pub screen: Screen,
    pub game: &'a Game,
    pub theme: &'a Theme,
    /// Logical (row, col) of the left cursor cell.
    pub cursor: (usize, usize),
    pub paused: bool,
    pub popups: &'a [ScorePopup],
}

pub fn draw(frame: &mut Frame, view: &View<'_>, flash: &mut ClearFlash, now: Instant) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(view.theme.bg))
        .render(area, frame.buffer_mut());

    let (field_area, sidebar_area) = game_layout(area);
    let board = draw_field(frame, view, field_area);
    draw_sidebar(frame, view, sidebar_area);
    flash.render(frame, board, now);
    draw_popups(frame.buffer_mut(), view, board);

    match view.screen {
        Screen::Playing if view.paused => draw_pause_overlay(frame, view.theme, area),
        Screen::Playing => {}
        Screen::GameOver => draw_game_over(frame, view, area),
    }
}

/// Center field and sidebar in the terminal.
fn game_layout(area: Rect) -> (Rect, Rect) {
    let total_w = FIELD_OUTER_W + SIDEBAR_WIDTH;
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(FIELD_OUTER_H),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(FIELD_OUTER_W),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Top-left terminal position of a logical field cell. Row 0 is drawn lowest.
fn cell_origin(board: Rect, row: usize, col: usize) -> (u16, u16) {
    (
        board.x + col as u16 * CELL_WIDTH,
        board.y + (HEIGHT - 1 - row) as u16,
    )
}

/// Colours for each half-row of the field, bottom half of row 0 first.
/// Airborne tiles past the midpoint of their drop sit one half-row lower.
fn half_row_colors(game: &Game, theme: &Theme) -> Vec<[Option<Color>; WIDTH]> {
    let mut halves = vec![[None; WIDTH]; HEIGHT * 2];
    let swap = game.swap().filter(|s| s.fraction >= 0.5);
    let dropped = game.fall_fraction() >= 0.5;

    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let source_col = match swap {
                Some(s) if s.row == row && s.col == col => col + 1,
                Some(s) if s.row == row && s.col + 1 == col => col - 1,
                _ => col,
            };
            let tile = game.tile(row, source_col);
            if tile == EMPTY {
                continue;
            }
            let color = theme.tile_color(tile);
            let low = if dropped && game.is_falling(row, source_col) {
                row * 2 - 1
            } else {
                row * 2
            };
            halves[low][col] = Some(color);
            halves[low + 1][col] = Some(color);
        }
    }
    halves
}

/// Draws the bordered field and returns the inner board rect (without the
/// incoming row).
fn draw_field(frame: &mut Frame, view: &View<'_>, area: Rect) -> Rect {
    let theme = view.theme;
    let game = view.game;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Tilerise ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let board = Rect {
        x: inner.x,
        y: inner.y,
        width: (WIDTH as u16 * CELL_WIDTH).min(inner.width),
        height: (HEIGHT as u16).min(inner.height),
    };
    let buf = frame.buffer_mut();

    let halves = half_row_colors(game, theme);
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let top = halves[row * 2 + 1][col].unwrap_or(theme.bg);
            let bottom = halves[row * 2][col].unwrap_or(theme.bg);
            let (x, y) = cell_origin(board, row, col);
            for bx in x..x + CELL_WIDTH {
                if board.contains(Position::new(bx, y)) {
                    buf[(bx, y)]
                        .set_symbol("▀")
                        .set_style(Style::default().fg(top).bg(bottom));
                }
            }
        }
    }

    // Incoming row, dimmed, directly beneath the field.
    let incoming_y = board.y + HEIGHT as u16;
    if incoming_y < inner.y + inner.height {
        for (col, &tile) in game.incoming().iter().enumerate() {
            let x = board.x + col as u16 * CELL_WIDTH;
            let color = if tile == EMPTY {
                theme.bg
            } else {
                theme.tile_color(tile)
            };
            for bx in x..(x + CELL_WIDTH).min(inner.x + inner.width) {
                buf[(bx, incoming_y)]
                    .set_symbol("░")
                    .set_style(Style::default().fg(color).bg(theme.bg).add_modifier(Modifier::DIM));
            }
        }
    }

    if view.screen == Screen::Playing {
        draw_cursor(buf, board, theme, view.cursor);
    }
    board
}

/// Brackets around the two-cell swap selector.
fn draw_cursor(buf: &mut Buffer, board: Rect, theme: &Theme, (row, col): (usize, usize)) {
    if row >= HEIGHT || col + 1 >= WIDTH {
        return;
    }
    let (left_x, y) = cell_origin(board, row, col);
    let right_x = left_x + CELL_WIDTH * 2 - 1;
    let style = Style::default()
        .fg(theme.cursor)
        .add_modifier(Modifier::BOLD);
    for (x, symbol) in [(left_x, "["), (right_x, "]")] {
        if board.contains(Position::new(x, y)) {
            let cell = &mut buf[(x, y)];
            let bg = cell.fg;
            cell.set_symbol(symbol).set_style(style.bg(bg));
        }
    }
}

fn draw_popups(buf: &mut Buffer, view: &View<'_>, board: Rect) {
    let style = Style::default()
        .fg(view.theme.title)
        .bg(view.theme.bg)
        .add_modifier(Modifier::BOLD);
    for popup in view.popups {
        let row = popup.display_row();
        if row >= HEIGHT {
            continue;
        }
        let (x, y) = cell_origin(board, row, popup.col);
        let pos = Position::new(x, y);
        // The board is clipped on short terminals; skip labels that fell off it.
        if !board.contains(pos) || !buf.area.contains(pos) {
            continue;
        }
        let room = (board.x + board.width - x) as usize;
        buf.set_stringn(x, y, popup.label(), room, style);
    }
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let game = view.game;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Score, level, to next
            Constraint::Length(1),
            Constraint::Length(3), // Combo
            Constraint::Length(1),
            Constraint::Length(4), // Rise gauge
            Constraint::Length(1),
            Constraint::Min(0), // Controls
        ])
        .split(area);

    let stats_block = sidebar_block(theme);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let stats = vec![
        stat("Score: ", game.score().to_string()),
        stat("Level: ", game.level().to_string()),
        stat("To next: ", game.norma().max(0).to_string()),
        stat("Colours: ", game.color_count().to_string()),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    let combo_block = sidebar_block(theme);
    let combo_inner = combo_block.inner(chunks[2]);
    combo_block.render(chunks[2], frame.buffer_mut());
    let combo = if game.combo() > 1 {
        Span::styled(
            format!("Combo x{}", game.combo()),
            Style::default()
                .fg(theme.tile_color(5))
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("Combo", title_style)
    };
    Paragraph::new(Line::from(combo)).render(combo_inner, frame.buffer_mut());

    let rise_block = sidebar_block(theme);
    let rise_inner = rise_block.inner(chunks[4]);
    rise_block.render(chunks[4], frame.buffer_mut());
    let rise_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(rise_inner);
    Paragraph::new(Line::from(Span::styled("Rise", title_style)))
        .render(rise_layout[0], frame.buffer_mut());
    let ratio = game.progress().clamp(0.0, 1.0);
    let bar_color = if ratio > 0.8 {
        Color::Red
    } else if ratio > 0.5 {
        Color::Yellow
    } else {
        Color::Green
    };
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(bar_color).bg(theme.div_line))
        .render(rise_layout[1], frame.buffer_mut());

    let help_style = Style::default().fg(theme.inactive_fg);
    let help = vec![
        Line::from(Span::styled("←↓↑→ / hjkl  move", help_style)),
        Line::from(Span::styled("Space/Enter swap", help_style)),
        Line::from(Span::styled("P pause  Q quit", help_style)),
    ];
    Paragraph::new(Text::from(help)).render(chunks[6], frame.buffer_mut());
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P Resume    Q Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let popup = centered(area, 30, 9);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", view.game.score()), fg)),
        Line::from(Span::styled(format!(" Level: {} ", view.game.level()), fg)),
        Line::from(""),
        Line::from(Span::styled(" R Restart    Q Quit ", fg)),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg))
            .title(Span::styled(" Tilerise ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}
