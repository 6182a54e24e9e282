//! Tile palette and UI colours, optionally loaded from a btop-style theme file
//! (`theme[key]="#RRGGBB"`).

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark tile colours: red, green, blue, purple, yellow, cyan.
const ONEDARK_TILES: [&str; 6] = ["#E06C75", "#98C379", "#61AFEF", "#C678DD", "#E5C07B", "#56B6C2"];
const HIGH_CONTRAST_TILES: [&str; 6] = ["#FF0000", "#00FF00", "#0088FF", "#FF00FF", "#FFFF00", "#00FFFF"];
/// Tol's bright scheme, distinguishable under common colour-vision deficiencies.
const COLORBLIND_TILES: [&str; 6] = ["#EE6677", "#228833", "#4477AA", "#AA3377", "#CCBB44", "#66CCEE"];

/// Theme keys that override each tile colour, in tile order.
const TILE_KEYS: [&str; 6] = ["cpu_end", "mem_box", "cpu_box", "net_box", "title", "hi_fg"];

#[derive(Debug, Clone)]
pub struct Theme {
    /// Colour for tile codes 1..=6.
    pub tiles: [Color; 6],
    pub bg: Color,
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    /// Incoming row and other de-emphasised text.
    pub inactive_fg: Color,
    /// Swap cursor brackets.
    pub cursor: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            tiles: hex_set(ONEDARK_TILES),
            bg: rgb(0x28, 0x2C, 0x34),
            div_line: rgb(0x3F, 0x44, 0x4F),
            main_fg: rgb(0xAB, 0xB2, 0xBF),
            title: rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: rgb(0x5C, 0x63, 0x70),
            cursor: Color::White,
        }
    }
}

impl Theme {
    /// Load `path` if it exists, otherwise start from One Dark, then apply
    /// `palette` to the tile colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&text))
            }
            _ => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let base = Self::default();
        let get = |key: &str, fallback: Color| {
            map.get(key)
                .and_then(|v| parse_hex(v).ok())
                .unwrap_or(fallback)
        };
        let mut tiles = base.tiles;
        for (tile, key) in tiles.iter_mut().zip(TILE_KEYS) {
            *tile = get(key, *tile);
        }
        Self {
            tiles,
            bg: get("main_bg", base.bg),
            div_line: get("div_line", base.div_line),
            main_fg: get("main_fg", base.main_fg),
            title: get("title", base.title),
            inactive_fg: get("inactive_fg", base.inactive_fg),
            cursor: get("selected_fg", base.cursor),
        }
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => self.tiles = hex_set(HIGH_CONTRAST_TILES),
            crate::Palette::Colorblind => self.tiles = hex_set(COLORBLIND_TILES),
        }
    }

    /// Colour for a non-empty tile code.
    #[inline]
    pub fn tile_color(&self, tile: tilerise::Tile) -> Color {
        self.tiles[(tile.saturating_sub(1) as usize) % self.tiles.len()]
    }
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(r, g, b)
}

fn hex_set(hexes: [&str; 6]) -> [Color; 6] {
    hexes.map(|h| parse_hex(h).unwrap_or(Color::Gray))
}

/// Parse theme file lines of the form `theme[key]="value"`; comments and
/// malformed lines are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    if !digits.is_ascii() {
        return Err(bad());
    }
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        u8::from_str_radix(&digits[range], 16)
            .map(|v| v * scale)
            .map_err(|_| bad())
    };
    match digits.len() {
        6 => Ok(Color::Rgb(channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?)),
        3 => Ok(Color::Rgb(channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?)),
        _ => Err(bad()),
    }
}
