//! Tilerise — rising-stack match-three puzzle in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tilerise::GameConfig;
use tilerise::config::{DEFAULT_FALL_TIME, DEFAULT_NORMA, DEFAULT_SWAP_TIME};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        tracing::warn!(%err, "theme not loaded, using defaults");
        theme::Theme::default()
    });
    let config = GameConfig {
        fall_time: args.fall_time,
        swap_time: args.swap_time,
        initial_level: args.level,
        initial_norma: DEFAULT_NORMA,
        seed: args.seed,
    };
    let mut app = App::new(config, theme, args.tick_rate, args.no_animation)?;
    app.run()?;
    Ok(())
}

/// Send `tracing` output to `path`; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("TILERISE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Rising-stack match-three puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tilerise",
    version,
    about = "Rising-stack match-three puzzle in the terminal. Swap tiles sideways to line up three or more.",
    long_about = "Tilerise is a terminal puzzle game in the style of rising-block match-three games.\n\n\
        Rows of coloured tiles push up from the bottom. Swap two horizontally adjacent tiles \
        to line up three or more of a colour; cleared tiles let the ones above fall, which can \
        chain into combos. Clear enough tiles to level up and wipe the upper stack for a bonus. \
        The game ends when the stack needs to rise past the top.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move selector   Space / Enter  Swap\n  P              Pause           Q / Esc        Quit\n  R              Restart after game over\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme). Set TILERISE_LOG to filter --log-file output."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for the incoming rows; the same seed replays the same stack.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Starting level. Higher levels rise faster and roll more colours.
    #[arg(short, long, default_value = "0", value_name = "N")]
    pub level: u32,

    /// Frames for a falling tile to drop one row.
    #[arg(long, default_value_t = DEFAULT_FALL_TIME, value_name = "TICKS", value_parser = clap::value_parser!(u32).range(1..))]
    pub fall_time: u32,

    /// Frames for a swap to complete.
    #[arg(long, default_value_t = DEFAULT_SWAP_TIME, value_name = "TICKS", value_parser = clap::value_parser!(u32).range(1..))]
    pub swap_time: u32,

    /// Simulation ticks per second.
    #[arg(long, default_value = "60.0", value_name = "HZ")]
    pub tick_rate: f64,

    /// Write logs to this file (filter with TILERISE_LOG, default "info").
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Disable the clear flash.
    #[arg(long)]
    pub no_animation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
